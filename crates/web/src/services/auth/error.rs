//! Authentication error types.

use thiserror::Error;

use crate::firebase::{GENERIC_FAILURE, IdentityError, OAuthError, ProfileStoreError};

use super::MIN_PASSWORD_LENGTH;

/// Errors that can occur during credential flow operations.
///
/// Every variant is rendered inline on the auth form via
/// [`AuthError::user_message`]; none of them fail the request.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] pillow_ease_core::EmailError),

    /// Password shorter than [`MIN_PASSWORD_LENGTH`].
    #[error("password must be at least {MIN_PASSWORD_LENGTH} characters")]
    WeakPassword,

    /// Signup without a name.
    #[error("name is required")]
    MissingName,

    /// Password reset without an email.
    #[error("email is required for password reset")]
    MissingResetEmail,

    /// Another submission is still in flight.
    #[error("a submission is already in progress")]
    Busy,

    /// The identity backend rejected the request.
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// The profile document could not be read or written.
    #[error("profile store error: {0}")]
    Profile(#[from] ProfileStoreError),

    /// The Google leg of federated sign-in failed.
    #[error("federated sign-in failed: {0}")]
    OAuth(#[from] OAuthError),

    /// The submission task died before finishing.
    #[error("submission interrupted: {0}")]
    Interrupted(String),
}

impl AuthError {
    /// Text rendered inline on the auth form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidEmail(pillow_ease_core::EmailError::Empty) => {
                "Please enter your email address.".to_owned()
            }
            Self::InvalidEmail(_) => "Please enter a valid email address.".to_owned(),
            Self::WeakPassword => IdentityError::WeakPassword.user_message(),
            Self::MissingName => "Please enter your name.".to_owned(),
            Self::MissingResetEmail => {
                "Please enter your email address to reset your password.".to_owned()
            }
            Self::Busy => "Please wait, we're still working on your last request.".to_owned(),
            Self::Identity(err) => err.user_message(),
            Self::Profile(ProfileStoreError::NotConfigured) => {
                IdentityError::NotConfigured.user_message()
            }
            Self::Profile(_) | Self::OAuth(_) | Self::Interrupted(_) => GENERIC_FAILURE.to_owned(),
        }
    }

    /// Whether the user backed out of federated sign-in.
    #[must_use]
    pub const fn is_cancellation(&self) -> bool {
        matches!(self, Self::Identity(IdentityError::Cancelled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weak_password_message() {
        assert_eq!(
            AuthError::WeakPassword.user_message(),
            "Password should be at least 6 characters."
        );
    }

    #[test]
    fn test_missing_reset_email_message() {
        assert_eq!(
            AuthError::MissingResetEmail.user_message(),
            "Please enter your email address to reset your password."
        );
    }

    #[test]
    fn test_cancellation() {
        assert!(AuthError::Identity(IdentityError::Cancelled).is_cancellation());
        assert!(!AuthError::Identity(IdentityError::InvalidCredential).is_cancellation());
    }
}
