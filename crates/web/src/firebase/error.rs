//! Error types for the Firebase and Google adapters.

use thiserror::Error;

/// Generic text shown when nothing more specific is known.
pub const GENERIC_FAILURE: &str = "An error occurred. Please try again.";

/// Errors from the identity backend.
///
/// Closed set: raw Firebase codes are translated by [`IdentityError::from_code`]
/// and never inspected anywhere else.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("invalid credential")]
    InvalidCredential,

    #[error("email already registered")]
    EmailAlreadyRegistered,

    #[error("weak password")]
    WeakPassword,

    #[error("user not found")]
    UserNotFound,

    #[error("invalid email")]
    InvalidEmail,

    #[error("invalid API key")]
    InvalidApiKey,

    /// Project or provider misconfigured on the backend side.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No Firebase credentials were supplied at startup.
    #[error("identity backend not configured")]
    NotConfigured,

    /// The user backed out of federated sign-in.
    #[error("sign-in cancelled")]
    Cancelled,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Unknown(String),
}

impl IdentityError {
    /// Map an Identity Toolkit error message (`CODE` or `CODE : detail`).
    #[must_use]
    pub fn from_code(message: &str) -> Self {
        let code = message.split(':').next().unwrap_or_default().trim();

        match code {
            "INVALID_LOGIN_CREDENTIALS" | "INVALID_PASSWORD" | "INVALID_IDP_RESPONSE" => {
                Self::InvalidCredential
            }
            "EMAIL_EXISTS" => Self::EmailAlreadyRegistered,
            "WEAK_PASSWORD" => Self::WeakPassword,
            "EMAIL_NOT_FOUND" | "USER_NOT_FOUND" => Self::UserNotFound,
            "INVALID_EMAIL" | "MISSING_EMAIL" => Self::InvalidEmail,
            "API_KEY_INVALID" => Self::InvalidApiKey,
            "CONFIGURATION_NOT_FOUND" | "OPERATION_NOT_ALLOWED" | "PROJECT_NOT_FOUND"
            | "INVALID_IDP_CONFIG" => Self::Configuration(code.to_owned()),
            _ if message.starts_with("API key not valid") => Self::InvalidApiKey,
            _ => Self::Unknown(message.to_owned()),
        }
    }

    /// Text rendered inline on the auth form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidCredential => "Invalid email or password.".to_owned(),
            Self::EmailAlreadyRegistered => "That email is already registered.".to_owned(),
            Self::WeakPassword => "Password should be at least 6 characters.".to_owned(),
            Self::UserNotFound => "No account exists for that email.".to_owned(),
            Self::InvalidEmail => "Please enter a valid email address.".to_owned(),
            Self::InvalidApiKey => "System Error: Invalid API Key.".to_owned(),
            Self::Configuration(code) => format!("System Error: {code}."),
            Self::NotConfigured => {
                "Firebase is not configured properly. Please check your environment variables."
                    .to_owned()
            }
            Self::Cancelled => "Sign-in was cancelled.".to_owned(),
            Self::Http(_) => GENERIC_FAILURE.to_owned(),
            Self::Unknown(message) if message.trim().is_empty() => GENERIC_FAILURE.to_owned(),
            Self::Unknown(message) => message.clone(),
        }
    }
}

/// Errors from the profile document store.
#[derive(Debug, Error)]
pub enum ProfileStoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Firestore error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("malformed document: {0}")]
    Malformed(String),

    #[error("document store not configured")]
    NotConfigured,
}

/// Errors from the Google OAuth code exchange.
#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("token response carried no id_token")]
    MissingIdToken,

    /// Callback arrived without an authorization code.
    #[error("callback carried no authorization code")]
    MissingCode,

    /// Callback `state` did not match the one stored in the session.
    #[error("OAuth state mismatch")]
    InvalidState,

    /// Google reported an error other than the user declining.
    #[error("provider error: {0}")]
    Provider(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code_maps_known_codes() {
        assert!(matches!(
            IdentityError::from_code("INVALID_LOGIN_CREDENTIALS"),
            IdentityError::InvalidCredential
        ));
        assert!(matches!(
            IdentityError::from_code("EMAIL_EXISTS"),
            IdentityError::EmailAlreadyRegistered
        ));
        assert!(matches!(
            IdentityError::from_code("WEAK_PASSWORD : Password should be at least 6 characters"),
            IdentityError::WeakPassword
        ));
        assert!(matches!(
            IdentityError::from_code("EMAIL_NOT_FOUND"),
            IdentityError::UserNotFound
        ));
        assert!(matches!(
            IdentityError::from_code("API key not valid. Please pass a valid API key."),
            IdentityError::InvalidApiKey
        ));
        assert!(matches!(
            IdentityError::from_code("OPERATION_NOT_ALLOWED"),
            IdentityError::Configuration(_)
        ));
    }

    #[test]
    fn test_unknown_code_passes_message_through() {
        let err = IdentityError::from_code("TOO_MANY_ATTEMPTS_TRY_LATER : slow down");
        assert_eq!(
            err.user_message(),
            "TOO_MANY_ATTEMPTS_TRY_LATER : slow down"
        );
        assert_eq!(IdentityError::Unknown(String::new()).user_message(), GENERIC_FAILURE);
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            IdentityError::InvalidCredential.user_message(),
            "Invalid email or password."
        );
        assert_eq!(
            IdentityError::EmailAlreadyRegistered.user_message(),
            "That email is already registered."
        );
        assert_eq!(
            IdentityError::InvalidApiKey.user_message(),
            "System Error: Invalid API Key."
        );
    }
}
