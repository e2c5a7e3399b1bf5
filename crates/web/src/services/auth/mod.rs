//! Credential flow: login, signup, password reset and Google sign-in.
//!
//! [`CredentialService`] talks to the identity backend and profile store.
//! [`CredentialFlow`] is the per-browser form state around it: which view is
//! showing, what was typed, the inline error or success message, and the
//! in-flight flag that rejects double submits.

mod error;

pub use error::AuthError;

use std::sync::Arc;

use pillow_ease_core::{Email, Identity, ProfileRecord};
use serde::Deserialize;
use tracing::instrument;

use crate::firebase::{FederatedCredential, IdentityBackend, ProfileStore};

/// Minimum password length accepted at signup.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Success text after a reset email is requested.
pub const RESET_EMAIL_SENT: &str = "Password reset email sent! Check your inbox.";

/// Which form the auth page shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthView {
    #[default]
    Login,
    Signup,
    Forgot,
}

impl AuthView {
    /// Whether the user may switch from `self` to `target`.
    #[must_use]
    pub const fn can_switch_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Login, Self::Signup | Self::Forgot) | (Self::Signup | Self::Forgot, Self::Login)
        )
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Signup => "signup",
            Self::Forgot => "forgot",
        }
    }
}

/// Fields posted from the auth form.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone, Default, Deserialize)]
pub struct CredentialForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for CredentialForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialForm")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Result of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    SignedIn(Identity),
    ResetEmailSent,
}

// =============================================================================
// Credential Service
// =============================================================================

/// Identity backend operations with local validation in front.
#[derive(Clone)]
pub struct CredentialService {
    identity: Arc<dyn IdentityBackend>,
    profiles: Arc<dyn ProfileStore>,
}

impl CredentialService {
    /// Create a new credential service.
    #[must_use]
    pub fn new(identity: Arc<dyn IdentityBackend>, profiles: Arc<dyn ProfileStore>) -> Self {
        Self { identity, profiles }
    }

    /// Submit `form` for `view`.
    ///
    /// # Errors
    ///
    /// See [`Self::login`], [`Self::signup`] and [`Self::send_reset`].
    pub async fn submit(
        &self,
        view: AuthView,
        form: &CredentialForm,
    ) -> Result<SubmitOutcome, AuthError> {
        match view {
            AuthView::Login => self
                .login(&form.email, &form.password)
                .await
                .map(SubmitOutcome::SignedIn),
            AuthView::Signup => self
                .signup(&form.name, &form.email, &form.password)
                .await
                .map(SubmitOutcome::SignedIn),
            AuthView::Forgot => self
                .send_reset(&form.email)
                .await
                .map(|()| SubmitOutcome::ResetEmailSent),
        }
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid, or
    /// the identity backend's error.
    #[instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let email = Email::parse(email)?;
        let user = self
            .identity
            .sign_in_with_password(email.as_str(), password)
            .await?;

        tracing::info!(uid = %user.uid, "Signed in with password");
        Ok(user.identity())
    }

    /// Create an account, set its display name, then write its profile.
    ///
    /// Validation happens before any backend call. A failure after the
    /// account is created leaves the account in place.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingName`, `AuthError::InvalidEmail` or
    /// `AuthError::WeakPassword` for bad input, otherwise the backend's error.
    #[instrument(skip_all)]
    pub async fn signup(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Identity, AuthError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AuthError::MissingName);
        }
        let email = Email::parse(email)?;
        validate_password(password)?;

        let user = self
            .identity
            .create_account(email.as_str(), password)
            .await?;
        let user = self.identity.update_display_name(&user, name).await?;
        self.profiles
            .write_profile(&user, &ProfileRecord::new(name, email.as_str()))
            .await?;

        tracing::info!(uid = %user.uid, "Account created");
        Ok(user.identity())
    }

    /// Request a password reset email.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingResetEmail` if no email was entered.
    #[instrument(skip_all)]
    pub async fn send_reset(&self, email: &str) -> Result<(), AuthError> {
        if email.trim().is_empty() {
            return Err(AuthError::MissingResetEmail);
        }
        let email = Email::parse(email)?;
        self.identity.send_password_reset(email.as_str()).await?;

        tracing::info!("Password reset email requested");
        Ok(())
    }

    /// Sign in with a federated credential, creating the profile on first
    /// sign-in.
    ///
    /// # Errors
    ///
    /// Returns the backend's or the profile store's error.
    #[instrument(skip_all, fields(provider = credential.provider_id))]
    pub async fn federated_sign_in(
        &self,
        credential: &FederatedCredential,
    ) -> Result<Identity, AuthError> {
        let user = self.identity.sign_in_with_federated(credential).await?;
        let identity = user.identity();

        if self.profiles.read_profile(&user).await?.is_none() {
            let profile = ProfileRecord::new(identity.name.clone(), identity.email.clone());
            self.profiles.write_profile(&user, &profile).await?;
            tracing::info!(uid = %user.uid, "Profile created on first federated sign-in");
        }

        Ok(identity)
    }
}

/// Validate password strength.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword);
    }
    Ok(())
}

// =============================================================================
// Credential Flow
// =============================================================================

/// A submission accepted by [`CredentialFlow::begin`].
#[derive(Debug)]
pub struct Submission {
    pub view: AuthView,
    pub form: CredentialForm,
}

/// Form state for one browser session.
#[derive(Debug, Default)]
pub struct CredentialFlow {
    view: AuthView,
    /// Echoed back into the form. The password is always empty.
    form: CredentialForm,
    error: Option<String>,
    success: Option<String>,
    in_flight: bool,
}

impl CredentialFlow {
    #[must_use]
    pub const fn view(&self) -> AuthView {
        self.view
    }

    #[must_use]
    pub const fn form(&self) -> &CredentialForm {
        &self.form
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub fn success(&self) -> Option<&str> {
        self.success.as_deref()
    }

    #[must_use]
    pub const fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Switch views, clearing fields and messages.
    ///
    /// Returns `false` (and changes nothing) for a disallowed transition.
    pub fn switch_to(&mut self, target: AuthView) -> bool {
        if !self.view.can_switch_to(target) {
            return false;
        }
        self.view = target;
        self.clear();
        true
    }

    /// Back to a blank login form.
    pub fn reset(&mut self) {
        self.view = AuthView::Login;
        self.clear();
    }

    fn clear(&mut self) {
        self.form = CredentialForm::default();
        self.error = None;
        self.success = None;
    }

    /// Accept a submission unless one is already running.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Busy` while a previous submission is in flight.
    pub fn begin(&mut self, form: CredentialForm) -> Result<Submission, AuthError> {
        if self.in_flight {
            return Err(AuthError::Busy);
        }
        self.in_flight = true;
        self.error = None;
        self.success = None;
        self.form = CredentialForm {
            name: form.name.clone(),
            email: form.email.clone(),
            password: String::new(),
        };

        Ok(Submission {
            view: self.view,
            form,
        })
    }

    /// Record the result of the submission started by [`Self::begin`].
    pub fn finish(&mut self, result: &Result<SubmitOutcome, AuthError>) {
        self.in_flight = false;
        match result {
            Ok(SubmitOutcome::SignedIn(_)) => self.reset(),
            Ok(SubmitOutcome::ResetEmailSent) => {
                self.success = Some(RESET_EMAIL_SENT.to_owned());
            }
            Err(err) => self.fail(err),
        }
    }

    /// Record the result of a federated sign-in.
    pub fn finish_federated(&mut self, result: &Result<Identity, AuthError>) {
        match result {
            Ok(_) => self.reset(),
            Err(err) => self.fail(err),
        }
    }

    fn fail(&mut self, err: &AuthError) {
        if err.is_cancellation() {
            tracing::debug!("Federated sign-in cancelled");
            return;
        }
        tracing::warn!(error = %err, view = self.view.as_str(), "Credential submission failed");
        self.error = Some(err.user_message());
    }
}
