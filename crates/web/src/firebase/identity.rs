//! Firebase Authentication via the Identity Toolkit REST API.
//!
//! # Endpoints
//!
//! All calls are `POST {base}/accounts:{method}?key={api_key}`:
//!
//! | Operation | Method |
//! |---|---|
//! | Sign in with password | `signInWithPassword` |
//! | Create account | `signUp` |
//! | Set display name | `update` |
//! | Google sign-in | `signInWithIdp` |
//! | Password reset email | `sendOobCode` |
//!
//! Sign-out has no endpoint: the id token is dropped locally.

use std::sync::Arc;

use async_trait::async_trait;
use pillow_ease_core::{Identity, UserId};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::sync::watch;
use tracing::instrument;
use url::Url;

use crate::config::FirebaseConfig;

use super::error::IdentityError;

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";

/// Auth-state notifications: `Some` while signed in.
pub type AuthStateReceiver = watch::Receiver<Option<AuthUser>>;

/// A signed-in Firebase user.
///
/// Implements `Debug` manually to redact the id token.
#[derive(Clone)]
pub struct AuthUser {
    pub uid: UserId,
    pub display_name: Option<String>,
    pub email: Option<String>,
    /// Bearer token for Firestore calls made on this user's behalf.
    pub id_token: SecretString,
}

impl std::fmt::Debug for AuthUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthUser")
            .field("uid", &self.uid)
            .field("display_name", &self.display_name)
            .field("email", &self.email)
            .field("id_token", &"[REDACTED]")
            .finish()
    }
}

impl AuthUser {
    /// The app-facing identity for this user.
    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity::from_backend(
            self.uid.clone(),
            self.display_name.as_deref(),
            self.email.as_deref(),
        )
    }
}

/// A credential obtained from a federated provider.
#[derive(Clone)]
pub struct FederatedCredential {
    /// Firebase provider ID, e.g. `google.com`.
    pub provider_id: &'static str,
    /// OIDC id token issued by the provider.
    pub id_token: SecretString,
    /// URI the provider redirected back to.
    pub request_uri: String,
    /// OIDC nonce sent with the authorization request; Firebase checks it
    /// against the id token's `nonce` claim.
    pub nonce: Option<SecretString>,
}

impl FederatedCredential {
    /// A Google credential.
    #[must_use]
    pub const fn google(
        id_token: SecretString,
        request_uri: String,
        nonce: Option<SecretString>,
    ) -> Self {
        Self {
            provider_id: "google.com",
            id_token,
            request_uri,
            nonce,
        }
    }

    /// Form-encoded `postBody` for `accounts:signInWithIdp`.
    fn post_body(&self) -> String {
        let mut body = format!(
            "id_token={}&providerId={}",
            urlencoding::encode(self.id_token.expose_secret()),
            urlencoding::encode(self.provider_id)
        );
        if let Some(nonce) = &self.nonce {
            body.push_str("&nonce=");
            body.push_str(&urlencoding::encode(nonce.expose_secret()));
        }
        body
    }
}

/// Operations consumed from the identity backend.
///
/// One instance per browser session: the instance tracks who is signed in
/// and notifies subscribers when that changes.
#[async_trait]
pub trait IdentityBackend: Send + Sync {
    /// Subscribe to auth-state changes.
    ///
    /// Resolves once the backend knows its initial state; the receiver's
    /// current value is that state.
    async fn subscribe(&self) -> AuthStateReceiver;

    /// The signed-in user, if any.
    fn current_user(&self) -> Option<AuthUser>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthUser, IdentityError>;

    /// Create an account; the new user is signed in.
    async fn create_account(&self, email: &str, password: &str)
    -> Result<AuthUser, IdentityError>;

    async fn update_display_name(
        &self,
        user: &AuthUser,
        display_name: &str,
    ) -> Result<AuthUser, IdentityError>;

    async fn sign_in_with_federated(
        &self,
        credential: &FederatedCredential,
    ) -> Result<AuthUser, IdentityError>;

    async fn send_password_reset(&self, email: &str) -> Result<(), IdentityError>;

    async fn sign_out(&self) -> Result<(), IdentityError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateProfileRequest<'a> {
    id_token: &'a str,
    display_name: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IdpRequest<'a> {
    post_body: String,
    request_uri: &'a str,
    return_secure_token: bool,
    return_idp_credential: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OobCodeRequest<'a> {
    request_type: &'static str,
    email: &'a str,
}

/// Common subset of the account responses.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    id_token: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Identity Toolkit Client
// ─────────────────────────────────────────────────────────────────────────────

/// Stateless Identity Toolkit client, shared by every [`FirebaseAuth`].
#[derive(Clone)]
pub struct IdentityToolkitClient {
    inner: Arc<IdentityToolkitClientInner>,
}

struct IdentityToolkitClientInner {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

impl IdentityToolkitClient {
    /// Create a new Identity Toolkit client.
    #[must_use]
    pub fn new(config: &FirebaseConfig) -> Self {
        Self {
            inner: Arc::new(IdentityToolkitClientInner {
                client: reqwest::Client::new(),
                api_key: config.api_key.clone(),
                base_url: IDENTITY_TOOLKIT_URL.to_owned(),
            }),
        }
    }

    fn endpoint(&self, method: &str) -> Result<Url, IdentityError> {
        let mut url = Url::parse(&format!("{}/accounts:{method}", self.inner.base_url))
            .map_err(|e| IdentityError::Configuration(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("key", self.inner.api_key.expose_secret());
        Ok(url)
    }

    #[instrument(skip(self, body), fields(method = %method))]
    async fn call<B, R>(&self, method: &str, body: &B) -> Result<R, IdentityError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let response = self
            .inner
            .client
            .post(self.endpoint(method)?)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let err = serde_json::from_str::<ErrorEnvelope>(&text).map_or_else(
                |_| IdentityError::Unknown(format!("identity backend returned {status}")),
                |envelope| IdentityError::from_code(&envelope.error.message),
            );
            tracing::debug!(%status, error = %err, "Identity Toolkit call failed");
            return Err(err);
        }

        Ok(response.json().await?)
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthUser, IdentityError> {
        let request = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        let account: AccountResponse = self.call("signInWithPassword", &request).await?;
        into_user(account, None)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, IdentityError> {
        let request = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        let account: AccountResponse = self.call("signUp", &request).await?;
        into_user(account, None)
    }

    async fn update_display_name(
        &self,
        user: &AuthUser,
        display_name: &str,
    ) -> Result<AuthUser, IdentityError> {
        let request = UpdateProfileRequest {
            id_token: user.id_token.expose_secret(),
            display_name,
            return_secure_token: true,
        };
        let account: AccountResponse = self.call("update", &request).await?;
        into_user(account, Some(user))
    }

    async fn sign_in_with_idp(
        &self,
        credential: &FederatedCredential,
    ) -> Result<AuthUser, IdentityError> {
        let request = IdpRequest {
            post_body: credential.post_body(),
            request_uri: &credential.request_uri,
            return_secure_token: true,
            return_idp_credential: true,
        };
        let account: AccountResponse = self.call("signInWithIdp", &request).await?;
        into_user(account, None)
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), IdentityError> {
        let request = OobCodeRequest {
            request_type: "PASSWORD_RESET",
            email,
        };
        let _: serde_json::Value = self.call("sendOobCode", &request).await?;
        Ok(())
    }
}

/// Build an [`AuthUser`], keeping fields from `previous` the response omits.
fn into_user(
    account: AccountResponse,
    previous: Option<&AuthUser>,
) -> Result<AuthUser, IdentityError> {
    let id_token = account
        .id_token
        .map(SecretString::from)
        .or_else(|| previous.map(|user| user.id_token.clone()))
        .ok_or_else(|| IdentityError::Unknown("response carried no id token".to_owned()))?;

    Ok(AuthUser {
        uid: UserId::new(account.local_id),
        display_name: account
            .display_name
            .or_else(|| previous.and_then(|user| user.display_name.clone())),
        email: account
            .email
            .or_else(|| previous.and_then(|user| user.email.clone())),
        id_token,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Per-session Auth
// ─────────────────────────────────────────────────────────────────────────────

/// Firebase Auth for one browser session.
pub struct FirebaseAuth {
    client: IdentityToolkitClient,
    current: watch::Sender<Option<AuthUser>>,
}

impl FirebaseAuth {
    /// Start signed out.
    #[must_use]
    pub fn new(client: IdentityToolkitClient) -> Self {
        let (current, _) = watch::channel(None);
        Self { client, current }
    }

    fn signed_in(&self, user: AuthUser) -> AuthUser {
        tracing::debug!(uid = %user.uid, "auth state: signed in");
        self.current.send_replace(Some(user.clone()));
        user
    }
}

#[async_trait]
impl IdentityBackend for FirebaseAuth {
    async fn subscribe(&self) -> AuthStateReceiver {
        self.current.subscribe()
    }

    fn current_user(&self) -> Option<AuthUser> {
        self.current.borrow().clone()
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthUser, IdentityError> {
        let user = self.client.sign_in_with_password(email, password).await?;
        Ok(self.signed_in(user))
    }

    async fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthUser, IdentityError> {
        let user = self.client.sign_up(email, password).await?;
        Ok(self.signed_in(user))
    }

    async fn update_display_name(
        &self,
        user: &AuthUser,
        display_name: &str,
    ) -> Result<AuthUser, IdentityError> {
        let updated = self.client.update_display_name(user, display_name).await?;
        Ok(self.signed_in(updated))
    }

    async fn sign_in_with_federated(
        &self,
        credential: &FederatedCredential,
    ) -> Result<AuthUser, IdentityError> {
        let user = self.client.sign_in_with_idp(credential).await?;
        Ok(self.signed_in(user))
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), IdentityError> {
        self.client.send_password_reset(email).await
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        tracing::debug!("auth state: signed out");
        self.current.send_replace(None);
        Ok(())
    }
}

/// Stand-in used when Firebase is not configured.
///
/// Reports "signed out" once, then never again; every operation fails with
/// [`IdentityError::NotConfigured`].
#[derive(Debug, Default)]
pub struct DisabledIdentity;

#[async_trait]
impl IdentityBackend for DisabledIdentity {
    async fn subscribe(&self) -> AuthStateReceiver {
        let (_, receiver) = watch::channel(None);
        receiver
    }

    fn current_user(&self) -> Option<AuthUser> {
        None
    }

    async fn sign_in_with_password(&self, _: &str, _: &str) -> Result<AuthUser, IdentityError> {
        Err(IdentityError::NotConfigured)
    }

    async fn create_account(&self, _: &str, _: &str) -> Result<AuthUser, IdentityError> {
        Err(IdentityError::NotConfigured)
    }

    async fn update_display_name(&self, _: &AuthUser, _: &str) -> Result<AuthUser, IdentityError> {
        Err(IdentityError::NotConfigured)
    }

    async fn sign_in_with_federated(
        &self,
        _: &FederatedCredential,
    ) -> Result<AuthUser, IdentityError> {
        Err(IdentityError::NotConfigured)
    }

    async fn send_password_reset(&self, _: &str) -> Result<(), IdentityError> {
        Err(IdentityError::NotConfigured)
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        Err(IdentityError::NotConfigured)
    }
}
