//! Google sign-in route handlers.
//!
//! - Login: redirects to Google's consent page
//! - Callback: exchanges the code for an id token and signs in with it,
//!   forwarding the nonce so Firebase can match it against the token
//!
//! Every failure lands back on the auth form as an inline message;
//! declining on the consent page is silently ignored.

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use rand::Rng;
use secrecy::SecretString;
use serde::Deserialize;
use tower_sessions::Session;

use crate::error::{AppError, set_sentry_user};
use crate::firebase::{FederatedCredential, IdentityError, OAuthError};
use crate::middleware::Client;
use crate::models::session_keys;
use crate::services::{AuthError, ClientSession, View};
use crate::state::AppState;

/// Error code Google returns when the user declines.
const ACCESS_DENIED: &str = "access_denied";

const STATE_LENGTH: usize = 32;

/// Query parameters from the Google OAuth callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    /// Authorization code to exchange for tokens.
    pub code: Option<String>,
    /// State parameter for CSRF protection.
    pub state: Option<String>,
    /// Error code if authorization failed.
    pub error: Option<String>,
    /// Error description.
    pub error_description: Option<String>,
}

/// Generate a random alphanumeric string.
fn generate_random_string(length: usize) -> String {
    rand::rng()
        .sample_iter(rand::distr::Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

fn redirect_uri(state: &AppState) -> String {
    format!("{}/auth/google/callback", state.config().base_url)
}

/// Record a failed federated attempt on the form and return to it.
async fn fail(client: &ClientSession, err: AuthError) -> Response {
    client.flow().lock().await.finish_federated(&Err(err));
    Redirect::to(View::Auth.path()).into_response()
}

/// Initiate Google sign-in.
///
/// Generates state and nonce parameters, stores them in the session,
/// and redirects to Google's authorization page.
///
/// # Route
///
/// `GET /auth/google`
pub async fn login(
    State(state): State<AppState>,
    Client(client): Client,
    session: Session,
) -> Result<Response, AppError> {
    let Some(google) = state.google() else {
        tracing::warn!("Google sign-in requested but not configured");
        return Ok(fail(&client, IdentityError::NotConfigured.into()).await);
    };

    let oauth_state = generate_random_string(STATE_LENGTH);
    let nonce = generate_random_string(STATE_LENGTH);

    session
        .insert(session_keys::GOOGLE_OAUTH_STATE, &oauth_state)
        .await?;
    session
        .insert(session_keys::GOOGLE_OAUTH_NONCE, &nonce)
        .await?;

    let auth_url = google.authorization_url(&redirect_uri(&state), &oauth_state, &nonce);
    Ok(Redirect::to(&auth_url).into_response())
}

/// Handle the Google OAuth callback.
///
/// Validates the state parameter, exchanges the authorization code for an
/// id token and completes a federated sign-in with the identity backend.
///
/// # Route
///
/// `GET /auth/google/callback`
pub async fn callback(
    State(state): State<AppState>,
    Client(client): Client,
    session: Session,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, AppError> {
    let stored_state: Option<String> = session.remove(session_keys::GOOGLE_OAUTH_STATE).await?;
    let nonce: Option<String> = session.remove(session_keys::GOOGLE_OAUTH_NONCE).await?;

    if let Some(error) = query.error {
        if error == ACCESS_DENIED {
            return Ok(fail(&client, IdentityError::Cancelled.into()).await);
        }
        let description = query.error_description.unwrap_or_default();
        tracing::warn!(%error, %description, "Google OAuth error");
        return Ok(fail(&client, OAuthError::Provider(error).into()).await);
    }

    let Some(code) = query.code else {
        tracing::warn!("Google OAuth callback missing code");
        return Ok(fail(&client, OAuthError::MissingCode.into()).await);
    };

    if stored_state.is_none() || stored_state != query.state {
        tracing::warn!("Google OAuth state mismatch");
        return Ok(fail(&client, OAuthError::InvalidState.into()).await);
    }

    let Some(google) = state.google() else {
        return Ok(fail(&client, IdentityError::NotConfigured.into()).await);
    };

    let redirect_uri = redirect_uri(&state);
    let tokens = match google.exchange_code(&code, &redirect_uri).await {
        Ok(tokens) => tokens,
        Err(err) => {
            tracing::error!(error = %err, "Failed to exchange Google OAuth code");
            return Ok(fail(&client, err.into()).await);
        }
    };

    let credential = FederatedCredential::google(
        tokens.id_token,
        state.config().base_url.clone(),
        nonce.map(SecretString::from),
    );
    match client.federated_sign_in(&credential).await {
        Ok(identity) => {
            set_sentry_user(&identity.id, Some(&identity.email));
            tracing::info!(uid = %identity.id, "Signed in with Google");
            Ok(Redirect::to(View::Dashboard.path()).into_response())
        }
        Err(_) => Ok(Redirect::to(View::Auth.path()).into_response()),
    }
}
