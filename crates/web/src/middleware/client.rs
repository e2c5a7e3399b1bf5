//! Client session extractor.
//!
//! Resolves the browser's server-side [`ClientSession`] from the client ID in
//! its cookie session, assigning a fresh ID on first contact.

use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::session_keys;
use crate::services::ClientSession;
use crate::state::AppState;

/// The requesting browser's client session.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(Client(client): Client) -> impl IntoResponse {
///     Json(client.store().snapshot())
/// }
/// ```
pub struct Client(pub Arc<ClientSession>);

impl FromRequestParts<AppState> for Client {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Set by SessionManagerLayer
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session layer missing".to_owned()))?;

        let client_id = client_id(&session).await?;
        Ok(Self(state.registry().get_or_create(client_id).await))
    }
}

/// The client ID stored in `session`, created if absent.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn client_id(session: &Session) -> Result<Uuid, tower_sessions::session::Error> {
    if let Some(id) = session.get::<Uuid>(session_keys::CLIENT_ID).await? {
        return Ok(id);
    }

    let id = Uuid::new_v4();
    session.insert(session_keys::CLIENT_ID, id).await?;
    tracing::debug!(client_id = %id, "New client");
    Ok(id)
}
