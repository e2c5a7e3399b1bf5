//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Landing page
//! GET  /health                 - Health check
//!
//! # Auth
//! GET  /auth                   - Login / signup / forgot-password form
//! POST /auth/view              - Switch form
//! POST /auth/submit            - Submit the current form
//! POST /auth/logout            - Logout
//! GET  /auth/google            - Redirect to Google OAuth
//! GET  /auth/google/callback   - Handle OAuth callback
//!
//! # Dashboard (requires sign-in)
//! GET  /dashboard              - Device dashboard
//! POST /dashboard/power        - Toggle power
//! POST /dashboard/heat         - Set heat level
//! POST /dashboard/intensity    - Set intensity
//! POST /dashboard/mode         - Set massage mode
//! POST /dashboard/coach        - Ask the AI coach
//!
//! # JSON API
//! GET  /api/session            - Session snapshot
//! GET  /api/device             - Mounted device state
//! POST /api/recommendation     - Ask the AI coach, apply the answer
//! ```

pub mod api;
pub mod auth;
pub mod dashboard;
pub mod google_auth;
pub mod home;

use axum::{
    Router,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};

use crate::services::{ClientSession, FIRST_NOTIFICATION_GRACE, Gate, SessionState, View, decide};
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(auth::auth_page))
        .route("/view", post(auth::switch_view))
        .route("/submit", post(auth::submit))
        .route("/logout", post(auth::logout))
        .route("/google", get(google_auth::login))
        .route("/google/callback", get(google_auth::callback))
}

/// Create the dashboard routes router.
pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard::show))
        .route("/power", post(dashboard::power))
        .route("/heat", post(dashboard::heat))
        .route("/intensity", post(dashboard::intensity))
        .route("/mode", post(dashboard::mode))
        .route("/coach", post(dashboard::coach))
}

/// Create the JSON API routes router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/session", get(api::session))
        .route("/device", get(api::device))
        .route("/recommendation", post(api::recommendation))
}

/// Create the main routes router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::landing))
        .nest("/auth", auth_routes())
        .nest("/dashboard", dashboard_routes())
        .nest("/api", api_routes())
}

/// Gate a view on the client's session.
///
/// Gives the first auth-state notification a short grace period so a
/// settled session never sees the loading page.
async fn gate(client: &ClientSession, view: View) -> (Gate, SessionState) {
    let session = client
        .store()
        .wait_for(|state| !state.is_loading, FIRST_NOTIFICATION_GRACE)
        .await;
    (decide(view, &session), session)
}

/// Response for a gate that does not render the view.
fn gated(gate: Gate) -> Option<Response> {
    match gate {
        Gate::Render => None,
        Gate::Loading => Some(home::LoadingTemplate::default().into_response()),
        Gate::Redirect(view) => Some(Redirect::to(view.path()).into_response()),
    }
}
