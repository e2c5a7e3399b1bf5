//! Session-related types.
//!
//! The cookie session only carries the browser's client ID and the
//! short-lived Google OAuth values; everything else lives in the
//! server-side client session it points to.

/// Session keys.
pub mod keys {
    /// Key for the browser's client ID (a UUID).
    pub const CLIENT_ID: &str = "client_id";

    /// Key for Google OAuth state (CSRF protection).
    pub const GOOGLE_OAUTH_STATE: &str = "google_oauth_state";

    /// Key for Google OAuth nonce (`OpenID` Connect replay protection).
    pub const GOOGLE_OAUTH_NONCE: &str = "google_oauth_nonce";
}
