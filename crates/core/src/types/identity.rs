//! The signed-in user as seen by the rest of the app.

use serde::{Deserialize, Serialize};

use super::id::UserId;

/// Display name used when the identity backend has none on record.
pub const DEFAULT_DISPLAY_NAME: &str = "User";

/// An authenticated identity.
///
/// Mapped from the identity backend's user record: a missing or blank display
/// name becomes [`DEFAULT_DISPLAY_NAME`], a missing email becomes `""`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

impl Identity {
    /// Build an identity from the backend's optional fields.
    #[must_use]
    pub fn from_backend(id: UserId, display_name: Option<&str>, email: Option<&str>) -> Self {
        let name = display_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_DISPLAY_NAME)
            .to_owned();

        Self {
            id,
            name,
            email: email.unwrap_or_default().to_owned(),
        }
    }
}
