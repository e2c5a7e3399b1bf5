//! Opaque user identifier issued by the identity backend.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A user ID as issued by Firebase Authentication (`localId` / `uid`).
///
/// The value is opaque to PillowEase: it is never parsed, only compared and
/// used as the profile document key. There are no mutators, so an ID cannot
/// change once issued.
///
/// ```
/// use pillow_ease_core::UserId;
///
/// let id = UserId::new("x8QvJ2kLm0");
/// assert_eq!(id.as_str(), "x8QvJ2kLm0");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wrap a backend-issued ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
