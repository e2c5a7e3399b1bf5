//! Per-user profile document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::device::MassageMode;

/// Settings stored alongside the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSettings {
    pub last_mode: MassageMode,
    pub intensity: u8,
}

impl Default for ProfileSettings {
    fn default() -> Self {
        Self {
            last_mode: MassageMode::Kneading,
            intensity: 50,
        }
    }
}

/// The `users/{uid}` document.
///
/// Written once, on signup or first federated sign-in. `created_at` is
/// assigned by the document store, so it is `None` on records that have not
/// been read back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    pub name: String,
    pub email: String,
    pub created_at: Option<DateTime<Utc>>,
    pub settings: ProfileSettings,
}

impl ProfileRecord {
    /// A new record with default settings.
    #[must_use]
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            created_at: None,
            settings: ProfileSettings::default(),
        }
    }
}
