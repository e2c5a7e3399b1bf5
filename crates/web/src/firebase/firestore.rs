//! Cloud Firestore REST client for `users/{uid}` profile documents.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pillow_ease_core::{MassageMode, ProfileRecord, ProfileSettings};
use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::config::FirebaseConfig;

use super::error::ProfileStoreError;
use super::identity::AuthUser;

const FIRESTORE_URL: &str = "https://firestore.googleapis.com/v1";
const USERS_COLLECTION: &str = "users";

/// Per-user profile persistence.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Read the user's profile; `Ok(None)` when it does not exist.
    async fn read_profile(&self, user: &AuthUser)
    -> Result<Option<ProfileRecord>, ProfileStoreError>;

    /// Write the user's profile. `created_at` is assigned by the store.
    async fn write_profile(
        &self,
        user: &AuthUser,
        profile: &ProfileRecord,
    ) -> Result<(), ProfileStoreError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire Types
// ─────────────────────────────────────────────────────────────────────────────

/// A Firestore typed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
enum Value {
    NullValue(()),
    BooleanValue(bool),
    /// int64 travels as a decimal string.
    IntegerValue(String),
    DoubleValue(f64),
    TimestampValue(String),
    StringValue(String),
    MapValue(MapValue),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
struct MapValue {
    #[serde(default)]
    fields: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Document {
    #[serde(default)]
    fields: BTreeMap<String, Value>,
    create_time: Option<String>,
}

#[derive(Serialize)]
struct CommitRequest {
    writes: Vec<Write>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Write {
    update: WriteDocument,
    update_transforms: Vec<FieldTransform>,
}

#[derive(Serialize)]
struct WriteDocument {
    name: String,
    fields: BTreeMap<String, Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FieldTransform {
    field_path: &'static str,
    set_to_server_value: &'static str,
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
// Conversions
// ─────────────────────────────────────────────────────────────────────────────

fn encode_profile(profile: &ProfileRecord) -> BTreeMap<String, Value> {
    let settings = MapValue {
        fields: BTreeMap::from([
            (
                "lastMode".to_owned(),
                Value::StringValue(profile.settings.last_mode.as_str().to_owned()),
            ),
            (
                "intensity".to_owned(),
                Value::IntegerValue(profile.settings.intensity.to_string()),
            ),
        ]),
    };

    BTreeMap::from([
        ("name".to_owned(), Value::StringValue(profile.name.clone())),
        ("email".to_owned(), Value::StringValue(profile.email.clone())),
        ("settings".to_owned(), Value::MapValue(settings)),
    ])
}

fn decode_profile(document: Document) -> Result<ProfileRecord, ProfileStoreError> {
    let fields = &document.fields;

    let name = string_field(fields, "name").unwrap_or_default();
    let email = string_field(fields, "email").unwrap_or_default();
    let created_at = match fields.get("createdAt") {
        Some(Value::TimestampValue(ts)) => Some(parse_timestamp(ts)?),
        _ => document.create_time.as_deref().map(parse_timestamp).transpose()?,
    };

    let mut settings = ProfileSettings::default();
    if let Some(Value::MapValue(map)) = fields.get("settings") {
        if let Some(mode) = string_field(&map.fields, "lastMode") {
            settings.last_mode = MassageMode::from_wire(&mode)
                .ok_or_else(|| ProfileStoreError::Malformed(format!("unknown mode {mode}")))?;
        }
        if let Some(Value::IntegerValue(raw)) = map.fields.get("intensity") {
            let intensity: i64 = raw
                .parse()
                .map_err(|_| ProfileStoreError::Malformed(format!("bad intensity {raw}")))?;
            settings.intensity = u8::try_from(intensity.clamp(0, 100)).unwrap_or(100);
        }
    }

    Ok(ProfileRecord {
        name,
        email,
        created_at,
        settings,
    })
}

fn string_field(fields: &BTreeMap<String, Value>, key: &str) -> Option<String> {
    match fields.get(key) {
        Some(Value::StringValue(value)) => Some(value.clone()),
        _ => None,
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ProfileStoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| ProfileStoreError::Malformed(format!("bad timestamp {raw}: {e}")))
}

// ─────────────────────────────────────────────────────────────────────────────
// Firestore Client
// ─────────────────────────────────────────────────────────────────────────────

/// Firestore client scoped to one project's default database.
#[derive(Clone)]
pub struct FirestoreClient {
    inner: Arc<FirestoreClientInner>,
}

struct FirestoreClientInner {
    client: reqwest::Client,
    /// `projects/{project}/databases/(default)/documents`
    database_path: String,
}

impl FirestoreClient {
    /// Create a new Firestore client.
    #[must_use]
    pub fn new(config: &FirebaseConfig) -> Self {
        Self {
            inner: Arc::new(FirestoreClientInner {
                client: reqwest::Client::new(),
                database_path: format!(
                    "projects/{}/databases/(default)/documents",
                    config.project_id
                ),
            }),
        }
    }

    fn document_name(&self, user: &AuthUser) -> String {
        format!(
            "{}/{USERS_COLLECTION}/{}",
            self.inner.database_path,
            urlencoding::encode(user.uid.as_str())
        )
    }

    async fn api_error(response: reqwest::Response) -> ProfileStoreError {
        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&text)
            .map_or(text, |envelope| envelope.error.message);
        ProfileStoreError::Api { status, message }
    }
}

#[async_trait]
impl ProfileStore for FirestoreClient {
    #[instrument(skip(self, user), fields(uid = %user.uid))]
    async fn read_profile(
        &self,
        user: &AuthUser,
    ) -> Result<Option<ProfileRecord>, ProfileStoreError> {
        let url = format!("{FIRESTORE_URL}/{}", self.document_name(user));
        let response = self
            .inner
            .client
            .get(&url)
            .bearer_auth(user.id_token.expose_secret())
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let document: Document = response.json().await?;
        decode_profile(document).map(Some)
    }

    #[instrument(skip(self, user, profile), fields(uid = %user.uid))]
    async fn write_profile(
        &self,
        user: &AuthUser,
        profile: &ProfileRecord,
    ) -> Result<(), ProfileStoreError> {
        let url = format!("{FIRESTORE_URL}/{}:commit", self.inner.database_path);
        let request = CommitRequest {
            writes: vec![Write {
                update: WriteDocument {
                    name: self.document_name(user),
                    fields: encode_profile(profile),
                },
                update_transforms: vec![FieldTransform {
                    field_path: "createdAt",
                    set_to_server_value: "REQUEST_TIME",
                }],
            }],
        };

        let response = self
            .inner
            .client
            .post(&url)
            .bearer_auth(user.id_token.expose_secret())
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        tracing::info!("Profile document written");
        Ok(())
    }
}

/// Stand-in used when Firebase is not configured.
#[derive(Debug, Default)]
pub struct DisabledProfileStore;

#[async_trait]
impl ProfileStore for DisabledProfileStore {
    async fn read_profile(&self, _: &AuthUser) -> Result<Option<ProfileRecord>, ProfileStoreError> {
        Err(ProfileStoreError::NotConfigured)
    }

    async fn write_profile(&self, _: &AuthUser, _: &ProfileRecord) -> Result<(), ProfileStoreError> {
        Err(ProfileStoreError::NotConfigured)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_profile_shape() {
        let profile = ProfileRecord::new("Ada", "ada@example.com");
        let json = serde_json::to_value(encode_profile(&profile)).unwrap();
        assert_eq!(json["name"]["stringValue"], "Ada");
        assert_eq!(
            json["settings"]["mapValue"]["fields"]["lastMode"]["stringValue"],
            "KNEADING"
        );
        assert_eq!(
            json["settings"]["mapValue"]["fields"]["intensity"]["integerValue"],
            "50"
        );
        assert!(json.get("createdAt").is_none());
    }

    #[test]
    fn test_decode_profile_document() {
        let json = r#"{
            "name": "projects/p/databases/(default)/documents/users/abc",
            "fields": {
                "name": {"stringValue": "Ada"},
                "email": {"stringValue": "ada@example.com"},
                "createdAt": {"timestampValue": "2026-01-02T03:04:05.123456Z"},
                "settings": {"mapValue": {"fields": {
                    "lastMode": {"stringValue": "WAVE"},
                    "intensity": {"integerValue": "70"}
                }}}
            },
            "createTime": "2026-01-02T03:04:05.123456Z",
            "updateTime": "2026-01-02T03:04:05.123456Z"
        }"#;
        let document: Document = serde_json::from_str(json).unwrap();
        let profile = decode_profile(document).unwrap();
        assert_eq!(profile.name, "Ada");
        assert_eq!(profile.settings.last_mode, MassageMode::Wave);
        assert_eq!(profile.settings.intensity, 70);
        assert!(profile.created_at.is_some());
    }

    #[test]
    fn test_decode_profile_tolerates_missing_settings() {
        let json = r#"{"fields": {"name": {"stringValue": "Ada"}, "extra": {"nullValue": null}}}"#;
        let document: Document = serde_json::from_str(json).unwrap();
        let profile = decode_profile(document).unwrap();
        assert_eq!(profile.settings, ProfileSettings::default());
        assert!(profile.created_at.is_none());
    }

    #[test]
    fn test_commit_request_sets_created_at_on_server() {
        let request = CommitRequest {
            writes: vec![Write {
                update: WriteDocument {
                    name: "projects/p/databases/(default)/documents/users/abc".to_owned(),
                    fields: BTreeMap::new(),
                },
                update_transforms: vec![FieldTransform {
                    field_path: "createdAt",
                    set_to_server_value: "REQUEST_TIME",
                }],
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json["writes"][0]["updateTransforms"][0]["setToServerValue"],
            "REQUEST_TIME"
        );
    }
}
