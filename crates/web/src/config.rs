//! Application configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Server
//! - `PILLOWEASE_HOST` - Bind address (default: 127.0.0.1)
//! - `PILLOWEASE_PORT` - Listen port (default: 3000)
//! - `PILLOWEASE_BASE_URL` - Public URL, used for OAuth redirects (default: <http://localhost:3000>)
//! - `PILLOWEASE_CONNECT_DELAY_MS` - Simulated device connect delay (default: 2000)
//! - `PILLOWEASE_CLIENT_IDLE_SECS` - Idle time before a client session is dropped (default: 1800)
//!
//! ## Credentials (optional, each disables a feature when absent)
//! - `FIREBASE_API_KEY`, `FIREBASE_PROJECT_ID` - Firebase Auth + Firestore profiles
//! - `FIREBASE_AUTH_DOMAIN` - defaults to `<project>.firebaseapp.com`
//! - `GOOGLE_OAUTH_CLIENT_ID`, `GOOGLE_OAUTH_CLIENT_SECRET` - Google sign-in
//! - `GEMINI_API_KEY` (or `API_KEY`) - AI coach; `GEMINI_MODEL` (default: gemini-2.5-flash)
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT` - Sentry error tracking
//!
//! Missing or placeholder credentials never fail startup. The matching section
//! is left as `None` and the reason is collected in [`AppConfig::warnings`].

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_CONNECT_DELAY_MS: u64 = 2000;
const DEFAULT_CLIENT_IDLE_SECS: u64 = 30 * 60;
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "your_",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "insert",
    "enter-",
    "put-your",
];

/// Configuration errors that can occur during loading.
///
/// Only malformed server settings are errors; credential problems are warnings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL
    pub base_url: String,
    /// Delay before the simulated device reports connected
    pub connect_delay: Duration,
    /// Idle time after which a browser's client session is dropped
    pub client_idle_timeout: Duration,
    /// Firebase Auth + Firestore, `None` when not configured
    pub firebase: Option<FirebaseConfig>,
    /// Google OAuth client for federated sign-in, `None` when not configured
    pub google_oauth: Option<GoogleOAuthConfig>,
    /// Gemini API, `None` when not configured
    pub gemini: Option<GeminiConfig>,
    /// Sentry settings
    pub sentry: SentryConfig,
    warnings: Vec<String>,
}

/// Firebase project credentials.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct FirebaseConfig {
    /// Web API key
    pub api_key: SecretString,
    /// Project ID (Firestore database owner)
    pub project_id: String,
    /// Auth domain, informational
    pub auth_domain: String,
}

impl std::fmt::Debug for FirebaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseConfig")
            .field("api_key", &"[REDACTED]")
            .field("project_id", &self.project_id)
            .field("auth_domain", &self.auth_domain)
            .finish()
    }
}

/// Google OAuth 2.0 web client.
#[derive(Clone)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub client_secret: SecretString,
}

impl std::fmt::Debug for GoogleOAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleOAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

/// Gemini API settings.
#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: SecretString,
    pub model: String,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .finish()
    }
}

/// Sentry error tracking settings.
#[derive(Debug, Clone, Default)]
pub struct SentryConfig {
    pub dsn: Option<String>,
    pub environment: Option<String>,
    pub sample_rate: f32,
    pub traces_sample_rate: f32,
}

impl Default for AppConfig {
    /// Local defaults with every external service disabled.
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3000,
            base_url: "http://localhost:3000".to_owned(),
            connect_delay: Duration::from_millis(DEFAULT_CONNECT_DELAY_MS),
            client_idle_timeout: Duration::from_secs(DEFAULT_CLIENT_IDLE_SECS),
            firebase: None,
            google_oauth: None,
            gemini: None,
            sentry: SentryConfig {
                sample_rate: 1.0,
                ..SentryConfig::default()
            },
            warnings: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a server setting (host, port, delays) is
    /// present but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let mut warnings = Vec::new();

        let host = parse_env_or_default("PILLOWEASE_HOST", "127.0.0.1")?;
        let port = parse_env_or_default("PILLOWEASE_PORT", "3000")?;
        let base_url = get_env_or_default("PILLOWEASE_BASE_URL", "http://localhost:3000")
            .trim_end_matches('/')
            .to_owned();
        let connect_delay_ms: u64 = parse_env_or_default(
            "PILLOWEASE_CONNECT_DELAY_MS",
            &DEFAULT_CONNECT_DELAY_MS.to_string(),
        )?;
        let client_idle_secs: u64 = parse_env_or_default(
            "PILLOWEASE_CLIENT_IDLE_SECS",
            &DEFAULT_CLIENT_IDLE_SECS.to_string(),
        )?;

        let firebase = FirebaseConfig::from_env(&mut warnings);
        let google_oauth = GoogleOAuthConfig::from_env(&mut warnings);
        let gemini = GeminiConfig::from_env(&mut warnings);
        if firebase.is_none() && google_oauth.is_some() {
            warnings.push("Google sign-in needs Firebase; it stays disabled".to_owned());
        }

        let sentry = SentryConfig {
            dsn: get_optional_env("SENTRY_DSN"),
            environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sample_rate: parse_env_or_default("SENTRY_SAMPLE_RATE", "1.0")?,
            traces_sample_rate: parse_env_or_default("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        };

        Ok(Self {
            host,
            port,
            base_url,
            connect_delay: Duration::from_millis(connect_delay_ms),
            client_idle_timeout: Duration::from_secs(client_idle_secs),
            firebase,
            google_oauth,
            gemini,
            sentry,
            warnings,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Reasons features were disabled while loading.
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Whether cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl FirebaseConfig {
    fn from_env(warnings: &mut Vec<String>) -> Option<Self> {
        let api_key = optional_credential("FIREBASE_API_KEY", warnings);
        let project_id = get_optional_env("FIREBASE_PROJECT_ID").filter(|p| !p.trim().is_empty());
        if project_id.is_none() {
            warnings.push("FIREBASE_PROJECT_ID is not set".to_owned());
        }

        let (api_key, project_id) = (api_key?, project_id?);
        let auth_domain = get_optional_env("FIREBASE_AUTH_DOMAIN")
            .unwrap_or_else(|| format!("{project_id}.firebaseapp.com"));

        Some(Self {
            api_key,
            project_id,
            auth_domain,
        })
    }
}

impl GoogleOAuthConfig {
    fn from_env(warnings: &mut Vec<String>) -> Option<Self> {
        let client_id = get_optional_env("GOOGLE_OAUTH_CLIENT_ID");
        if client_id.is_none() {
            warnings.push("GOOGLE_OAUTH_CLIENT_ID is not set".to_owned());
        }
        let client_secret = optional_credential("GOOGLE_OAUTH_CLIENT_SECRET", warnings);

        Some(Self {
            client_id: client_id?,
            client_secret: client_secret?,
        })
    }
}

impl GeminiConfig {
    fn from_env(warnings: &mut Vec<String>) -> Option<Self> {
        // API_KEY is what the hosted AI Studio template exports
        let key = if std::env::var("GEMINI_API_KEY").is_ok() {
            "GEMINI_API_KEY"
        } else {
            "API_KEY"
        };

        Some(Self {
            api_key: optional_credential(key, warnings)?,
            model: get_env_or_default("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Load a credential, recording why it is unusable instead of failing.
fn optional_credential(key: &str, warnings: &mut Vec<String>) -> Option<SecretString> {
    let Some(value) = get_optional_env(key).filter(|v| !v.trim().is_empty()) else {
        warnings.push(format!("{key} is not set"));
        return None;
    };

    let secret = SecretString::from(value);
    match validate_secret_strength(secret.expose_secret()) {
        Ok(()) => Some(secret),
        Err(reason) => {
            warnings.push(format!("{key} {reason}"));
            None
        }
    }
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Reject placeholders (`YOUR_API_KEY_HERE`) and low-entropy values.
fn validate_secret_strength(secret: &str) -> Result<(), String> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(format!("looks like a placeholder (contains '{pattern}')"));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(format!(
            "has too little entropy ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_placeholder_api_key_rejected() {
        let err = validate_secret_strength("YOUR_API_KEY_HERE").unwrap_err();
        assert!(err.contains("placeholder"));
    }

    #[test]
    fn test_low_entropy_rejected() {
        let err = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaa").unwrap_err();
        assert!(err.contains("entropy"));
    }

    #[test]
    fn test_realistic_api_key_accepted() {
        assert!(validate_secret_strength("AIzaSyD3kq9Zx7Lw2Vb8Nc4Mf6Hj1Tg5Rp0Ye").is_ok());
    }

    #[test]
    fn test_default_has_everything_disabled() {
        let config = AppConfig::default();
        assert!(config.firebase.is_none());
        assert!(config.google_oauth.is_none());
        assert!(config.gemini.is_none());
        assert!(config.warnings().is_empty());
        assert!(!config.is_secure());
        assert_eq!(config.socket_addr().port(), 3000);
    }

    #[test]
    fn test_firebase_config_debug_redacts_key() {
        let config = FirebaseConfig {
            api_key: SecretString::from("AIzaSyD3kq9Zx7Lw2Vb8Nc4Mf6Hj1Tg5Rp0Ye"),
            project_id: "pillow-ease".to_owned(),
            auth_domain: "pillow-ease.firebaseapp.com".to_owned(),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("pillow-ease"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("AIzaSy"));
    }

    #[test]
    fn test_gemini_config_debug_redacts_key() {
        let config = GeminiConfig {
            api_key: SecretString::from("super-secret-gemini"),
            model: DEFAULT_GEMINI_MODEL.to_owned(),
        };
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("gemini-2.5-flash"));
        assert!(!debug_output.contains("super-secret-gemini"));
    }
}
