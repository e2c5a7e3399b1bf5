//! Business logic services.
//!
//! # Services
//!
//! - `session_store` - Who is signed in, followed from the identity backend
//! - `auth` - Credential flow (login, signup, password reset, Google)
//! - `dashboard` - Simulated device state for a mounted dashboard
//! - `recommend` - AI relaxation coach with a fixed fallback
//! - `shell` - Which view a session may see
//! - `registry` - Per-browser client sessions with idle eviction

pub mod auth;
pub mod dashboard;
pub mod recommend;
pub mod registry;
pub mod session_store;
pub mod shell;

pub use auth::{
    AuthError, AuthView, CredentialFlow, CredentialForm, CredentialService, SubmitOutcome,
};
pub use dashboard::DashboardView;
pub use recommend::RecommendationClient;
pub use registry::{ClientRegistry, ClientSession, IdentityFactory};
pub use session_store::{SessionState, SessionStore};
pub use shell::{FIRST_NOTIFICATION_GRACE, Gate, View, decide};
