//! Core types for PillowEase.

pub mod device;
pub mod email;
pub mod id;
pub mod identity;
pub mod profile;
pub mod recommendation;

pub use device::{DeviceState, HeatLevel, MassageMode};
pub use email::{Email, EmailError};
pub use id::UserId;
pub use identity::{DEFAULT_DISPLAY_NAME, Identity};
pub use profile::{ProfileRecord, ProfileSettings};
pub use recommendation::{FALLBACK_REASONING, Recommendation};
