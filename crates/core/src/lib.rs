//! PillowEase Core - Shared domain types.
//!
//! This crate provides the types shared by the PillowEase components:
//! - `web` - Landing page, authentication and the device dashboard
//! - `integration-tests` - Router-level tests
//!
//! # Architecture
//!
//! The core crate contains only types and pure state transitions - no I/O,
//! no HTTP clients, no async. Everything that talks to Firebase or Gemini
//! lives in the web crate behind adapters.
//!
//! # Modules
//!
//! - [`types`] - Identity, email, device state, recommendation and profile types

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
