//! HTTP middleware stack.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request spans)
//! 3. Security headers (CSP, frame denial, no-store)
//! 4. Session layer (tower-sessions, in-memory store)
//!
//! The [`Client`] extractor then maps the cookie session to a client session.

pub mod client;
pub mod security_headers;
pub mod session;

pub use client::Client;
pub use security_headers::security_headers_middleware;
pub use session::{SESSION_COOKIE_NAME, create_session_layer};
