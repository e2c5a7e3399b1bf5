//! Gemini API integration for the AI relaxation coach.
//!
//! One operation is used: `generateContent` with a system instruction, a
//! single user turn, and a JSON response schema. The model's reply is
//! returned as raw text; callers own the parsing.

mod client;
mod error;
mod types;

pub use client::GeminiClient;
pub use error::GeminiError;
pub use types::StructuredRequest;

use async_trait::async_trait;

/// A hosted model that can answer with schema-constrained JSON.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Generate a response and return the first candidate's text.
    async fn generate_structured(&self, request: &StructuredRequest)
    -> Result<String, GeminiError>;
}
