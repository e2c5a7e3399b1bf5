//! Gemini API client.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tracing::instrument;

use crate::config::GeminiConfig;

use super::error::{ApiErrorResponse, GeminiError};
use super::types::{GenerateContentRequest, GenerateContentResponse, StructuredRequest};
use super::GenerativeModel;

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com";

/// Gemini API client.
#[derive(Clone)]
pub struct GeminiClient {
    inner: Arc<GeminiClientInner>,
}

struct GeminiClientInner {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
}

impl GeminiClient {
    /// Create a new Gemini client.
    #[must_use]
    pub fn new(config: &GeminiConfig) -> Self {
        Self {
            inner: Arc::new(GeminiClientInner {
                client: reqwest::Client::new(),
                api_key: config.api_key.clone(),
                model: config.model.clone(),
            }),
        }
    }

    /// The configured model name.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.inner.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{GEMINI_API_URL}/v1beta/models/{}:generateContent",
            self.inner.model
        )
    }

    /// Handle an error status code.
    async fn handle_error_status(
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> GeminiError {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return GeminiError::RateLimited;
        }

        match response.text().await {
            Ok(body) => match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_error) => {
                    tracing::warn!(
                        code = api_error.error.code,
                        status = %api_error.error.status,
                        "Gemini API error"
                    );
                    GeminiError::Api {
                        status: api_error.error.status,
                        message: api_error.error.message,
                    }
                }
                Err(_) => GeminiError::Api {
                    status: status.to_string(),
                    message: body,
                },
            },
            Err(e) => GeminiError::Http(e),
        }
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    #[instrument(skip(self, request), fields(model = %self.inner.model))]
    async fn generate_structured(
        &self,
        request: &StructuredRequest,
    ) -> Result<String, GeminiError> {
        let body = GenerateContentRequest::from(request);

        let response = self
            .inner
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.inner.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::handle_error_status(status, response).await);
        }

        let text = response.text().await?;
        let parsed: GenerateContentResponse = serde_json::from_str(&text)
            .map_err(|e| GeminiError::Parse(format!("Failed to parse response: {e}")))?;

        parsed.text().ok_or(GeminiError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_uses_model() {
        let client = GeminiClient::new(&GeminiConfig {
            api_key: SecretString::from("key"),
            model: "gemini-2.5-flash".to_owned(),
        });
        assert_eq!(client.model(), "gemini-2.5-flash");
        assert_eq!(
            client.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }
}
