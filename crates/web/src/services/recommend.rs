//! AI relaxation coach: free text in, device settings out.

use std::sync::Arc;

use pillow_ease_core::{HeatLevel, MassageMode, Recommendation};
use thiserror::Error;
use tracing::instrument;

use crate::gemini::{GeminiError, GenerativeModel, StructuredRequest};

/// Why a recommendation fell back to the default.
#[derive(Debug, Error)]
enum RecommendError {
    #[error("AI coach not configured")]
    NotConfigured,

    #[error("empty input")]
    EmptyInput,

    #[error(transparent)]
    Model(#[from] GeminiError),

    #[error("unreadable recommendation: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Recommendation client. Never fails: every error becomes
/// [`Recommendation::fallback`].
#[derive(Clone, Default)]
pub struct RecommendationClient {
    model: Option<Arc<dyn GenerativeModel>>,
}

impl RecommendationClient {
    /// Create a client; `None` always answers with the fallback.
    #[must_use]
    pub fn new(model: Option<Arc<dyn GenerativeModel>>) -> Self {
        Self { model }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.model.is_some()
    }

    /// Recommend settings for how the user feels.
    #[instrument(skip_all)]
    pub async fn recommend(&self, feeling: &str) -> Recommendation {
        match self.try_recommend(feeling).await {
            Ok(recommendation) => {
                if !recommendation.within_advertised_ranges() {
                    tracing::warn!(
                        intensity = recommendation.intensity,
                        duration = recommendation.duration,
                        "Model answered outside the requested ranges"
                    );
                }
                recommendation
            }
            Err(err) => {
                tracing::warn!(error = %err, "AI coach unavailable, using fallback");
                Recommendation::fallback()
            }
        }
    }

    async fn try_recommend(&self, feeling: &str) -> Result<Recommendation, RecommendError> {
        let feeling = feeling.trim();
        if feeling.is_empty() {
            return Err(RecommendError::EmptyInput);
        }
        let model = self.model.as_ref().ok_or(RecommendError::NotConfigured)?;

        let text = model.generate_structured(&coach_request(feeling)).await?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// The request sent for `feeling`.
#[must_use]
pub fn coach_request(feeling: &str) -> StructuredRequest {
    StructuredRequest {
        system_instruction: system_instruction(),
        user_text: format!(
            "The user feels: \"{feeling}\". Recommend settings for a pillow massager."
        ),
        response_schema: response_schema(),
    }
}

fn system_instruction() -> String {
    let modes: String = MassageMode::ALL
        .iter()
        .map(|mode| format!("- {}: {}\n", mode.as_str(), mode.description()))
        .collect();
    let heat = HeatLevel::ALL.map(HeatLevel::as_str).join(", ");
    let (min_intensity, max_intensity) = (
        Recommendation::INTENSITY_RANGE.start(),
        Recommendation::INTENSITY_RANGE.end(),
    );
    let (min_duration, max_duration) = (
        Recommendation::DURATION_RANGE.start(),
        Recommendation::DURATION_RANGE.end(),
    );

    format!(
        "You are an expert relaxation therapist controlling a smart pillow massager called \
         \"PillowEase\".\n\
         Based on the user's description of their physical state or mood, recommend the \
         optimal settings.\n\n\
         Available Modes:\n{modes}\n\
         Intensity: {min_intensity}-{max_intensity}.\n\
         Heat: {heat}.\n\
         Duration: {min_duration}-{max_duration} minutes.\n"
    )
}

fn response_schema() -> serde_json::Value {
    let modes: Vec<&str> = MassageMode::ALL.iter().map(|mode| mode.as_str()).collect();
    let heat: Vec<&str> = HeatLevel::ALL.iter().map(|level| level.as_str()).collect();

    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "mode": { "type": "STRING", "enum": modes },
            "intensity": { "type": "INTEGER" },
            "heat": { "type": "STRING", "enum": heat },
            "duration": { "type": "INTEGER" },
            "reasoning": { "type": "STRING" }
        },
        "required": ["mode", "intensity", "heat", "duration", "reasoning"]
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pillow_ease_core::FALLBACK_REASONING;

    struct FixedModel(Result<&'static str, ()>);

    #[async_trait]
    impl GenerativeModel for FixedModel {
        async fn generate_structured(&self, _: &StructuredRequest) -> Result<String, GeminiError> {
            self.0.map(str::to_owned).map_err(|()| GeminiError::EmptyResponse)
        }
    }

    fn client(answer: Result<&'static str, ()>) -> RecommendationClient {
        RecommendationClient::new(Some(Arc::new(FixedModel(answer))))
    }

    #[tokio::test]
    async fn test_model_failure_falls_back() {
        let recommendation = client(Err(())).recommend("stiff neck").await;
        assert_eq!(recommendation, Recommendation::fallback());
        assert_eq!(recommendation.reasoning, FALLBACK_REASONING);
    }

    #[tokio::test]
    async fn test_unconfigured_falls_back() {
        let recommendation = RecommendationClient::default().recommend("stiff neck").await;
        assert_eq!(recommendation, Recommendation::fallback());
    }

    #[tokio::test]
    async fn test_unparseable_answer_falls_back() {
        let recommendation = client(Ok("not json")).recommend("tired").await;
        assert_eq!(recommendation, Recommendation::fallback());
    }

    #[tokio::test]
    async fn test_well_formed_answer_is_used() {
        let answer = r#"{"mode":"PULSE","intensity":80,"heat":"HIGH","duration":20,"reasoning":"r"}"#;
        let recommendation = client(Ok(answer)).recommend("tired").await;
        assert_eq!(recommendation.mode, MassageMode::Pulse);
        assert_eq!(recommendation.intensity, 80);
        assert_eq!(recommendation.heat, HeatLevel::High);
        assert_eq!(recommendation.duration, 20);
        assert_eq!(recommendation.reasoning, "r");
    }

    #[tokio::test]
    async fn test_out_of_range_answer_passes_through() {
        let answer = r#"{"mode":"WAVE","intensity":150,"heat":"OFF","duration":90,"reasoning":"r"}"#;
        let recommendation = client(Ok(answer)).recommend("tired").await;
        assert_eq!(recommendation.intensity, 150);
        assert_eq!(recommendation.duration, 90);
    }

    #[test]
    fn test_request_contents() {
        let request = coach_request("a stiff neck");
        assert_eq!(
            request.user_text,
            "The user feels: \"a stiff neck\". Recommend settings for a pillow massager."
        );
        assert!(request.system_instruction.contains("- AI_ADAPTIVE: Complex varying pattern"));
        assert!(request.system_instruction.contains("Intensity: 1-100."));
        assert!(request.system_instruction.contains("Heat: OFF, LOW, HIGH."));
        assert!(request.system_instruction.contains("Duration: 5-60 minutes."));
        assert_eq!(
            request.response_schema["required"],
            serde_json::json!(["mode", "intensity", "heat", "duration", "reasoning"])
        );
        assert_eq!(request.response_schema["properties"]["mode"]["enum"][4], "AI_ADAPTIVE");
    }
}
