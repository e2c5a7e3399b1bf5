//! Settings suggested by the AI coach.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use super::device::{HeatLevel, MassageMode};

/// Reasoning text returned with [`Recommendation::fallback`].
pub const FALLBACK_REASONING: &str =
    "We couldn't reach the AI brain, so we selected a balanced default for you.";

/// A structured recommendation as returned by the model.
///
/// Intensity and duration are kept exactly as the model sent them. The
/// ranges below are what the model is asked for, not what it is held to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub mode: MassageMode,
    pub intensity: i64,
    pub heat: HeatLevel,
    /// Session length in minutes.
    pub duration: i64,
    pub reasoning: String,
}

impl Recommendation {
    /// Intensity range advertised to the model.
    pub const INTENSITY_RANGE: RangeInclusive<i64> = 1..=100;

    /// Duration range (minutes) advertised to the model.
    pub const DURATION_RANGE: RangeInclusive<i64> = 5..=60;

    /// Balanced default used whenever the model cannot be reached or its
    /// answer cannot be read.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            mode: MassageMode::Kneading,
            intensity: 50,
            heat: HeatLevel::Low,
            duration: 15,
            reasoning: FALLBACK_REASONING.to_owned(),
        }
    }

    /// Whether intensity and duration fall inside the advertised ranges.
    #[must_use]
    pub fn within_advertised_ranges(&self) -> bool {
        Self::INTENSITY_RANGE.contains(&self.intensity)
            && Self::DURATION_RANGE.contains(&self.duration)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_values() {
        let fallback = Recommendation::fallback();
        assert_eq!(fallback.mode, MassageMode::Kneading);
        assert_eq!(fallback.intensity, 50);
        assert_eq!(fallback.heat, HeatLevel::Low);
        assert_eq!(fallback.duration, 15);
        assert_eq!(fallback.reasoning, FALLBACK_REASONING);
        assert!(fallback.within_advertised_ranges());
    }

    #[test]
    fn test_parses_model_json_without_validation() {
        let json = r#"{"mode":"WAVE","intensity":150,"heat":"OFF","duration":90,"reasoning":"sleepy"}"#;
        let rec: Recommendation = serde_json::from_str(json).unwrap();
        assert_eq!(rec.mode, MassageMode::Wave);
        assert_eq!(rec.intensity, 150);
        assert_eq!(rec.duration, 90);
        assert!(!rec.within_advertised_ranges());
    }

    #[test]
    fn test_rejects_unknown_mode() {
        let json = r#"{"mode":"TICKLE","intensity":10,"heat":"OFF","duration":10,"reasoning":""}"#;
        assert!(serde_json::from_str::<Recommendation>(json).is_err());
    }
}
