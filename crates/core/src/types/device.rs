//! Simulated massager state and its transitions.
//!
//! There is no hardware behind this: the dashboard owns one [`DeviceState`]
//! per mount and mutates it from form handlers and AI recommendations.

use serde::{Deserialize, Serialize};

use super::recommendation::Recommendation;

/// Massage pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MassageMode {
    #[default]
    Kneading,
    Shiatsu,
    Pulse,
    Wave,
    AiAdaptive,
}

impl MassageMode {
    /// Every mode, in display order.
    pub const ALL: [Self; 5] = [
        Self::Kneading,
        Self::Shiatsu,
        Self::Pulse,
        Self::Wave,
        Self::AiAdaptive,
    ];

    /// Modes offered on the manual mode picker. `AI_ADAPTIVE` is only ever
    /// chosen by the AI coach.
    pub const MANUAL: [Self; 4] = [Self::Kneading, Self::Shiatsu, Self::Pulse, Self::Wave];

    /// Wire name (`KNEADING`, `AI_ADAPTIVE`, ...).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Kneading => "KNEADING",
            Self::Shiatsu => "SHIATSU",
            Self::Pulse => "PULSE",
            Self::Wave => "WAVE",
            Self::AiAdaptive => "AI_ADAPTIVE",
        }
    }

    /// Parse a wire name.
    #[must_use]
    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.as_str() == name)
    }

    /// Short label for buttons.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Kneading => "Kneading",
            Self::Shiatsu => "Shiatsu",
            Self::Pulse => "Pulse",
            Self::Wave => "Wave",
            Self::AiAdaptive => "AI Adaptive",
        }
    }

    /// What the mode is good for. Fed to the model in the system instruction.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Kneading => "Deep tissue, good for knots.",
            Self::Shiatsu => "Targeted pressure points.",
            Self::Pulse => "Rhythmic, good for circulation.",
            Self::Wave => "Gentle, rolling, good for sleepiness.",
            Self::AiAdaptive => "Complex varying pattern (use for general stress).",
        }
    }
}

/// Heat therapy level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HeatLevel {
    #[default]
    Off,
    Low,
    High,
}

impl HeatLevel {
    /// Every level, in display order.
    pub const ALL: [Self; 3] = [Self::Off, Self::Low, Self::High];

    /// Wire name (`OFF`, `LOW`, `HIGH`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::Low => "LOW",
            Self::High => "HIGH",
        }
    }

    /// Parse a wire name.
    #[must_use]
    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.as_str() == name)
    }
}

/// State of the simulated pillow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceState {
    pub is_on: bool,
    pub is_connected: bool,
    pub mode: MassageMode,
    /// Always within `0..=MAX_INTENSITY`.
    pub intensity: u8,
    pub heat: HeatLevel,
    /// Minutes remaining.
    pub timer: u32,
}

impl Default for DeviceState {
    /// The state a freshly mounted dashboard starts from.
    fn default() -> Self {
        Self {
            is_on: false,
            is_connected: false,
            mode: MassageMode::Kneading,
            intensity: 30,
            heat: HeatLevel::Off,
            timer: 15,
        }
    }
}

impl DeviceState {
    /// Upper bound of the intensity slider.
    pub const MAX_INTENSITY: u8 = 100;

    pub const fn toggle_power(&mut self) {
        self.is_on = !self.is_on;
    }

    pub const fn set_heat(&mut self, heat: HeatLevel) {
        self.heat = heat;
    }

    pub const fn set_mode(&mut self, mode: MassageMode) {
        self.mode = mode;
    }

    /// Store a slider value. Anything above 100 is clamped.
    pub fn set_intensity(&mut self, intensity: u8) {
        self.intensity = intensity.min(Self::MAX_INTENSITY);
    }

    /// Record the (simulated) connection. Never reverts to disconnected.
    ///
    /// Returns `true` if this call made the transition.
    pub const fn mark_connected(&mut self) -> bool {
        let transitioned = !self.is_connected;
        self.is_connected = true;
        transitioned
    }

    /// Apply an AI recommendation and switch the device on.
    ///
    /// The recommendation is taken as the model returned it; intensity is
    /// clamped into `0..=100` and negative durations become a zero timer so
    /// the device invariants hold.
    pub fn apply_recommendation(&mut self, recommendation: &Recommendation) {
        self.is_on = true;
        self.mode = recommendation.mode;
        self.heat = recommendation.heat;
        self.intensity = clamp_to_u8(recommendation.intensity, Self::MAX_INTENSITY);
        self.timer = u32::try_from(recommendation.duration.max(0)).unwrap_or(u32::MAX);
    }

    /// Headline shown on the pillow visual: the mode with spaces, or STANDBY.
    #[must_use]
    pub fn headline(&self) -> String {
        if self.is_on {
            self.mode.as_str().replace('_', " ")
        } else {
            "STANDBY".to_owned()
        }
    }
}

fn clamp_to_u8(value: i64, max: u8) -> u8 {
    u8::try_from(value.clamp(0, i64::from(max))).unwrap_or(max)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn recommendation(intensity: i64, duration: i64) -> Recommendation {
        Recommendation {
            mode: MassageMode::Pulse,
            intensity,
            heat: HeatLevel::High,
            duration,
            reasoning: "r".to_owned(),
        }
    }

    #[test]
    fn test_mount_defaults() {
        let state = DeviceState::default();
        assert!(!state.is_on);
        assert!(!state.is_connected);
        assert_eq!(state.mode, MassageMode::Kneading);
        assert_eq!(state.intensity, 30);
        assert_eq!(state.heat, HeatLevel::Off);
        assert_eq!(state.timer, 15);
    }

    #[test]
    fn test_toggle_power_twice_restores() {
        for start in [false, true] {
            let mut state = DeviceState {
                is_on: start,
                ..DeviceState::default()
            };
            state.toggle_power();
            assert_eq!(state.is_on, !start);
            state.toggle_power();
            assert_eq!(state.is_on, start);
        }
    }

    #[test]
    fn test_set_intensity_stores_every_slider_value() {
        let mut state = DeviceState::default();
        for value in 0..=100u8 {
            state.set_intensity(value);
            assert_eq!(state.intensity, value);
        }
    }

    #[test]
    fn test_set_intensity_clamps_above_range() {
        let mut state = DeviceState::default();
        state.set_intensity(250);
        assert_eq!(state.intensity, 100);
    }

    #[test]
    fn test_mark_connected_only_transitions_once() {
        let mut state = DeviceState::default();
        assert!(state.mark_connected());
        assert!(!state.mark_connected());
        assert!(state.is_connected);
    }

    #[test]
    fn test_apply_recommendation_sets_everything_and_powers_on() {
        let mut state = DeviceState::default();
        state.apply_recommendation(&recommendation(80, 20));
        assert_eq!(
            state,
            DeviceState {
                is_on: true,
                is_connected: false,
                mode: MassageMode::Pulse,
                intensity: 80,
                heat: HeatLevel::High,
                timer: 20,
            }
        );
    }

    #[test]
    fn test_apply_recommendation_keeps_device_invariants() {
        let mut state = DeviceState::default();
        state.apply_recommendation(&recommendation(150, -5));
        assert_eq!(state.intensity, 100);
        assert_eq!(state.timer, 0);

        state.apply_recommendation(&recommendation(-3, 90));
        assert_eq!(state.intensity, 0);
        assert_eq!(state.timer, 90);
    }

    #[test]
    fn test_headline() {
        let mut state = DeviceState::default();
        assert_eq!(state.headline(), "STANDBY");
        state.toggle_power();
        state.set_mode(MassageMode::AiAdaptive);
        assert_eq!(state.headline(), "AI ADAPTIVE");
    }

    #[test]
    fn test_mode_wire_names() {
        for mode in MassageMode::ALL {
            let json = serde_json::to_string(&mode).unwrap();
            assert_eq!(json, format!("\"{}\"", mode.as_str()));
        }
        assert!(!MassageMode::MANUAL.contains(&MassageMode::AiAdaptive));
        assert_eq!(MassageMode::from_wire("AI_ADAPTIVE"), Some(MassageMode::AiAdaptive));
        assert_eq!(MassageMode::from_wire("kneading"), None);
        assert_eq!(HeatLevel::from_wire("HIGH"), Some(HeatLevel::High));
    }

    #[test]
    fn test_device_state_json_shape() {
        let json = serde_json::to_value(DeviceState::default()).unwrap();
        assert_eq!(json["isOn"], false);
        assert_eq!(json["heat"], "OFF");
        assert_eq!(json["timer"], 15);
    }
}
