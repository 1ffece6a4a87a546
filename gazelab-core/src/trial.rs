use crate::condition::Condition;
use chrono::Local;
use serde::{Deserialize, Serialize};

/// Scheduler states for one trial. `Displaying` is the only state with an
/// active target; recording is gated to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialPhase {
    Idle,
    Displaying,
    Resting,
    Done,
}

/// Per-trial stimulus parameters, serialized under the `conditions` key of
/// `setup_config.json` with the field names the analysis pipeline expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StimulusTiming {
    /// How long each dot stays on screen, in milliseconds.
    #[serde(rename = "dot_display_time")]
    pub dot_display_ms: u64,
    /// Blank interval between dots, in milliseconds.
    #[serde(rename = "rest_time")]
    pub rest_ms: u64,
    pub grid_size: u32,
    /// Dot radius in pixels; presentation detail, passed through to disk.
    pub dot_radius: u32,
}

impl Default for StimulusTiming {
    fn default() -> Self {
        Self {
            dot_display_ms: 2000,
            rest_ms: 1000,
            grid_size: 3,
            dot_radius: 15,
        }
    }
}

/// The document written to `setup_config.json` when a trial starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialConfig {
    pub trial_id: String,
    pub timestamp: String,
    pub setup: Condition,
    #[serde(rename = "conditions")]
    pub stimulus: StimulusTiming,
}

impl TrialConfig {
    pub fn new(trial_id: &str, setup: Condition, stimulus: StimulusTiming) -> Self {
        Self {
            trial_id: trial_id.to_string(),
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            setup,
            stimulus,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timing_serializes_with_protocol_key_names() {
        let json = serde_json::to_value(StimulusTiming::default()).unwrap();
        assert_eq!(json["dot_display_time"], 2000);
        assert_eq!(json["rest_time"], 1000);
        assert_eq!(json["grid_size"], 3);
        assert_eq!(json["dot_radius"], 15);
    }

    #[test]
    fn trial_config_nests_setup_and_conditions() {
        let config = TrialConfig::new(
            "Trial_001",
            Condition { yaw: 15, pitch: -15, distance: 60 },
            StimulusTiming::default(),
        );
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["trial_id"], "Trial_001");
        assert_eq!(json["setup"]["yaw"], 15);
        assert_eq!(json["setup"]["pitch"], -15);
        assert_eq!(json["setup"]["distance"], 60);
        assert_eq!(json["conditions"]["dot_display_time"], 2000);
    }
}
