//! Engine configuration.

use crate::history::MAX_HISTORY_FRAMES;
use crate::storage::DEFAULT_AUTOSAVE_DELAY_SECS;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for an editing session. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seconds of mutation inactivity before an automatic write.
    pub autosave_delay_secs: u64,
    /// Retained history frames per actor.
    pub history_depth: usize,
    /// Directory name under the platform data dir for local state.
    pub app_dir: String,
    /// Name given to boards created on first open.
    pub default_board_name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            autosave_delay_secs: DEFAULT_AUTOSAVE_DELAY_SECS,
            history_depth: MAX_HISTORY_FRAMES,
            app_dir: "inkboard".to_string(),
            default_board_name: "Untitled".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn autosave_delay(&self) -> Duration {
        Duration::from_secs(self.autosave_delay_secs)
    }

    /// History depth, never below one frame.
    pub fn history_depth(&self) -> usize {
        self.history_depth.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.autosave_delay(), Duration::from_secs(10));
        assert_eq!(config.history_depth(), 50);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{ "history_depth": 5 }"#).unwrap();
        assert_eq!(config.history_depth(), 5);
        assert_eq!(config.autosave_delay_secs, 10);
        assert_eq!(config.app_dir, "inkboard");
    }

    #[test]
    fn test_zero_depth_is_clamped() {
        let config = EngineConfig {
            history_depth: 0,
            ..EngineConfig::default()
        };
        assert_eq!(config.history_depth(), 1);
    }
}
