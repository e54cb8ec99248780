//! Configuration for loop detection.

use config::{Config, ConfigError};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Loop detection configuration loaded from env/files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopDetectorConfig {
    /// Global toggle
    #[serde(rename = "loop_detection_enabled")]
    pub enabled: bool,
    /// Maximum number of steps in a session
    #[serde(rename = "loop_max_depth")]
    pub max_depth: usize,
    /// Maximum occurrences of one skill, and minimum repeats of a pattern
    #[serde(rename = "loop_max_repeats")]
    pub max_repeats: usize,
    /// Maximum span between first and last step (milliseconds)
    #[serde(rename = "loop_max_duration_ms")]
    pub max_duration_ms: u64,
}

impl Default for LoopDetectorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_depth: 10,
            max_repeats: 3,
            max_duration_ms: 60_000,
        }
    }
}

impl LoopDetectorConfig {
    /// Load loop detection settings from config files and environment variables.
    ///
    /// Priority: env vars → config files → defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let builder = Config::builder()
            .set_default("loop_detection_enabled", defaults.enabled)
            .and_then(|b| b.set_default("loop_max_depth", defaults.max_depth as u64))
            .and_then(|b| b.set_default("loop_max_repeats", defaults.max_repeats as u64))
            .and_then(|b| b.set_default("loop_max_duration_ms", defaults.max_duration_ms));

        let config = match builder {
            Ok(builder) => crate::config::layered(builder),
            Err(err) => return Self::warn_and_default(err),
        };

        match config.and_then(Config::try_deserialize) {
            Ok(settings) => settings,
            Err(err) => Self::warn_and_default(err),
        }
    }

    fn warn_and_default(err: ConfigError) -> Self {
        warn!(error = %err, "Failed to load loop detection config, using defaults");
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::LoopDetectorConfig;

    #[test]
    fn defaults() {
        let config = LoopDetectorConfig::default();
        assert!(config.enabled);
        assert_eq!(config.max_depth, 10);
        assert_eq!(config.max_repeats, 3);
        assert_eq!(config.max_duration_ms, 60_000);
    }

    #[test]
    fn from_env_reads_overrides() {
        std::env::set_var("LOOP_MAX_DEPTH", "25");
        let config = LoopDetectorConfig::from_env();
        std::env::remove_var("LOOP_MAX_DEPTH");

        assert_eq!(config.max_depth, 25);
        assert_eq!(config.max_repeats, 3);
    }
}
