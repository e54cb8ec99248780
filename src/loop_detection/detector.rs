//! Per-session loop detector.

use super::checks;
use super::config::LoopDetectorConfig;
use super::types::{ExecutionStep, LoopCheckResult};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Session-keyed step logs plus the checks that run over them.
///
/// Logs live in memory only and are never evicted automatically: the
/// caller must [`reset`](Self::reset) a session when it ends. Writers for
/// one session must be serialized by the caller; share the detector behind
/// a `Mutex` when several tasks record steps.
#[derive(Debug, Default)]
pub struct LoopDetector {
    config: LoopDetectorConfig,
    sessions: HashMap<String, Vec<ExecutionStep>>,
}

impl LoopDetector {
    /// Create a detector with the given limits.
    #[must_use]
    pub fn new(config: LoopDetectorConfig) -> Self {
        Self {
            config,
            sessions: HashMap::new(),
        }
    }

    /// Detector limits.
    #[must_use]
    pub const fn config(&self) -> &LoopDetectorConfig {
        &self.config
    }

    /// Append a step to the session's log, creating the log if needed.
    pub fn record_step(&mut self, session_id: &str, step: ExecutionStep) {
        let log = self.sessions.entry(session_id.to_string()).or_default();
        log.push(step);
        debug!(
            session_id,
            skill_id = log.last().map_or("", |s| s.skill_id.as_str()),
            steps = log.len(),
            "loop_detector: step recorded"
        );
    }

    /// Run depth, cycle, pattern and duration checks in that order.
    ///
    /// Returns on the first check that fires. Unknown sessions are reported
    /// as clear.
    #[must_use]
    pub fn check_for_loop(&self, session_id: &str) -> LoopCheckResult {
        if !self.config.enabled {
            debug!(session_id, "loop_detector: detection disabled");
            return LoopCheckResult::clear();
        }

        let steps = self.get_execution_path(session_id);
        let repeats = self.config.max_repeats;
        let hit = checks::depth(steps, self.config.max_depth)
            .or_else(|| checks::cycle(steps, repeats))
            .or_else(|| checks::pattern(steps, repeats))
            .or_else(|| checks::duration(steps, self.config.max_duration_ms));

        match hit {
            Some(result) => {
                warn!(
                    session_id,
                    loop_type = ?result.loop_type,
                    reason = result.reason.as_deref().unwrap_or_default(),
                    steps = steps.len(),
                    "loop_detector: LOOP DETECTED"
                );
                result
            }
            None => LoopCheckResult::clear(),
        }
    }

    /// The session's recorded steps, empty if unknown.
    #[must_use]
    pub fn get_execution_path(&self, session_id: &str) -> &[ExecutionStep] {
        self.sessions
            .get(session_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Discard the session's log. Returns whether one existed.
    pub fn reset(&mut self, session_id: &str) -> bool {
        let existed = self.sessions.remove(session_id).is_some();
        if existed {
            debug!(session_id, "loop_detector: session reset");
        }
        existed
    }

    /// Number of sessions with a live log.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}
