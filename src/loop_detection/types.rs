//! Types for loop detection.

use super::hash::hash_input;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which check flagged the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopType {
    /// Too many steps.
    Depth,
    /// One skill invoked too often.
    Cycle,
    /// A sequence of skills repeating at the tail of the log.
    Pattern,
    /// Session running too long.
    Duration,
}

/// One executed skill invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStep {
    /// Skill identifier.
    pub skill_id: String,
    /// Milliseconds since the Unix epoch (or any monotonic origin).
    pub timestamp: u64,
    /// Short fingerprint of the call input. Recorded for audit only.
    pub input_hash: String,
}

impl ExecutionStep {
    /// Build a step from explicit parts.
    #[must_use]
    pub fn new(skill_id: impl Into<String>, timestamp: u64, input_hash: impl Into<String>) -> Self {
        Self {
            skill_id: skill_id.into(),
            timestamp,
            input_hash: input_hash.into(),
        }
    }

    /// Build a step stamped with the current wall-clock time.
    #[must_use]
    pub fn record(skill_id: impl Into<String>, input: &Value) -> Self {
        let timestamp = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        Self::new(skill_id, timestamp, hash_input(input))
    }
}

/// Verdict of a loop check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopCheckResult {
    /// Whether any check fired.
    pub detected: bool,
    /// Human-readable explanation of the check that fired.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// The check that fired.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loop_type: Option<LoopType>,
}

impl LoopCheckResult {
    /// Nothing detected.
    #[must_use]
    pub fn clear() -> Self {
        Self::default()
    }

    /// A loop of `loop_type` was detected.
    #[must_use]
    pub fn detected(loop_type: LoopType, reason: impl Into<String>) -> Self {
        Self {
            detected: true,
            reason: Some(reason.into()),
            loop_type: Some(loop_type),
        }
    }
}
