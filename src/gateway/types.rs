//! Types shared across the gateway: call context, metrics, health.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Caller context attached to every tool call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolContext {
    /// Owning organization.
    pub organization_id: String,
    /// Acting user, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Connection the call arrived on, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<String>,
    /// Free-form metadata.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
}

impl ToolContext {
    /// Create a context for an organization.
    #[must_use]
    pub fn new(organization_id: impl Into<String>) -> Self {
        Self {
            organization_id: organization_id.into(),
            ..Self::default()
        }
    }

    /// Attach the acting user.
    #[must_use]
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Attach the connection id.
    #[must_use]
    pub fn with_connection(mut self, connection_id: impl Into<String>) -> Self {
        self.connection_id = Some(connection_id.into());
        self
    }
}

/// A single admitted call handed to a [`ToolHandler`](super::ToolHandler).
#[derive(Debug, Clone)]
pub struct ToolRequest {
    /// Name of the gateway that admitted the call.
    pub gateway: String,
    /// Tool being invoked.
    pub tool_name: String,
    /// Opaque input payload.
    pub input: Value,
    /// Caller context.
    pub context: ToolContext,
    /// Cancelled when the gateway abandons the call after a timeout.
    ///
    /// Observing it is voluntary; the gateway never aborts the handler.
    pub cancellation: CancellationToken,
}

/// Outcome counters accumulated over a gateway's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GatewayMetrics {
    /// Completed admitted calls, successful or not.
    pub request_count: u64,
    /// Calls that failed or timed out.
    pub error_count: u64,
    /// Sum of wall-clock durations of completed calls.
    pub total_response_time_ms: u64,
}

impl GatewayMetrics {
    /// Mean duration per call, 0 before the first call.
    #[must_use]
    pub fn avg_response_time_ms(&self) -> u64 {
        self.total_response_time_ms
            .checked_div(self.request_count)
            .unwrap_or(0)
    }

    /// Fraction of calls that failed, 0 before the first call.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn error_rate(&self) -> f64 {
        if self.request_count == 0 {
            0.0
        } else {
            self.error_count as f64 / self.request_count as f64
        }
    }

    pub(crate) fn record(&mut self, elapsed: Duration, failed: bool) {
        let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self.request_count = self.request_count.saturating_add(1);
        self.total_response_time_ms = self.total_response_time_ms.saturating_add(elapsed_ms);
        if failed {
            self.error_count = self.error_count.saturating_add(1);
        }
    }
}

/// Coarse health derived from lifecycle state and error rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Running with an error rate below 10%.
    Healthy,
    /// Running with an error rate of at least 10%.
    Degraded,
    /// Stopped, or running with an error rate of at least 50%.
    Unhealthy,
}

impl HealthStatus {
    /// Derive the status from whether the gateway runs and its counters.
    ///
    /// Thresholds compare integers so that exact boundaries are not
    /// subject to floating point rounding.
    #[must_use]
    pub fn evaluate(running: bool, metrics: &GatewayMetrics) -> Self {
        if !running {
            return Self::Unhealthy;
        }
        let errors = u128::from(metrics.error_count);
        let requests = u128::from(metrics.request_count);
        if requests == 0 {
            Self::Healthy
        } else if errors * 2 >= requests {
            Self::Unhealthy
        } else if errors * 10 >= requests {
            Self::Degraded
        } else {
            Self::Healthy
        }
    }

    /// Lowercase label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unhealthy => "unhealthy",
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time health report for an external collector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthSnapshot {
    /// Gateway name.
    pub gateway: String,
    /// Derived status.
    pub status: HealthStatus,
    /// When this snapshot was computed.
    pub last_check_at: DateTime<Utc>,
    /// Time since start, 0 when stopped.
    pub uptime_ms: u64,
    /// Completed admitted calls.
    pub request_count: u64,
    /// Failed or timed-out calls.
    pub error_count: u64,
    /// Sum of call durations.
    pub total_response_time_ms: u64,
    /// Mean call duration.
    pub avg_response_time_ms: u64,
    /// `error_count / request_count`.
    pub error_rate: f64,
    /// Calls currently holding a slot.
    pub active_requests: usize,
    /// Callers waiting for a slot.
    pub queued_requests: usize,
}

#[cfg(test)]
mod tests {
    use super::{GatewayMetrics, HealthStatus};
    use std::time::Duration;

    fn metrics(request_count: u64, error_count: u64) -> GatewayMetrics {
        GatewayMetrics {
            request_count,
            error_count,
            total_response_time_ms: 0,
        }
    }

    #[test]
    fn no_requests_is_healthy() {
        assert_eq!(
            HealthStatus::evaluate(true, &GatewayMetrics::default()),
            HealthStatus::Healthy
        );
    }

    #[test]
    fn stopped_is_unhealthy() {
        assert_eq!(
            HealthStatus::evaluate(false, &GatewayMetrics::default()),
            HealthStatus::Unhealthy
        );
    }

    #[test]
    fn degraded_boundary() {
        assert_eq!(
            HealthStatus::evaluate(true, &metrics(1000, 99)),
            HealthStatus::Healthy
        );
        assert_eq!(
            HealthStatus::evaluate(true, &metrics(1000, 100)),
            HealthStatus::Degraded
        );
        assert_eq!(
            HealthStatus::evaluate(true, &metrics(10, 1)),
            HealthStatus::Degraded
        );
    }

    #[test]
    fn unhealthy_boundary() {
        assert_eq!(
            HealthStatus::evaluate(true, &metrics(1000, 499)),
            HealthStatus::Degraded
        );
        assert_eq!(
            HealthStatus::evaluate(true, &metrics(10, 5)),
            HealthStatus::Unhealthy
        );
        assert_eq!(
            HealthStatus::evaluate(true, &metrics(4, 4)),
            HealthStatus::Unhealthy
        );
    }

    #[test]
    fn record_accumulates() {
        let mut m = GatewayMetrics::default();
        m.record(Duration::from_millis(30), false);
        m.record(Duration::from_millis(10), true);
        assert_eq!(m.request_count, 2);
        assert_eq!(m.error_count, 1);
        assert_eq!(m.total_response_time_ms, 40);
        assert_eq!(m.avg_response_time_ms(), 20);
        assert!((m.error_rate() - 0.5).abs() < f64::EPSILON);
    }
}
