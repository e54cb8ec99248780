//! Gateway error taxonomy.

use thiserror::Error;

/// Errors returned by [`ExecutionGateway::handle_request`](super::ExecutionGateway::handle_request).
///
/// None of these are retried internally.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Called before `start()` or after `stop()`.
    #[error("Gateway '{gateway}' is not running")]
    NotRunning {
        /// Gateway name.
        gateway: String,
    },
    /// The handler did not finish within the request timeout.
    ///
    /// The call was abandoned, not aborted.
    #[error("Tool '{tool}' on gateway '{gateway}' timed out after {timeout_ms}ms")]
    Timeout {
        /// Gateway name.
        gateway: String,
        /// Tool name.
        tool: String,
        /// Configured timeout.
        timeout_ms: u64,
    },
    /// The handler returned an error or panicked.
    #[error("Tool '{tool}' on gateway '{gateway}' failed: {source}")]
    HandlerFailure {
        /// Gateway name.
        gateway: String,
        /// Tool name.
        tool: String,
        /// Underlying handler error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
    /// The gateway stopped while the caller was waiting for admission.
    #[error("Gateway '{gateway}' shut down before the request was admitted")]
    ShutdownRejection {
        /// Gateway name.
        gateway: String,
    },
    /// The wait queue is at its configured bound.
    #[error("Gateway '{gateway}' overloaded: {queued} requests already waiting")]
    Overloaded {
        /// Gateway name.
        gateway: String,
        /// Queue length at rejection time.
        queued: usize,
    },
}

impl GatewayError {
    /// Whether this error came from the tool itself rather than the gateway.
    #[must_use]
    pub const fn is_handler_failure(&self) -> bool {
        matches!(self, Self::HandlerFailure { .. })
    }
}
