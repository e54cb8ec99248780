//! Execution gateway: lifecycle, admitted execution, metrics and health.

use super::admission::Admission;
use super::config::GatewayConfig;
use super::error::GatewayError;
use super::handler::ToolHandler;
use super::registry::GatewayRegistry;
use super::types::{GatewayMetrics, HealthSnapshot, HealthStatus, ToolContext, ToolRequest};
use chrono::Utc;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};
use tokio::time::{timeout, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const MIN_HEALTH_CHECK_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Default)]
struct Lifecycle {
    started_at: Option<Instant>,
    health_monitor: Option<CancellationToken>,
    last_health: Option<HealthSnapshot>,
}

/// Named admission gate in front of a tool handler.
///
/// Lifecycle is `stopped → running` on [`start`](Self::start) and back on
/// [`stop`](Self::stop); both are idempotent. Only
/// [`handle_request`](Self::handle_request) runs tool code.
pub struct ExecutionGateway {
    config: GatewayConfig,
    handler: Arc<dyn ToolHandler>,
    registry: Arc<GatewayRegistry>,
    admission: Arc<Admission>,
    metrics: Mutex<GatewayMetrics>,
    lifecycle: Mutex<Lifecycle>,
    /// Serializes `start`/`stop` so registration follows the lifecycle.
    transition: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for ExecutionGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionGateway")
            .field("config", &self.config)
            .field("admission", &self.admission)
            .finish_non_exhaustive()
    }
}

impl ExecutionGateway {
    /// Create a stopped gateway that registers itself in `registry` on start.
    #[must_use]
    pub fn new(
        config: GatewayConfig,
        handler: Arc<dyn ToolHandler>,
        registry: Arc<GatewayRegistry>,
    ) -> Self {
        let admission = Arc::new(Admission::new(
            config.name.clone(),
            config.capacity(),
            config.max_queue_depth,
        ));
        Self {
            config,
            handler,
            registry,
            admission,
            metrics: Mutex::new(GatewayMetrics::default()),
            lifecycle: Mutex::new(Lifecycle::default()),
            transition: tokio::sync::Mutex::new(()),
        }
    }

    /// Gateway name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Gateway configuration.
    #[must_use]
    pub const fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Whether the gateway accepts calls.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.lifecycle().started_at.is_some()
    }

    /// Calls currently inside the handler path.
    #[must_use]
    pub fn active_requests(&self) -> usize {
        self.admission.active()
    }

    /// Callers waiting for admission.
    #[must_use]
    pub fn queued_requests(&self) -> usize {
        self.admission.queued()
    }

    /// Copy of the current counters.
    #[must_use]
    pub fn metrics(&self) -> GatewayMetrics {
        *self.metrics_guard()
    }

    /// Zero all counters.
    pub fn reset_metrics(&self) {
        *self.metrics_guard() = GatewayMetrics::default();
        debug!(gateway = %self.config.name, "Gateway metrics reset");
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn metrics_guard(&self) -> MutexGuard<'_, GatewayMetrics> {
        self.metrics.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start accepting calls, register by name and begin periodic health checks.
    pub async fn start(self: &Arc<Self>) {
        let _transition = self.transition.lock().await;
        let monitor = {
            let mut lifecycle = self.lifecycle();
            if lifecycle.started_at.is_some() {
                info!(gateway = %self.config.name, "Gateway already running");
                return;
            }
            // Open before publishing `started_at` so a running gateway never has a closed gate.
            self.admission.open();
            lifecycle.started_at = Some(Instant::now());
            let token = CancellationToken::new();
            lifecycle.health_monitor = Some(token.clone());
            token
        };

        self.registry.register(Arc::clone(self)).await;
        self.spawn_health_monitor(monitor);

        info!(
            gateway = %self.config.name,
            max_concurrent_requests = self.config.capacity(),
            request_timeout_ms = self.config.request_timeout_ms(),
            "Gateway started"
        );
    }

    /// Stop accepting calls.
    ///
    /// Cancels the health monitor, rejects every queued caller with
    /// [`GatewayError::ShutdownRejection`] and unregisters the gateway.
    /// Calls already inside the handler are left to finish.
    pub async fn stop(self: &Arc<Self>) {
        let _transition = self.transition.lock().await;
        let (monitor, rejected) = {
            let mut lifecycle = self.lifecycle();
            if lifecycle.started_at.take().is_none() {
                info!(gateway = %self.config.name, "Gateway already stopped");
                return;
            }
            lifecycle.last_health = None;
            (lifecycle.health_monitor.take(), self.admission.close())
        };

        if let Some(token) = monitor {
            token.cancel();
        }
        self.registry.unregister(self).await;

        info!(
            gateway = %self.config.name,
            rejected_waiters = rejected,
            active_requests = self.admission.active(),
            "Gateway stopped"
        );
    }

    /// Compute a fresh health snapshot.
    #[must_use]
    pub fn get_health(&self) -> HealthSnapshot {
        let metrics = self.metrics();
        let mut lifecycle = self.lifecycle();
        let running = lifecycle.started_at.is_some();
        let uptime_ms = lifecycle
            .started_at
            .map_or(0, |at| u64::try_from(at.elapsed().as_millis()).unwrap_or(u64::MAX));

        let snapshot = HealthSnapshot {
            gateway: self.config.name.clone(),
            status: HealthStatus::evaluate(running, &metrics),
            last_check_at: Utc::now(),
            uptime_ms,
            request_count: metrics.request_count,
            error_count: metrics.error_count,
            total_response_time_ms: metrics.total_response_time_ms,
            avg_response_time_ms: metrics.avg_response_time_ms(),
            error_rate: metrics.error_rate(),
            active_requests: self.admission.active(),
            queued_requests: self.admission.queued(),
        };

        if running {
            lifecycle.last_health = Some(snapshot.clone());
        }
        snapshot
    }

    /// Most recent snapshot from the periodic check or `get_health`.
    #[must_use]
    pub fn last_health(&self) -> Option<HealthSnapshot> {
        self.lifecycle().last_health.clone()
    }

    /// Run one tool call through admission and the timeout race.
    ///
    /// The handler runs on its own task. On timeout the task is abandoned,
    /// not aborted: its cancellation token is triggered and its eventual
    /// result is discarded.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::NotRunning`] if the gateway is stopped.
    /// - [`GatewayError::ShutdownRejection`] if it stops while the call is queued.
    /// - [`GatewayError::Overloaded`] if a queue bound is set and reached.
    /// - [`GatewayError::Timeout`] if the handler exceeds the request timeout.
    /// - [`GatewayError::HandlerFailure`] if the handler errors or panics.
    pub async fn handle_request(
        &self,
        tool_name: &str,
        input: Value,
        context: ToolContext,
    ) -> Result<Value, GatewayError> {
        if !self.is_running() {
            return Err(GatewayError::NotRunning {
                gateway: self.config.name.clone(),
            });
        }

        let permit = self.admission.acquire().await?;
        let started = Instant::now();
        let cancellation = CancellationToken::new();
        let request = ToolRequest {
            gateway: self.config.name.clone(),
            tool_name: tool_name.to_string(),
            input,
            context,
            cancellation: cancellation.clone(),
        };
        let handler = Arc::clone(&self.handler);
        let call = tokio::spawn(async move { handler.execute(request).await });

        let outcome = match timeout(self.config.request_timeout, call).await {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(err))) => Err(GatewayError::HandlerFailure {
                gateway: self.config.name.clone(),
                tool: tool_name.to_string(),
                source: err.into(),
            }),
            Ok(Err(join_err)) => Err(GatewayError::HandlerFailure {
                gateway: self.config.name.clone(),
                tool: tool_name.to_string(),
                source: Box::new(join_err),
            }),
            Err(_) => {
                cancellation.cancel();
                Err(GatewayError::Timeout {
                    gateway: self.config.name.clone(),
                    tool: tool_name.to_string(),
                    timeout_ms: self.config.request_timeout_ms(),
                })
            }
        };

        let elapsed = started.elapsed();
        self.metrics_guard().record(elapsed, outcome.is_err());
        drop(permit);

        let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

        match &outcome {
            Ok(_) => debug!(
                gateway = %self.config.name,
                tool = tool_name,
                elapsed_ms,
                "Tool call completed"
            ),
            Err(err) => warn!(
                gateway = %self.config.name,
                tool = tool_name,
                elapsed_ms,
                error = %err,
                "Tool call failed"
            ),
        }

        outcome
    }

    fn spawn_health_monitor(self: &Arc<Self>, token: CancellationToken) {
        let gateway = Arc::downgrade(self);
        let period = self
            .config
            .health_check_interval
            .max(MIN_HEALTH_CHECK_INTERVAL);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if !Self::health_tick(&gateway) {
                            break;
                        }
                    }
                }
            }
        });
    }

    /// Returns `false` once the gateway has been dropped.
    fn health_tick(gateway: &Weak<Self>) -> bool {
        let Some(gateway) = gateway.upgrade() else {
            return false;
        };
        let snapshot = gateway.get_health();
        match snapshot.status {
            HealthStatus::Healthy => debug!(
                gateway = %snapshot.gateway,
                status = %snapshot.status,
                requests = snapshot.request_count,
                avg_response_time_ms = snapshot.avg_response_time_ms,
                "Gateway health check"
            ),
            HealthStatus::Degraded | HealthStatus::Unhealthy => warn!(
                gateway = %snapshot.gateway,
                status = %snapshot.status,
                requests = snapshot.request_count,
                errors = snapshot.error_count,
                error_rate = snapshot.error_rate,
                "Gateway health check"
            ),
        }
        true
    }
}
