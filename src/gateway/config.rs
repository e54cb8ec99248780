//! Gateway configuration.

use config::{Config, ConfigError};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

/// Default admission ceiling.
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 10;
/// Default per-call timeout.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
/// Default interval between background health checks.
pub const DEFAULT_HEALTH_CHECK_INTERVAL_MS: u64 = 60_000;

/// Immutable configuration of one named gateway instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Gateway name, also its key in the registry.
    pub name: String,
    /// Maximum number of calls inside the handler at once.
    pub max_concurrent_requests: usize,
    /// Soft timeout applied to each admitted call.
    pub request_timeout: Duration,
    /// Period of the background health check.
    pub health_check_interval: Duration,
    /// Optional bound on queued callers. `None` queues without limit.
    pub max_queue_depth: Option<usize>,
}

impl GatewayConfig {
    /// Create a config with default limits.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            health_check_interval: Duration::from_millis(DEFAULT_HEALTH_CHECK_INTERVAL_MS),
            max_queue_depth: None,
        }
    }

    /// Load limits for the named gateway from config files and environment variables.
    ///
    /// Shared `gateway_*` keys apply to every gateway. A key scoped by the
    /// gateway name wins over the shared one, so `GATEWAY_WEB_SEARCH_REQUEST_TIMEOUT_MS`
    /// only affects the gateway named `web-search`. Falls back to defaults
    /// (with a warning) if loading fails.
    #[must_use]
    pub fn from_env(name: impl Into<String>) -> Self {
        let name = name.into();
        let builder = Config::builder()
            .set_default(
                "gateway_max_concurrent_requests",
                DEFAULT_MAX_CONCURRENT_REQUESTS as u64,
            )
            .and_then(|b| b.set_default("gateway_request_timeout_ms", DEFAULT_REQUEST_TIMEOUT_MS))
            .and_then(|b| {
                b.set_default(
                    "gateway_health_check_interval_ms",
                    DEFAULT_HEALTH_CHECK_INTERVAL_MS,
                )
            })
            .and_then(|b| b.set_default("gateway_max_queue_depth", 0_u64));

        let config = match builder {
            Ok(builder) => crate::config::layered(builder),
            Err(err) => return Self::warn_and_default(name, err),
        };

        match config.and_then(|c| GatewayEnvSettings::resolve(&c, &name)) {
            Ok(settings) => settings.into_config(name),
            Err(err) => Self::warn_and_default(name, err),
        }
    }

    /// Admission ceiling, never below one.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.max_concurrent_requests.max(1)
    }

    /// Request timeout in whole milliseconds.
    #[must_use]
    pub fn request_timeout_ms(&self) -> u64 {
        u64::try_from(self.request_timeout.as_millis()).unwrap_or(u64::MAX)
    }

    fn warn_and_default(name: String, err: ConfigError) -> Self {
        warn!(gateway = %name, error = %err, "Failed to load gateway config, using defaults");
        Self::new(name)
    }
}

#[derive(Debug, Deserialize)]
struct GatewayEnvSettings {
    gateway_max_concurrent_requests: usize,
    gateway_request_timeout_ms: u64,
    gateway_health_check_interval_ms: u64,
    gateway_max_queue_depth: usize,
}

impl GatewayEnvSettings {
    fn resolve(config: &Config, name: &str) -> Result<Self, ConfigError> {
        let shared: Self = config.clone().try_deserialize()?;
        let Some(scope) = scope_key(name) else {
            return Ok(shared);
        };

        Ok(Self {
            gateway_max_concurrent_requests: scoped(config, &scope, "max_concurrent_requests")?
                .unwrap_or(shared.gateway_max_concurrent_requests),
            gateway_request_timeout_ms: scoped(config, &scope, "request_timeout_ms")?
                .unwrap_or(shared.gateway_request_timeout_ms),
            gateway_health_check_interval_ms: scoped(config, &scope, "health_check_interval_ms")?
                .unwrap_or(shared.gateway_health_check_interval_ms),
            gateway_max_queue_depth: scoped(config, &scope, "max_queue_depth")?
                .unwrap_or(shared.gateway_max_queue_depth),
        })
    }

    fn into_config(self, name: String) -> GatewayConfig {
        GatewayConfig {
            name,
            max_concurrent_requests: self.gateway_max_concurrent_requests,
            request_timeout: Duration::from_millis(self.gateway_request_timeout_ms),
            health_check_interval: Duration::from_millis(self.gateway_health_check_interval_ms),
            max_queue_depth: (self.gateway_max_queue_depth > 0)
                .then_some(self.gateway_max_queue_depth),
        }
    }
}

/// `gateway_<name>` with the name lowercased and non-alphanumerics mapped to `_`.
fn scope_key(name: &str) -> Option<String> {
    let slug: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    let slug = slug.trim_matches('_');
    (!slug.is_empty()).then(|| format!("gateway_{slug}"))
}

fn scoped<T: DeserializeOwned>(
    config: &Config,
    scope: &str,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match config.get::<T>(&format!("{scope}_{key}")) {
        Ok(value) => Ok(Some(value)),
        Err(ConfigError::NotFound(_)) => Ok(None),
        Err(err) => Err(err),
    }
}
