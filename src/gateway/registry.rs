//! Gateway registry
//!
//! Name-keyed lookup of running gateways. Passed explicitly to whoever
//! needs it instead of living in a process-wide static.

use super::service::ExecutionGateway;
use super::types::HealthSnapshot;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Registry of running gateways by name
#[derive(Debug, Default)]
pub struct GatewayRegistry {
    gateways: RwLock<HashMap<String, Arc<ExecutionGateway>>>,
}

impl GatewayRegistry {
    /// Create a new empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a gateway under its name, replacing any previous holder.
    pub(crate) async fn register(&self, gateway: Arc<ExecutionGateway>) {
        let name = gateway.name().to_string();
        let previous = {
            let mut gateways = self.gateways.write().await;
            gateways.insert(name.clone(), gateway.clone())
        };

        match previous {
            Some(previous) if !Arc::ptr_eq(&previous, &gateway) => {
                warn!(gateway = %name, "Gateway name already registered, replacing previous instance");
            }
            _ => debug!(gateway = %name, "Gateway registered"),
        }
    }

    /// Remove a gateway, but only if the entry under its name is this instance.
    pub(crate) async fn unregister(&self, gateway: &Arc<ExecutionGateway>) -> bool {
        let mut gateways = self.gateways.write().await;
        let owned = gateways
            .get(gateway.name())
            .is_some_and(|current| Arc::ptr_eq(current, gateway));
        if owned {
            gateways.remove(gateway.name());
        }
        owned
    }

    /// Get a gateway by name
    pub async fn get(&self, name: &str) -> Option<Arc<ExecutionGateway>> {
        let gateways = self.gateways.read().await;
        gateways.get(name).cloned()
    }

    /// Check if a gateway is registered
    pub async fn contains(&self, name: &str) -> bool {
        let gateways = self.gateways.read().await;
        gateways.contains_key(name)
    }

    /// Registered names, sorted
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = {
            let gateways = self.gateways.read().await;
            gateways.keys().cloned().collect()
        };
        names.sort();
        names
    }

    /// Fresh health snapshot of every registered gateway, sorted by name.
    pub async fn health_report(&self) -> Vec<HealthSnapshot> {
        let gateways: Vec<Arc<ExecutionGateway>> = {
            let gateways = self.gateways.read().await;
            gateways.values().cloned().collect()
        };
        let mut report: Vec<HealthSnapshot> = gateways.iter().map(|g| g.get_health()).collect();
        report.sort_by(|a, b| a.gateway.cmp(&b.gateway));
        report
    }

    /// Get the number of registered gateways
    pub async fn len(&self) -> usize {
        let gateways = self.gateways.read().await;
        gateways.len()
    }

    /// Check if registry is empty
    pub async fn is_empty(&self) -> bool {
        let gateways = self.gateways.read().await;
        gateways.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::GatewayRegistry;
    use crate::gateway::handler::MockToolHandler;
    use crate::gateway::{ExecutionGateway, GatewayConfig, HealthStatus};
    use std::sync::Arc;

    fn gateway(name: &str, registry: &Arc<GatewayRegistry>) -> Arc<ExecutionGateway> {
        Arc::new(ExecutionGateway::new(
            GatewayConfig::new(name),
            Arc::new(MockToolHandler::new()),
            Arc::clone(registry),
        ))
    }

    #[tokio::test]
    async fn lookup_by_name() {
        let registry = Arc::new(GatewayRegistry::new());
        let search = gateway("search", &registry);
        let shell = gateway("shell", &registry);
        search.start().await;
        shell.start().await;

        assert_eq!(registry.names().await, vec!["search", "shell"]);
        let found = registry.get("search").await.expect("registered");
        assert!(Arc::ptr_eq(&found, &search));
        assert!(registry.get("missing").await.is_none());

        let report = registry.health_report().await;
        assert_eq!(report.len(), 2);
        assert!(report.iter().all(|s| s.status == HealthStatus::Healthy));

        search.stop().await;
        assert!(!registry.contains("search").await);
        assert!(registry.contains("shell").await);
        shell.stop().await;
    }

    #[tokio::test]
    async fn stopping_replaced_instance_keeps_new_one() {
        let registry = Arc::new(GatewayRegistry::new());
        let old = gateway("tools", &registry);
        let new = gateway("tools", &registry);
        old.start().await;
        new.start().await;

        old.stop().await;
        let current = registry.get("tools").await.expect("new instance stays");
        assert!(Arc::ptr_eq(&current, &new));
        new.stop().await;
        assert!(registry.is_empty().await);
    }
}
