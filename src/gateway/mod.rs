//! Execution gateway subsystem.
//!
//! A named admission gate in front of a pluggable tool handler: bounds
//! concurrency with FIFO slot transfer, bounds each call with a soft
//! timeout, records outcome metrics and derives a health status.

mod admission;
mod config;
mod error;
mod handler;
mod registry;
mod service;
mod types;

pub use admission::{Admission, AdmissionPermit};
pub use self::config::GatewayConfig;
pub use error::GatewayError;
pub use handler::{handler_fn, FnHandler, ToolHandler};
pub use registry::GatewayRegistry;
pub use service::ExecutionGateway;
pub use types::{GatewayMetrics, HealthSnapshot, HealthStatus, ToolContext, ToolRequest};
