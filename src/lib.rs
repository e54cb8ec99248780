#![deny(missing_docs)]
//! Oxide Guard: execution-safety control plane for agent tool dispatch.
//!
//! Keeps agent-driven work bounded in two independent dimensions:
//! - [`gateway::ExecutionGateway`] admits tool calls under a concurrency
//!   ceiling with FIFO fairness, enforces a soft per-call timeout and
//!   derives a coarse health status from observed outcomes.
//! - [`loop_detection::LoopDetector`] inspects a session's ordered skill
//!   history and flags depth, cycle, repeating-pattern and duration
//!   anomalies.
//!
//! Both guards only detect and report. Deciding what to do about an
//! unhealthy gateway or a detected loop belongs to the caller.

/// Layered configuration sources.
pub mod config;
/// Admission-controlled tool execution gateway.
pub mod gateway;
/// Skill invocation loop detection.
pub mod loop_detection;

pub use gateway::{
    ExecutionGateway, GatewayConfig, GatewayError, GatewayRegistry, HealthSnapshot, HealthStatus,
    ToolContext, ToolHandler, ToolRequest,
};
pub use loop_detection::{
    ExecutionStep, LoopCheckResult, LoopDetector, LoopDetectorConfig, LoopType,
};
