//! Tool handler trait for the gateway.

use super::types::ToolRequest;
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;

/// Pluggable tool implementation behind a gateway.
///
/// The handler runs on its own task. If the gateway times the call out,
/// the task keeps running and its result is discarded; handlers that hold
/// expensive resources should watch `request.cancellation`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Execute a tool call and return its result.
    async fn execute(&self, request: ToolRequest) -> anyhow::Result<Value>;
}

/// Adapter turning an async closure into a [`ToolHandler`].
pub struct FnHandler<F> {
    f: F,
}

/// Wrap an async closure as a [`ToolHandler`].
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(ToolRequest) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Value>> + Send,
{
    FnHandler { f }
}

#[async_trait]
impl<F, Fut> ToolHandler for FnHandler<F>
where
    F: Fn(ToolRequest) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Value>> + Send,
{
    async fn execute(&self, request: ToolRequest) -> anyhow::Result<Value> {
        (self.f)(request).await
    }
}
