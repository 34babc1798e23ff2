use std::sync::Arc;

use async_trait::async_trait;

use crate::tool::Tool;

/// A context handed to a [`ToolSet`] at start/list time.
///
/// Kept minimal and opaque today; expected to carry session/workspace info
/// once `conclave-core` needs to scope a tool set to a running session.
#[derive(Debug, Clone, Default)]
pub struct ToolSetContext {
    pub working_dir: Option<String>,
}

/// A named bundle of tools that starts, lists its tools, and stops as a unit.
///
/// Where a single [`Tool`] maps one name to one schema/handler, a `ToolSet`
/// groups several related tools under one lifecycle — the filesystem tools
/// bundled as "filesystem", or (eventually) the tools an MCP server exposes.
/// The registry treats every tool a set hands out exactly like one it
/// registered directly; first-registration-wins conflict resolution applies
/// across sets the same way it applies within one.
#[async_trait]
pub trait ToolSet: Send + Sync {
    /// The name this set is registered under (used in logs and conflict
    /// warnings; individual tools keep their own names).
    fn name(&self) -> &str;

    /// Optional extra instructions appended to the system prompt describing
    /// how to use this set's tools. Most sets have none.
    fn instructions(&self) -> Option<&str> {
        None
    }

    /// Called once before the set's tools are registered. Use this to open
    /// connections, spawn child processes, or validate configuration.
    async fn start(&mut self, ctx: &ToolSetContext) -> anyhow::Result<()>;

    /// Called once when the set is torn down (session end, reload).
    async fn stop(&mut self) -> anyhow::Result<()>;

    /// The tools this set currently exposes. May be called more than once;
    /// implementations that discover tools dynamically (e.g. an MCP server)
    /// should re-query rather than cache past `start()`.
    async fn tools(&self, ctx: &ToolSetContext) -> anyhow::Result<Vec<Arc<dyn Tool>>>;
}
