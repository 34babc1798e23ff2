// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Centralised tool-registry builder.
//!
//! All callers (CI runner, conversation runner, sub-agents) use
//! `build_tool_registry` with the appropriate [`ToolSetProfile`] instead of
//! each inlining their own registration loop.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::warn;

use conclave_config::{AgentMode, Config, ToolsetSpec};
use conclave_mcp::McpToolSet;
use conclave_model::ModelProvider;
use conclave_tools::{
    events::ToolEvent, toolset::ToolSetContext, FilesystemToolSet, ShellTool, ThinkTool,
    TodoWriteTool, Tool, ToolRegistry, ToolSet, UpdateMemoryTool, WebFetchTool,
};

use conclave_core::AgentRuntimeContext;

use crate::context::ToolSetProfile;
use crate::task_tool::TaskTool;

/// Maps a [`ToolsetSpec`] variant to the short kind string used to match it
/// against a built-in tool's own kind when filtering registration.
fn toolset_kind(spec: &ToolsetSpec) -> &'static str {
    match spec {
        ToolsetSpec::Think { .. } => "think",
        ToolsetSpec::Todo { .. } => "todo",
        ToolsetSpec::Memory { .. } => "memory",
        ToolsetSpec::Filesystem { .. } => "filesystem",
        ToolsetSpec::Shell { .. } => "shell",
        ToolsetSpec::Fetch { .. } => "fetch",
        ToolsetSpec::Script { .. } => "script",
        ToolsetSpec::Mcp { .. } => "mcp",
        ToolsetSpec::Api { .. } => "api",
    }
}

/// Build a [`ToolRegistry`] populated according to the given `profile`.
///
/// This is the single canonical place where tools are wired up. Adding a
/// new tool means adding it here once and it will appear in every
/// appropriate profile automatically.
///
/// When `profile` carries `toolsets: None` (no declared `Config.agents`
/// entry for this agent — the historical single-agent CLI case) every
/// built-in kind below is registered unconditionally, matching the behaviour
/// before `AgentSpec.toolsets` existed. When `toolsets: Some(list)`,
/// registration is scoped to exactly the declared kinds, and within each
/// kind to that entry's own `tools` whitelist (empty whitelist = every tool
/// of that kind).
///
/// ### Shared-state parameters
///
/// * `mode_lock` — currently unused here (no tool switches mode in this
///   build); kept as a parameter because `Agent::new()` needs the same
///   instance, and future mode-switching tools would register through here.
/// * `tool_event_tx` — the sending half of the channel whose receiving end
///   is passed to `Agent::new()`. `TodoWriteTool` sends events here; the
///   agent drains them after each tool execution.
/// * `sub_agent_runtime` — inherited by `transfer_task` sub-agents (project
///   root, CI/git notes, AGENTS.md, discovered skills/subagents). Only used
///   for the `Full` profile; pass `AgentRuntimeContext::default()` otherwise.
pub async fn build_tool_registry(
    cfg: &Config,
    model: Arc<dyn ModelProvider>,
    profile: ToolSetProfile,
    _mode_lock: Arc<Mutex<AgentMode>>,
    tool_event_tx: mpsc::Sender<ToolEvent>,
    sub_agent_runtime: AgentRuntimeContext,
) -> anyhow::Result<ToolRegistry> {
    let mut reg = ToolRegistry::new();

    let toolsets: Option<&[ToolsetSpec]> = match &profile {
        ToolSetProfile::Full { toolsets, .. } => toolsets.as_deref(),
        ToolSetProfile::SubAgent { toolsets, .. } => toolsets.as_deref(),
    };
    let find_kind = |kind: &str| {
        toolsets.and_then(|sets| sets.iter().find(|t| toolset_kind(t) == kind))
    };
    // Whether `name` (belonging to `kind`) should be registered: the kind
    // itself must be declared (or `toolsets` is `None`, meaning unscoped),
    // and `name` must be in that kind's whitelist (or the whitelist is empty).
    let tool_allowed = |kind: &str, name: &str| match toolsets {
        None => true,
        Some(_) => match find_kind(kind) {
            None => false,
            Some(spec) => {
                let wl = spec.whitelist();
                wl.is_empty() || wl.iter().any(|w| w == name)
            }
        },
    };

    if toolsets.is_none() || find_kind("filesystem").is_some() {
        register_filesystem_tools(&mut reg, |name| tool_allowed("filesystem", name)).await?;
    }
    if tool_allowed("think", "think") {
        reg.register(ThinkTool);
    }
    if tool_allowed("fetch", "fetch") {
        reg.register(WebFetchTool);
    }
    if tool_allowed("shell", "shell") {
        reg.register(ShellTool { timeout_secs: cfg.tools.timeout_secs });
    }
    if tool_allowed("memory", "memory") {
        reg.register(UpdateMemoryTool { memory_file: cfg.tools.memory.memory_file.clone() });
    }

    if let Some(ToolsetSpec::Mcp { transport, tools, .. }) = find_kind("mcp") {
        register_mcp_tools(&mut reg, transport.clone(), tools).await?;
    }

    for kind in ["script", "api"] {
        if find_kind(kind).is_some() {
            warn!("toolset kind '{kind}' is declared but has no built-in tool implementation; skipping");
        }
    }

    match profile {
        ToolSetProfile::Full { todos, task_depth, agent_name, .. } => {
            // transfer_task is not gated by a toolset kind: delegation is
            // controlled by the declared `sub_agents` graph, not `toolsets`.
            reg.register(TaskTool::new(
                model,
                Arc::new(cfg.clone()),
                task_depth,
                agent_name,
                sub_agent_runtime,
                tool_event_tx.clone(),
            ));
            if tool_allowed("todo", "todo") {
                reg.register(TodoWriteTool::new(todos, tool_event_tx));
            }
        }
        ToolSetProfile::SubAgent { todos, .. } => {
            if tool_allowed("todo", "todo") {
                reg.register(TodoWriteTool::new(todos, tool_event_tx));
            }
            // transfer_task intentionally omitted — sub-agents may not delegate
            // further than the static Team graph already allows; TaskTool's
            // own depth counter is the defense-in-depth backstop (SPEC_FULL §4.7).
        }
    }

    Ok(reg)
}

/// Start the `filesystem` [`ToolSet`] and register whichever of its seven
/// tools pass `allow(name)`.
async fn register_filesystem_tools(
    reg: &mut ToolRegistry,
    allow: impl Fn(&str) -> bool,
) -> anyhow::Result<()> {
    let mut fs = FilesystemToolSet::default();
    let ctx = ToolSetContext::default();
    fs.start(&ctx).await?;
    for tool in fs.tools(&ctx).await? {
        if allow(tool.name()) {
            reg.register_arc(tool);
        }
    }
    Ok(())
}

/// Connect to the declared MCP server and register whichever of its tools
/// pass the `tools` whitelist (empty whitelist = every tool it offers).
async fn register_mcp_tools(
    reg: &mut ToolRegistry,
    transport: conclave_config::McpTransport,
    whitelist: &[String],
) -> anyhow::Result<()> {
    let mut mcp = McpToolSet::new("mcp", transport);
    let ctx = ToolSetContext::default();
    mcp.start(&ctx).await?;
    for tool in mcp.tools(&ctx).await? {
        if whitelist.is_empty() || whitelist.iter().any(|w| w == tool.name()) {
            reg.register_arc(tool);
        }
    }
    Ok(())
}
