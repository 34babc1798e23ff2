// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//!
//! `conclave-mcp` — MCP (Model Context Protocol) **client** for conclave.
//!
//! Connects to an external MCP server — a local stdio subprocess or a remote
//! HTTP/SSE endpoint — and exposes its tools as an ordinary
//! [`conclave_tools::ToolSet`], so an agent can call them exactly like any
//! built-in tool.
//!
//! # Configuration
//!
//! Declared per-agent as an `mcp` entry in `AgentSpec.toolsets`
//! (`conclave_config::ToolsetSpec::Mcp`):
//!
//! ```yaml
//! agents:
//!   root:
//!     model: anthropic/claude-sonnet-4-5
//!     toolsets:
//!       - type: mcp
//!         command: npx
//!         args: ["-y", "@modelcontextprotocol/server-filesystem", "/workspace"]
//!       - type: mcp
//!         remote:
//!           url: https://mcp.example.com/sse
//!           transport_type: sse
//!           headers:
//!             Authorization: "Bearer ${MCP_TOKEN}"
//! ```
//!
//! Resolving the third transport form, `ref: "docker:<name>"`, against an MCP
//! gateway registry is explicitly out of scope here — that gateway is an
//! external collaborator; this crate only speaks the two transports it
//! resolves to.
//!
//! # Architecture
//!
//! ```text
//! AgentSpec.toolsets[mcp]
//!       │
//!       ▼
//! McpToolSet::start()  ──►  rmcp client  ──►  external MCP server
//!       │                        (stdio or HTTP/SSE)
//!       ▼
//! McpToolSet::tools()  ──►  one McpProxyTool per remote tool
//!       │
//!       ▼
//! ToolRegistry  ──►  Tool::execute()  ──►  rmcp tools/call  ──►  server
//! ```

pub mod bridge;
pub mod toolset;

pub use toolset::McpToolSet;
