// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//!
//! [`McpToolSet`] — connects to one external MCP server (stdio subprocess or
//! remote HTTP/SSE) and exposes its tools as ordinary [`conclave_tools::Tool`]s.
//!
//! This is the client half of the `mcp` [`ToolsetSpec`](conclave_config::ToolsetSpec):
//! resolving the `docker:<name>` gateway form is explicitly out of scope (an
//! external collaborator resolves it to one of the other two transports
//! before this crate ever sees it).

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use rmcp::model::CallToolRequestParam;
use rmcp::service::{RoleClient, RunningService};
use rmcp::transport::{SseClientTransport, StreamableHttpClientTransport, TokioChildProcess};
use rmcp::ServiceExt;
use serde_json::Value;

use conclave_config::McpTransport;
use conclave_tools::policy::ApprovalPolicy;
use conclave_tools::tool::{Tool, ToolCall, ToolOutput};
use conclave_tools::toolset::{ToolSet, ToolSetContext};
use conclave_tools::ToolSchema;

use crate::bridge::{call_result_to_output, mcp_tool_to_schema};

/// A named connection to one external MCP server, mounted as a [`ToolSet`].
///
/// `name` is the toolset's own identifier (the key under which it appears in
/// logs and registry-conflict warnings); it has no bearing on the tools'
/// individual names, which come straight from the remote server's `tools/list`.
pub struct McpToolSet {
    name: String,
    transport: McpTransport,
    client: Option<Arc<RunningService<RoleClient, ()>>>,
}

impl McpToolSet {
    pub fn new(name: impl Into<String>, transport: McpTransport) -> Self {
        Self {
            name: name.into(),
            transport,
            client: None,
        }
    }

    async fn connect(&self) -> Result<RunningService<RoleClient, ()>> {
        match &self.transport {
            McpTransport::Stdio { command, args, env } => {
                let mut cmd = tokio::process::Command::new(command);
                cmd.args(args);
                for (k, v) in env {
                    cmd.env(k, v);
                }
                let transport = TokioChildProcess::new(cmd)
                    .with_context(|| format!("spawning MCP server '{command}'"))?;
                ().serve(transport)
                    .await
                    .with_context(|| format!("MCP handshake with '{command}' failed"))
            }
            McpTransport::Remote { remote } => connect_remote(remote).await,
            McpTransport::Ref { r#ref } => bail!(
                "mcp toolset '{}' uses gateway ref '{ref_}'; the gateway that resolves \
                 docker:<name> refs to a concrete transport is an external collaborator, \
                 not something this client resolves itself",
                self.name,
                ref_ = r#ref,
            ),
        }
    }
}

async fn connect_remote(
    remote: &conclave_config::RemoteMcp,
) -> Result<RunningService<RoleClient, ()>> {
    let mut headers = reqwest::header::HeaderMap::new();
    for (k, v) in &remote.headers {
        let name = reqwest::header::HeaderName::from_bytes(k.as_bytes())
            .with_context(|| format!("invalid header name '{k}' in mcp toolset config"))?;
        let value = reqwest::header::HeaderValue::from_str(v)
            .with_context(|| format!("invalid header value for '{k}' in mcp toolset config"))?;
        headers.insert(name, value);
    }
    let http_client = reqwest::Client::builder()
        .default_headers(headers)
        .build()
        .context("building reqwest client for mcp remote transport")?;

    match remote.transport_type.as_str() {
        "sse" => {
            let transport = SseClientTransport::start_with_client(
                http_client,
                rmcp::transport::sse_client::SseClientConfig {
                    sse_endpoint: remote.url.clone().into(),
                    ..Default::default()
                },
            )
            .await
            .with_context(|| format!("connecting to SSE MCP server '{}'", remote.url))?;
            ().serve(transport)
                .await
                .with_context(|| format!("MCP handshake with '{}' failed", remote.url))
        }
        _ => {
            let transport =
                StreamableHttpClientTransport::with_client(http_client, remote.url.clone());
            ().serve(transport)
                .await
                .with_context(|| format!("MCP handshake with '{}' failed", remote.url))
        }
    }
}

#[async_trait]
impl ToolSet for McpToolSet {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&mut self, _ctx: &ToolSetContext) -> anyhow::Result<()> {
        let client = self.connect().await?;
        self.client = Some(Arc::new(client));
        Ok(())
    }

    async fn stop(&mut self) -> anyhow::Result<()> {
        // Every proxied Tool holds its own Arc clone of the client, so this
        // only actually cancels the connection once every such tool built
        // from a previous `tools()` call has already been dropped.
        if let Some(client) = self.client.take() {
            if let Ok(client) = Arc::try_unwrap(client) {
                let _ = client.cancel().await;
            }
        }
        Ok(())
    }

    async fn tools(&self, _ctx: &ToolSetContext) -> anyhow::Result<Vec<Arc<dyn Tool>>> {
        let client = self
            .client
            .as_ref()
            .context("McpToolSet::tools called before start()")?;
        let listed = client
            .list_all_tools()
            .await
            .context("listing tools from MCP server")?;

        Ok(listed
            .iter()
            .map(|t| {
                Arc::new(McpProxyTool {
                    client: client.clone(),
                    schema: mcp_tool_to_schema(t),
                }) as Arc<dyn Tool>
            })
            .collect())
    }
}

/// A single tool proxied from a remote MCP server.
///
/// Holds a shared handle to the already-established client connection
/// ([`McpToolSet::start`] connects once; every proxied tool reuses it) and
/// forwards `execute` as a `tools/call` request.
struct McpProxyTool {
    client: Arc<RunningService<RoleClient, ()>>,
    schema: ToolSchema,
}

#[async_trait]
impl Tool for McpProxyTool {
    fn name(&self) -> &str {
        &self.schema.name
    }

    fn description(&self) -> &str {
        &self.schema.description
    }

    fn parameters_schema(&self) -> Value {
        self.schema.parameters.clone()
    }

    fn default_policy(&self) -> ApprovalPolicy {
        // Unknown side effects from an external server — same caution as
        // ShellTool rather than WebFetchTool's Auto.
        ApprovalPolicy::Ask
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let arguments = match &call.args {
            Value::Object(m) => Some(m.clone()),
            Value::Null => None,
            other => {
                return ToolOutput::err(
                    &call.id,
                    format!("tool arguments must be a JSON object, got: {other}"),
                )
            }
        };

        let result = self
            .client
            .call_tool(CallToolRequestParam {
                name: self.schema.name.clone().into(),
                arguments,
            })
            .await;

        match result {
            Ok(result) => call_result_to_output(&call.id, result),
            Err(e) => ToolOutput::err(&call.id, format!("MCP call failed: {e}")),
        }
    }
}
