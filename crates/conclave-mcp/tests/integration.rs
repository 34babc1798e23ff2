// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//!
//! End-to-end test for [`conclave_mcp::McpToolSet`] against a real MCP
//! server process: `npx @modelcontextprotocol/server-everything`, driven over
//! stdio. This network/process dependency means the test only runs when
//! `CONCLAVE_MCP_TEST_SERVER` names a reachable command; it is skipped
//! everywhere else (most CI runners have no `npx`/network access).
//!
//! The crate's pure logic (schema/result conversion) is covered by the unit
//! tests in `src/bridge.rs`.

use conclave_config::McpTransport;
use conclave_mcp::McpToolSet;
use conclave_tools::toolset::{ToolSet, ToolSetContext};

#[tokio::test]
async fn connects_lists_and_calls_a_real_mcp_server() {
    let Ok(command) = std::env::var("CONCLAVE_MCP_TEST_SERVER") else {
        eprintln!("skipping: CONCLAVE_MCP_TEST_SERVER not set");
        return;
    };

    let mut set = McpToolSet::new(
        "everything",
        McpTransport::Stdio {
            command,
            args: vec![],
            env: Default::default(),
        },
    );
    let ctx = ToolSetContext::default();

    set.start(&ctx).await.expect("start must connect");
    let tools = set.tools(&ctx).await.expect("tools must list");
    assert!(!tools.is_empty(), "server must expose at least one tool");

    let echo = tools
        .iter()
        .find(|t| t.name() == "echo")
        .expect("everything server exposes an 'echo' tool");

    let call = conclave_tools::ToolCall {
        id: "test-1".to_string(),
        name: echo.name().to_string(),
        args: serde_json::json!({"message": "hello"}),
    };
    let output = echo.execute(&call).await;
    assert!(!output.is_error);

    set.stop().await.expect("stop must succeed");
}

/// A gateway `ref:` transport is rejected with a clear message rather than
/// attempting any network I/O — resolving `docker:<name>` is out of scope.
#[tokio::test]
async fn gateway_ref_transport_is_rejected_without_network_access() {
    let mut set = McpToolSet::new(
        "gateway",
        McpTransport::Ref {
            r#ref: "docker:some-server".to_string(),
        },
    );
    let ctx = ToolSetContext::default();
    let err = set
        .start(&ctx)
        .await
        .expect_err("ref transport must be rejected, not silently ignored");
    assert!(err.to_string().contains("docker:some-server"));
}
