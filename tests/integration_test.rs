// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
/// Integration tests for the agent loop and tool set using the mock model provider.
use std::sync::Arc;

use conclave_config::{AgentConfig, AgentMode, Config, ToolsConfig};
use conclave_core::{Agent, AgentRuntimeContext};
use conclave_model::MockProvider;
use conclave_tools::{events::ToolEvent, policy::ToolPolicy, ToolRegistry};
use tokio::sync::{mpsc, Mutex};

fn mock_agent(mode: AgentMode) -> Agent {
    let model: Arc<dyn conclave_model::ModelProvider> = Arc::new(MockProvider);
    let tools = Arc::new(ToolRegistry::default());
    let config = Arc::new(AgentConfig::default());
    let tool_policy = Arc::new(ToolPolicy::from_config(&ToolsConfig::default()));
    let mode_lock = Arc::new(Mutex::new(mode));
    let (_tx, tool_event_rx) = mpsc::channel::<ToolEvent>(64);
    let (_confirmation_tx, confirmation_rx) = mpsc::channel(8);
    Agent::new(
        model,
        tools,
        config,
        tool_policy,
        AgentRuntimeContext::default(),
        mode_lock,
        tool_event_rx,
        confirmation_rx,
        128_000,
    )
}

#[tokio::test]
async fn agent_returns_mock_response() {
    let mut agent = mock_agent(AgentMode::Agent);
    let (tx, mut rx) = mpsc::channel(64);
    agent.submit("hello", tx).await.unwrap();

    let mut got_text = false;
    while let Ok(event) = rx.try_recv() {
        if let conclave_core::AgentEvent::TextDelta(t) = event {
            assert!(t.contains("MOCK"));
            got_text = true;
        }
    }
    assert!(got_text, "expected at least one TextDelta event");
}

#[test]
fn config_defaults_are_valid() {
    let cfg = Config::default();
    assert_eq!(cfg.model.provider, "openai");
    assert!(cfg.agent.max_tool_rounds > 0);
    assert!(cfg.agent.compaction_threshold > 0.0);
}

#[test]
fn tool_policy_auto_approve() {
    use conclave_config::ToolsConfig;
    use conclave_tools::{ApprovalPolicy, ToolPolicy};

    let cfg = ToolsConfig::default();
    let policy = ToolPolicy::from_config(&cfg);
    assert_eq!(policy.decide("cat /etc/hosts"), ApprovalPolicy::Auto);
    assert_eq!(policy.decide("ls /tmp"), ApprovalPolicy::Auto);
}

#[test]
fn tool_policy_deny() {
    use conclave_config::ToolsConfig;
    use conclave_tools::{ApprovalPolicy, ToolPolicy};

    let cfg = ToolsConfig {
        deny_patterns: vec!["rm -rf /*".into()],
        ..ToolsConfig::default()
    };
    let policy = ToolPolicy::from_config(&cfg);
    assert_eq!(policy.decide("rm -rf /*"), ApprovalPolicy::Deny);
}

#[tokio::test]
async fn shell_tool_executes_echo() {
    use conclave_tools::Tool;
    use conclave_tools::{ShellTool, ToolCall};

    let tool = ShellTool::default();
    let call = ToolCall {
        id: "1".into(),
        name: "shell".into(),
        args: serde_json::json!({ "shell_command": "echo hello_world" }),
    };
    let output = tool.execute(&call).await;
    assert!(!output.is_error);
    assert!(output.content.contains("hello_world"));
}

#[tokio::test]
async fn fs_tool_write_read_roundtrip() {
    use conclave_tools::{ReadFileTool, Tool, ToolCall, WriteTool};

    let path = format!("/tmp/conclave_test_{}.txt", uuid::Uuid::new_v4());

    let write_call = ToolCall {
        id: "w1".into(),
        name: "write_file".into(),
        args: serde_json::json!({ "path": path, "text": "roundtrip", "append": false }),
    };
    let wo = WriteTool.execute(&write_call).await;
    assert!(!wo.is_error, "write failed: {}", wo.content);

    let read_call = ToolCall {
        id: "r1".into(),
        name: "read_file".into(),
        args: serde_json::json!({ "path": path }),
    };
    let ro = ReadFileTool.execute(&read_call).await;
    assert!(!ro.is_error);
    assert!(ro.content.contains("roundtrip"));

    let _ = std::fs::remove_file(&path);
}
