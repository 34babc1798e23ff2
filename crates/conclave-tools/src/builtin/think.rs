use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::policy::ApprovalPolicy;
use crate::tool::{Tool, ToolCall, ToolOutput};

/// A no-op scratchpad tool: the model writes out a reasoning step and gets it
/// echoed back verbatim. Nothing is persisted and no side effect happens —
/// the point is to give the model a place to think in the tool-call channel
/// without touching the filesystem, shell, or any other stateful tool.
pub struct ThinkTool;

#[async_trait]
impl Tool for ThinkTool {
    fn name(&self) -> &str { "think" }

    fn description(&self) -> &str {
        "Use this tool to reason about a hard problem before acting, without taking any \
         action. Nothing is persisted; the thought is returned as-is. Useful before a \
         multi-step plan, a tricky tool-call sequence, or when weighing conflicting \
         evidence. Does not require confirmation and has no side effects."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "thought": {
                    "type": "string",
                    "description": "The reasoning to record"
                }
            },
            "required": ["thought"],
            "additionalProperties": false
        })
    }

    fn default_policy(&self) -> ApprovalPolicy { ApprovalPolicy::Auto }

    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let thought = match call.args.get("thought").and_then(|v| v.as_str()) {
            Some(t) => t.to_string(),
            None => return ToolOutput::err(&call.id, "missing 'thought'"),
        };

        debug!(len = thought.len(), "think tool");

        ToolOutput::ok(&call.id, thought)
    }
}
