// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//!
//! Type conversions between rmcp's MCP model types and conclave's tool types.
//!
//! These are pure, stateless functions — no allocation beyond what the output
//! types require.  The bridge sits at the seam between [`rmcp`]'s wire protocol
//! types and [`conclave_tools`] so neither side needs to know about the other.

use rmcp::model::{CallToolResult, Content, RawContent, Tool as McpTool};
use conclave_tools::{ToolOutput, ToolOutputPart, ToolSchema};

/// Convert an rmcp [`Tool`](McpTool) descriptor (as returned by `tools/list`
/// on a remote MCP server) into a sven [`ToolSchema`].
pub fn mcp_tool_to_schema(tool: &McpTool) -> ToolSchema {
    ToolSchema {
        name: tool.name.to_string(),
        description: tool.description.as_deref().unwrap_or_default().to_string(),
        parameters: serde_json::Value::Object((*tool.input_schema).clone()),
    }
}

/// Convert an rmcp [`CallToolResult`] (the response to `tools/call`) into a
/// sven [`ToolOutput`].
///
/// Text content becomes [`ToolOutputPart::Text`]; image content becomes
/// [`ToolOutputPart::Image`] re-encoded as a `data:<mime>;base64,<b64>` URI so
/// it round-trips through the same representation sven's own vision-capable
/// tools use. Content kinds sven has no representation for (audio, embedded
/// resources) are dropped with a single text note rather than silently
/// losing the whole result.
pub fn call_result_to_output(call_id: &str, result: CallToolResult) -> ToolOutput {
    let mut parts = Vec::with_capacity(result.content.len());
    for item in result.content {
        match item_to_part(item) {
            Some(part) => parts.push(part),
            None => parts.push(ToolOutputPart::Text(
                "(unsupported MCP content type omitted)".to_string(),
            )),
        }
    }
    if parts.is_empty() {
        parts.push(ToolOutputPart::Text(String::new()));
    }

    let mut output = ToolOutput::with_parts(call_id, parts);
    output.is_error = result.is_error.unwrap_or(false);
    output
}

fn item_to_part(content: Content) -> Option<ToolOutputPart> {
    match content.raw {
        RawContent::Text(t) => Some(ToolOutputPart::Text(t.text)),
        RawContent::Image(img) => Some(ToolOutputPart::Image(format!(
            "data:{};base64,{}",
            img.mime_type, img.data
        ))),
        _ => None,
    }
}

// ─── Unit tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rmcp::model::RawTextContent;

    use super::*;

    fn make_mcp_tool(name: &str, desc: &str, schema: serde_json::Value) -> McpTool {
        let input_schema = match schema {
            serde_json::Value::Object(m) => m,
            _ => serde_json::Map::new(),
        };
        McpTool::new(
            std::borrow::Cow::Owned(name.to_string()),
            std::borrow::Cow::Owned(desc.to_string()),
            Arc::new(input_schema),
        )
    }

    #[test]
    fn mcp_tool_to_schema_preserves_name_and_description() {
        let tool = make_mcp_tool(
            "list_files",
            "Lists files in a directory",
            serde_json::json!({"type": "object"}),
        );
        let schema = mcp_tool_to_schema(&tool);
        assert_eq!(schema.name, "list_files");
        assert_eq!(schema.description, "Lists files in a directory");
    }

    #[test]
    fn mcp_tool_to_schema_carries_parameters_object() {
        let tool = make_mcp_tool(
            "search",
            "Search",
            serde_json::json!({"type": "object", "properties": {"q": {"type": "string"}}}),
        );
        let schema = mcp_tool_to_schema(&tool);
        assert!(schema.parameters["properties"]["q"].is_object());
    }

    fn text_result(text: &str, is_error: bool) -> CallToolResult {
        CallToolResult {
            content: vec![Content::new(RawContent::Text(RawTextContent {
                text: text.to_string(),
                meta: None,
            }))],
            is_error: Some(is_error),
            structured_content: None,
            meta: None,
        }
    }

    #[test]
    fn call_result_to_output_text_success() {
        let out = call_result_to_output("id1", text_result("hello", false));
        assert!(!out.is_error);
        assert_eq!(out.content, "hello");
    }

    #[test]
    fn call_result_to_output_text_error() {
        let out = call_result_to_output("id2", text_result("boom", true));
        assert!(out.is_error);
    }

    #[test]
    fn call_result_to_output_empty_content_yields_empty_text_part() {
        let result = CallToolResult {
            content: vec![],
            is_error: Some(false),
            structured_content: None,
            meta: None,
        };
        let out = call_result_to_output("id3", result);
        assert_eq!(out.parts.len(), 1);
        assert!(matches!(&out.parts[0], ToolOutputPart::Text(t) if t.is_empty()));
    }
}
