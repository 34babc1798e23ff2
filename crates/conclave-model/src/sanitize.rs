//! Message sanitization: strip image content when the model does not support it.
//!
//! Call [`strip_images_if_unsupported`] before building a [`CompletionRequest`]
//! to ensure that image parts are replaced with a text placeholder whenever the
//! target model only supports text input.

use crate::{
    catalog::InputModality,
    types::{ContentPart, Message, MessageContent, ToolContentPart, ToolResultContent},
};

const IMAGE_OMITTED: &str = "[image omitted: model does not support image input]";

/// Replace all image content in `messages` with a text placeholder when
/// `modalities` does not include [`InputModality::Image`].
///
/// If the model *does* support images this is a no-op and the messages are
/// returned unchanged.
pub fn strip_images_if_unsupported(
    messages: Vec<Message>,
    modalities: &[InputModality],
) -> Vec<Message> {
    if modalities.contains(&InputModality::Image) {
        return messages;
    }
    messages.into_iter().map(strip_message).collect()
}

fn strip_message(mut m: Message) -> Message {
    m.content = match m.content {
        MessageContent::ContentParts(parts) => {
            let stripped: Vec<ContentPart> = parts
                .into_iter()
                .map(|p| match p {
                    ContentPart::Image { .. } => {
                        ContentPart::Text { text: IMAGE_OMITTED.to_string() }
                    }
                    other => other,
                })
                .collect();
            // Collapse single text part back to Text for cleaner serialization.
            if stripped.len() == 1 {
                if let ContentPart::Text { text } = &stripped[0] {
                    return Message { content: MessageContent::Text(text.clone()), ..m };
                }
            }
            MessageContent::ContentParts(stripped)
        }
        MessageContent::ToolResult { tool_call_id, content } => {
            let content = strip_tool_result_content(content);
            MessageContent::ToolResult { tool_call_id, content }
        }
        other => other,
    };
    m
}

fn strip_tool_result_content(content: ToolResultContent) -> ToolResultContent {
    match content {
        ToolResultContent::Parts(parts) => {
            let stripped: Vec<ToolContentPart> = parts
                .into_iter()
                .map(|p| match p {
                    ToolContentPart::Image { .. } => {
                        ToolContentPart::Text { text: IMAGE_OMITTED.to_string() }
                    }
                    other => other,
                })
                .collect();
            // Collapse single text part back to Text.
            if stripped.len() == 1 {
                if let ToolContentPart::Text { text } = &stripped[0] {
                    return ToolResultContent::Text(text.clone());
                }
            }
            ToolResultContent::Parts(stripped)
        }
        other => other,
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
