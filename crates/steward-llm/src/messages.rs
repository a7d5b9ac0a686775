//! Message types for LLM communication
//!
//! Messages follow the OpenAI chat layout: a role plus either plain text or
//! a list of content blocks. Tool calls requested by the assistant keep
//! their arguments as the raw string the model produced, since that string
//! may not be valid JSON.

use crate::tools::FunctionCall;
use serde::{Deserialize, Serialize};

/// Message role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User message
    User,
    /// Assistant message
    Assistant,
    /// System message
    System,
}

/// Content block in a message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text content
    Text {
        /// Text content
        text: String,
    },

    /// Tool call requested by the assistant
    ToolUse {
        /// Call ID assigned by the provider
        id: String,
        /// Tool name
        name: String,
        /// Raw JSON argument string, unparsed
        arguments: String,
    },
}

/// Message content: either simple text or structured blocks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Simple text content
    Text(String),
    /// Structured content blocks
    Blocks(Vec<ContentBlock>),
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Message role
    pub role: Role,

    /// Message content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<MessageContent>,
}

impl Message {
    /// Create a user message with text
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(MessageContent::Text(text.into())),
        }
    }

    /// Create an assistant message with text
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Some(MessageContent::Text(text.into())),
        }
    }

    /// Create a system message with text
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: Some(MessageContent::Text(text.into())),
        }
    }

    /// Create an assistant message from optional text and tool calls
    pub fn assistant_with_calls(text: Option<String>, calls: Vec<FunctionCall>) -> Self {
        let mut blocks: Vec<ContentBlock> = text
            .into_iter()
            .map(|text| ContentBlock::Text { text })
            .collect();
        blocks.extend(calls.into_iter().map(|call| ContentBlock::ToolUse {
            id: call.id,
            name: call.name,
            arguments: call.arguments,
        }));
        Self {
            role: Role::Assistant,
            content: Some(MessageContent::Blocks(blocks)),
        }
    }

    /// Extract text content from the message (convenience method)
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            Some(MessageContent::Text(s)) => Some(s),
            Some(MessageContent::Blocks(blocks)) => blocks.iter().find_map(|b| match b {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::ToolUse { .. } => None,
            }),
            None => None,
        }
    }

    /// Tool calls requested by this message, in order
    pub fn function_calls(&self) -> Vec<FunctionCall> {
        match &self.content {
            Some(MessageContent::Blocks(blocks)) => blocks
                .iter()
                .filter_map(|b| match b {
                    ContentBlock::ToolUse {
                        id,
                        name,
                        arguments,
                    } => Some(FunctionCall {
                        id: id.clone(),
                        name: name.clone(),
                        arguments: arguments.clone(),
                    }),
                    ContentBlock::Text { .. } => None,
                })
                .collect(),
            _ => vec![],
        }
    }

    /// Check if this message contains any tool calls
    pub fn has_tool_uses(&self) -> bool {
        match &self.content {
            Some(MessageContent::Blocks(blocks)) => blocks
                .iter()
                .any(|b| matches!(b, ContentBlock::ToolUse { .. })),
            _ => false,
        }
    }
}
