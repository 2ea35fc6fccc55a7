// ABOUTME: Conversation log types shared by the model client, tools and agent
// ABOUTME: Messages, tool calls/results and the assistant turn returned by a model

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A request from the model to invoke one tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Identifier assigned by the caller; echoed back on the matching result
    pub id: String,
    /// Name of the tool to invoke
    pub name: String,
    /// Tool arguments as decoded JSON
    #[serde(default)]
    pub arguments: JsonValue,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: JsonValue) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// Observation produced by running one tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Identifier of the originating tool call
    pub call_id: String,
    /// Name of the tool that was requested
    pub tool_name: String,
    /// Observation text fed back to the model
    pub content: String,
    /// Whether the observation reports a failure
    #[serde(default)]
    pub is_error: bool,
}

/// Terminal payload of an assistant turn without tool calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Payload {
    /// Already-structured output (e.g. parsed by the provider)
    Structured(JsonValue),
    /// Free text, expected to contain a JSON object
    Text(String),
    /// No content at all
    Empty,
}

impl Payload {
    pub fn is_empty(&self) -> bool {
        match self {
            Payload::Empty => true,
            Payload::Text(text) => text.trim().is_empty(),
            Payload::Structured(_) => false,
        }
    }

    /// Text rendering used when the payload is sent back in the message log
    pub fn as_text(&self) -> String {
        match self {
            Payload::Structured(value) => value.to_string(),
            Payload::Text(text) => text.clone(),
            Payload::Empty => String::new(),
        }
    }
}

/// One reply from the model: either tool requests or a final payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantTurn {
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    pub payload: Payload,
}

impl AssistantTurn {
    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: calls,
            payload: Payload::Empty,
        }
    }

    pub fn final_answer(payload: Payload) -> Self {
        Self {
            tool_calls: Vec::new(),
            payload,
        }
    }

    pub fn requests_tools(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// A message in the conversation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    System { content: String },
    Human { content: String },
    Assistant(AssistantTurn),
    Tool(ToolResult),
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message::System {
            content: content.into(),
        }
    }

    pub fn human(content: impl Into<String>) -> Self {
        Message::Human {
            content: content.into(),
        }
    }

    pub fn role(&self) -> &'static str {
        match self {
            Message::System { .. } => "system",
            Message::Human { .. } => "human",
            Message::Assistant(_) => "assistant",
            Message::Tool(_) => "tool",
        }
    }
}
