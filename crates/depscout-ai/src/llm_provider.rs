use async_trait::async_trait;
use depscout_core::{AssistantTurn, Message, OutputSchema, ToolSchema};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of a single model invocation
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("transport error talking to {provider}: {message}")]
    Transport { provider: String, message: String },

    #[error("{provider} API error ({status}): {body}")]
    Api {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("failed to decode {provider} response: {message}")]
    Decode { provider: String, message: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("model call timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl ModelError {
    /// Whether retrying the same request may succeed.
    ///
    /// Transport failures, rate limiting and server errors are transient;
    /// client errors and undecodable bodies are not.
    pub fn is_transient(&self) -> bool {
        match self {
            ModelError::Transport { .. } | ModelError::Timeout(_) => true,
            ModelError::Api { status, .. } => *status == 429 || *status >= 500,
            ModelError::Decode { .. } | ModelError::InvalidRequest(_) => false,
        }
    }
}

/// Result type for model operations
pub type ModelResult<T> = std::result::Result<T, ModelError>;

/// Configuration for generation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Temperature for sampling (0.0 to 2.0) - Not supported by reasoning models
    pub temperature: Option<f32>,
    /// Maximum output tokens
    pub max_completion_tokens: Option<usize>,
    /// Reasoning effort for reasoning models: "minimal", "low", "medium", "high"
    pub reasoning_effort: Option<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: Some(0.2),
            max_completion_tokens: None,
            reasoning_effort: None,
        }
    }
}

/// One invocation: the ordered message log plus the per-call bindings.
///
/// Tools and output schema are bound per request; a client keeps no
/// binding state between calls.
#[derive(Debug, Clone, Copy)]
pub struct ModelRequest<'a> {
    pub messages: &'a [Message],
    pub tools: &'a [ToolSchema],
    pub output_schema: Option<&'a OutputSchema>,
}

impl<'a> ModelRequest<'a> {
    pub fn new(messages: &'a [Message]) -> Self {
        Self {
            messages,
            tools: &[],
            output_schema: None,
        }
    }

    pub fn with_tools(mut self, tools: &'a [ToolSchema]) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_output_schema(mut self, schema: &'a OutputSchema) -> Self {
        self.output_schema = Some(schema);
        self
    }
}

/// Main trait for model clients driving a tool-using conversation
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Produce the next assistant turn for the given conversation
    async fn invoke(&self, request: ModelRequest<'_>) -> ModelResult<AssistantTurn>;

    /// Get the name of this provider
    fn provider_name(&self) -> &str;

    /// Get the model identifier
    fn model_name(&self) -> &str;
}
