use crate::llm_provider::*;
use async_trait::async_trait;
use depscout_core::{AssistantTurn, LLMConfig, Message, OutputSchema, Payload, ToolCall, ToolSchema};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for OpenAI-compatible providers (OpenAI, LM Studio, Ollama, etc.)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAICompatibleConfig {
    /// Base URL for the API (e.g., "http://localhost:1234/v1")
    pub base_url: String,
    /// Model to use
    pub model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum retries for transient failures
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further attempt
    pub retry_backoff_ms: u64,
    /// Optional API key (some providers require it, some don't)
    pub api_key: Option<String>,
    /// Provider name for display purposes
    pub provider_name: String,
    /// Generation parameters sent with every request
    pub generation: GenerationConfig,
}

impl Default for OpenAICompatibleConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-5-nano".to_string(),
            timeout_secs: 120,
            max_retries: 3,
            retry_backoff_ms: 1000,
            api_key: None,
            provider_name: "openai".to_string(),
            generation: GenerationConfig::default(),
        }
    }
}

impl OpenAICompatibleConfig {
    /// Create config for LM Studio
    pub fn lm_studio(model: String) -> Self {
        Self {
            base_url: "http://localhost:1234/v1".to_string(),
            model,
            provider_name: "lmstudio".to_string(),
            ..Default::default()
        }
    }

    /// Create config for Ollama (OpenAI-compatible endpoint)
    pub fn ollama(model: String) -> Self {
        Self {
            base_url: "http://localhost:11434/v1".to_string(),
            model,
            provider_name: "ollama".to_string(),
            ..Default::default()
        }
    }

    /// Build from the `[llm]` section of the application config
    pub fn from_llm_config(config: &LLMConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
            api_key: config.api_key.clone(),
            provider_name: config.provider.clone(),
            generation: GenerationConfig {
                temperature: Some(config.temperature),
                ..GenerationConfig::default()
            },
            ..Default::default()
        }
    }

    /// GPT-5 and o-series models reject sampling parameters
    pub fn is_reasoning_model(&self) -> bool {
        let model = self.model.to_lowercase();
        let mut chars = model.chars();
        model.starts_with("gpt-5")
            || (chars.next() == Some('o') && chars.next().is_some_and(|c| c.is_ascii_digit()))
    }
}

/// OpenAI-compatible Chat Completions client with tool calling
pub struct OpenAICompatibleProvider {
    config: OpenAICompatibleConfig,
    client: Client,
}

impl OpenAICompatibleProvider {
    /// Create a new OpenAI-compatible provider
    pub fn new(config: OpenAICompatibleConfig) -> ModelResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ModelError::InvalidRequest(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &OpenAICompatibleConfig {
        &self.config
    }

    /// Send a request with retry logic for transient failures
    async fn send_request(&self, request: &ChatCompletionsRequest) -> ModelResult<ChatCompletionsResponse> {
        let mut attempt = 0;
        loop {
            match self.try_request(request).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() && attempt < self.config.max_retries => {
                    // Exponential backoff: 1s, 2s, 4s with the default base
                    let delay = Duration::from_millis(self.config.retry_backoff_ms << attempt.min(16));
                    attempt += 1;
                    warn!(
                        provider = %self.config.provider_name,
                        attempt,
                        max_retries = self.config.max_retries,
                        error = %e,
                        "Model request failed, retrying in {:?}",
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_request(&self, request: &ChatCompletionsRequest) -> ModelResult<ChatCompletionsResponse> {
        let mut request_builder = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .header("Content-Type", "application/json")
            .json(request);

        if let Some(api_key) = &self.config.api_key {
            request_builder = request_builder.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = request_builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ModelError::Timeout(Duration::from_secs(self.config.timeout_secs))
            } else {
                ModelError::Transport {
                    provider: self.config.provider_name.clone(),
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ModelError::Api {
                provider: self.config.provider_name.clone(),
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<ChatCompletionsResponse>()
            .await
            .map_err(|e| ModelError::Decode {
                provider: self.config.provider_name.clone(),
                message: e.to_string(),
            })
    }

    pub(crate) fn build_request(&self, request: ModelRequest<'_>) -> ChatCompletionsRequest {
        let generation = &self.config.generation;
        let reasoning = self.config.is_reasoning_model();
        ChatCompletionsRequest {
            model: self.config.model.clone(),
            messages: request.messages.iter().map(to_chat_message).collect(),
            tools: (!request.tools.is_empty())
                .then(|| request.tools.iter().map(to_chat_tool).collect()),
            response_format: request.output_schema.map(to_response_format),
            // Sampling for chat models, effort for reasoning models
            temperature: generation.temperature.filter(|_| !reasoning),
            max_completion_tokens: generation.max_completion_tokens,
            reasoning_effort: generation.reasoning_effort.clone().filter(|_| reasoning),
        }
    }

    pub(crate) fn into_turn(&self, response: ChatCompletionsResponse) -> ModelResult<AssistantTurn> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::Decode {
                provider: self.config.provider_name.clone(),
                message: "no choices in response".to_string(),
            })?;

        let tool_calls: Vec<ToolCall> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| {
                let arguments = serde_json::from_str(&call.function.arguments)
                    .unwrap_or(JsonValue::String(call.function.arguments));
                let id = call
                    .id
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple()));
                ToolCall::new(id, call.function.name, arguments)
            })
            .collect();

        let payload = match (choice.message.content, choice.message.refusal) {
            (Some(text), _) if !text.trim().is_empty() => Payload::Text(text),
            (_, Some(refusal)) if !refusal.trim().is_empty() => Payload::Text(refusal),
            _ => Payload::Empty,
        };

        Ok(AssistantTurn { tool_calls, payload })
    }
}

#[async_trait]
impl ModelClient for OpenAICompatibleProvider {
    async fn invoke(&self, request: ModelRequest<'_>) -> ModelResult<AssistantTurn> {
        if request.messages.is_empty() {
            return Err(ModelError::InvalidRequest("empty message log".to_string()));
        }

        let body = self.build_request(request);
        debug!(
            provider = %self.config.provider_name,
            model = %self.config.model,
            messages = body.messages.len(),
            tools = body.tools.as_ref().map(Vec::len).unwrap_or(0),
            "Invoking model"
        );

        let response = self.send_request(&body).await?;
        if let Some(usage) = &response.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                "Model usage"
            );
        }
        self.into_turn(response)
    }

    fn provider_name(&self) -> &str {
        &self.config.provider_name
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

fn to_chat_message(message: &Message) -> ChatMessage {
    match message {
        Message::System { content } => ChatMessage {
            role: "system".to_string(),
            content: Some(content.clone()),
            ..Default::default()
        },
        Message::Human { content } => ChatMessage {
            role: "user".to_string(),
            content: Some(content.clone()),
            ..Default::default()
        },
        Message::Assistant(turn) => ChatMessage {
            role: "assistant".to_string(),
            content: (!turn.payload.is_empty()).then(|| turn.payload.as_text()),
            tool_calls: (!turn.tool_calls.is_empty()).then(|| {
                turn.tool_calls
                    .iter()
                    .map(|call| ChatToolCall {
                        id: Some(call.id.clone()),
                        call_type: "function".to_string(),
                        function: ChatFunctionCall {
                            name: call.name.clone(),
                            arguments: match &call.arguments {
                                JsonValue::String(raw) => raw.clone(),
                                other => other.to_string(),
                            },
                        },
                    })
                    .collect()
            }),
            ..Default::default()
        },
        Message::Tool(result) => ChatMessage {
            role: "tool".to_string(),
            content: Some(result.content.clone()),
            tool_call_id: Some(result.call_id.clone()),
            ..Default::default()
        },
    }
}

fn to_chat_tool(schema: &ToolSchema) -> ChatTool {
    ChatTool {
        tool_type: "function".to_string(),
        function: ChatFunctionDef {
            name: schema.name.clone(),
            description: schema.description.clone(),
            parameters: schema.parameters.clone(),
        },
    }
}

fn to_response_format(schema: &OutputSchema) -> ResponseFormat {
    ResponseFormat {
        format_type: "json_schema".to_string(),
        json_schema: JsonSchemaFormat {
            name: schema.name.clone(),
            schema: schema.schema.clone(),
            strict: schema.strict,
        },
    }
}

// API request/response types for the Chat Completions API

#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionsRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ChatTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning_effort: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ChatToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refusal: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatToolCall {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "type", default = "default_call_type")]
    call_type: String,
    function: ChatFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Serialize)]
struct ChatTool {
    #[serde(rename = "type")]
    tool_type: String,
    function: ChatFunctionDef,
}

#[derive(Debug, Serialize)]
struct ChatFunctionDef {
    name: String,
    description: String,
    parameters: JsonValue,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
    json_schema: JsonSchemaFormat,
}

#[derive(Debug, Serialize)]
struct JsonSchemaFormat {
    name: String,
    schema: JsonValue,
    strict: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionsResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}

fn default_call_type() -> String {
    "function".to_string()
}
