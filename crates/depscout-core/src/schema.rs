// ABOUTME: Tool and output schemas handed to the model client
// ABOUTME: JSON schemas for tool calling and structured final output

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::record::DependencyRecord;

/// Tool schema for LLM function calling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: JsonValue,
}

/// Schema the final answer must satisfy when structured output is bound
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSchema {
    pub name: String,
    pub schema: JsonValue,
    pub strict: bool,
}

impl OutputSchema {
    /// Output schema for a [`DependencyRecord`]
    pub fn dependency_record() -> Self {
        Self {
            name: "file_dependency".to_string(),
            schema: DependencyRecord::output_schema(),
            strict: true,
        }
    }
}
