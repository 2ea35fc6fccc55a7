// ABOUTME: System and human prompts for the per-file dependency conversation
// ABOUTME: Built-in system prompt with an optional markdown override from disk

use crate::error::AgentError;
use std::path::Path;

pub const FILE_DEPENDENCY_PROMPT: &str = include_str!("file_dependency.md");

/// Prompts shared by every session of a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSet {
    system: String,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            system: FILE_DEPENDENCY_PROMPT.to_string(),
        }
    }
}

impl PromptSet {
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
        }
    }

    /// Load the system prompt from a markdown file
    pub fn from_file(path: &Path) -> Result<Self, AgentError> {
        let system = std::fs::read_to_string(path).map_err(|source| AgentError::Prompt {
            path: path.to_path_buf(),
            source,
        })?;
        if system.trim().is_empty() {
            return Err(AgentError::EmptyPrompt(path.to_path_buf()));
        }
        Ok(Self { system })
    }

    /// Built-in prompt, or the override file when one is configured
    pub fn from_override(path: Option<&Path>) -> Result<Self, AgentError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    pub fn human(&self, file_content: &str) -> String {
        human_prompt(file_content)
    }
}

pub fn human_prompt(file_content: &str) -> String {
    format!("Analyze the file content and extract dependencies:\n\n{file_content}")
}
