use depscout_ai::ModelError;
use depscout_core::ConfigError;
use depscout_tools::ToolError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Hard failure of one file's session
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("model invocation failed: {0}")]
    Model(#[from] ModelError),

    #[error("model call timed out after {0:?}")]
    ModelTimeout(Duration),

    #[error("turn limit of {max_turns} exceeded")]
    TurnLimitExceeded { max_turns: usize },

    #[error("session deadline of {0:?} exceeded")]
    SessionTimeout(Duration),

    #[error("target file unavailable: {0}")]
    FileUnavailable(#[source] ToolError),

    #[error("concurrency limiter closed")]
    LimiterClosed,

    #[error("session task panicked: {0}")]
    Panicked(String),
}

/// Failure to assemble a resolver
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("failed to open workspace root {path}: {source}")]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read system prompt {path}: {source}")]
    Prompt {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("system prompt {0} is empty")]
    EmptyPrompt(PathBuf),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}
