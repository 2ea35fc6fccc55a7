// ABOUTME: Error type for sandboxed tool invocations
// ABOUTME: Every variant is rendered as observation text at the dispatcher boundary

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("the path '{0}' is outside the authorized workspace or is not valid; always use paths relative to the working directory")]
    UnsafePath(String),

    #[error("file not found at path '{0}'")]
    NotFound(String),

    #[error("the path '{0}' points to a directory, not a file")]
    NotAFile(String),

    #[error("the search path '{0}' is not a directory")]
    NotADirectory(String),

    #[error("offset must be 1 or greater, but received {0}")]
    InvalidOffset(i64),

    #[error("limit must be 1 or greater, but received {0}")]
    InvalidLimit(i64),

    #[error("offset line {offset} is greater than the total number of lines ({total}) in the file")]
    OffsetBeyondEnd { offset: usize, total: usize },

    #[error("invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("invalid glob pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("timed out after {0:?}")]
    TimedOut(std::time::Duration),

    #[error("tool panicked: {0}")]
    Panicked(String),

    #[error("unexpected error while accessing '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ToolError {
    pub(crate) fn io(path: &str, source: std::io::Error) -> Self {
        ToolError::Io {
            path: path.to_string(),
            source,
        }
    }

    /// Observation text handed back to the model
    pub fn to_observation(&self) -> String {
        format!("tool error: {}", self)
    }
}

pub type Result<T> = std::result::Result<T, ToolError>;
