// ABOUTME: Interfaces for the file content and file search collaborators
// ABOUTME: The workspace implements both; tests substitute counting or failing fakes

use crate::error::Result;
use async_trait::async_trait;

/// Outcome of a file-name search
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchOutcome {
    /// Matching paths relative to the working root, `/`-separated
    pub matches: Vec<String>,
    /// Whether the result cap was reached before the walk finished
    pub truncated: bool,
    /// Cap that applied to this search
    pub max_results: usize,
}

impl SearchOutcome {
    /// Render the outcome as observation text for the model
    pub fn render(&self, pattern: &str, relative_path: &str) -> String {
        if self.matches.is_empty() {
            return format!(
                "No files found matching pattern '{}' in '{}'.",
                pattern, relative_path
            );
        }

        let body = self.matches.join("\n");
        if self.truncated {
            format!(
                "File search results for pattern '{pattern}' (TRUNCATED):\n\n{body}\n\n\
                 --- LIMIT REACHED ---\n\
                 WARNING: Only the first {} matches are shown.\n\
                 ADVICE: Narrow your pattern or restrict the search path.",
                self.max_results
            )
        } else {
            format!("File search results for pattern '{pattern}':\n\n{body}")
        }
    }
}

/// Reads file content from the working root
#[async_trait]
pub trait FileContentProvider: Send + Sync {
    /// Read `limit` lines starting at 1-indexed line `offset`.
    async fn read(&self, relative_path: &str, offset: i64, limit: Option<i64>) -> Result<String>;
}

/// Finds files under the working root by name or glob
#[async_trait]
pub trait FileSearchProvider: Send + Sync {
    async fn search(&self, pattern: &str, relative_path: &str) -> Result<SearchOutcome>;
}
