// ABOUTME: Filesystem-backed read and search tools confined to one working root
// ABOUTME: Implements FileContentProvider and FileSearchProvider over tokio fs and ignore's walker

use crate::error::{Result, ToolError};
use crate::providers::{FileContentProvider, FileSearchProvider, SearchOutcome};
use crate::sandbox::{display_relative, resolve_within};
use async_trait::async_trait;
use globset::GlobBuilder;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default cap on the number of paths returned by one search
pub const DEFAULT_MAX_SEARCH_RESULTS: usize = 100;

/// Read-only view of the working root shared by all sessions
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    max_results: usize,
}

impl Workspace {
    /// Open a workspace rooted at `root`. The root must exist; it is
    /// canonicalized so containment checks compare like with like.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().canonicalize()?;
        if !root.is_dir() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("workspace root {} is not a directory", root.display()),
            ));
        }
        Ok(Self {
            root,
            max_results: DEFAULT_MAX_SEARCH_RESULTS,
        })
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.max(1);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }
}

#[async_trait]
impl FileContentProvider for Workspace {
    async fn read(&self, relative_path: &str, offset: i64, limit: Option<i64>) -> Result<String> {
        debug!(path = relative_path, offset, ?limit, "Reading file");

        let target = resolve_within(&self.root, relative_path)?;

        let metadata = match tokio::fs::metadata(&target).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ToolError::NotFound(relative_path.to_string()))
            }
            Err(e) => return Err(ToolError::io(relative_path, e)),
        };
        if !metadata.is_file() {
            return Err(ToolError::NotAFile(relative_path.to_string()));
        }
        if offset < 1 {
            return Err(ToolError::InvalidOffset(offset));
        }
        if let Some(limit) = limit {
            if limit < 1 {
                return Err(ToolError::InvalidLimit(limit));
            }
        }

        let bytes = tokio::fs::read(&target)
            .await
            .map_err(|e| ToolError::io(relative_path, e))?;
        let text = decode_text(bytes);

        let file_name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| relative_path.to_string());

        render_lines(&text, &file_name, relative_path, offset as usize, limit.map(|l| l as usize))
    }
}

#[async_trait]
impl FileSearchProvider for Workspace {
    async fn search(&self, pattern: &str, relative_path: &str) -> Result<SearchOutcome> {
        debug!(pattern, path = relative_path, "Searching files");

        let search_root = resolve_within(&self.root, relative_path)?;
        match tokio::fs::metadata(&search_root).await {
            Ok(m) if m.is_dir() => {}
            Ok(_) => return Err(ToolError::NotADirectory(relative_path.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ToolError::NotFound(relative_path.to_string()))
            }
            Err(e) => return Err(ToolError::io(relative_path, e)),
        }

        let matcher = GlobBuilder::new(pattern)
            .literal_separator(false)
            .build()
            .map_err(|e| ToolError::InvalidPattern {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })?
            .compile_matcher();

        let root = self.root.clone();
        let max_results = self.max_results;

        tokio::task::spawn_blocking(move || {
            let mut outcome = SearchOutcome {
                max_results,
                ..Default::default()
            };

            let walker = WalkBuilder::new(&search_root)
                .standard_filters(false)
                .sort_by_file_name(|a, b| a.cmp(b))
                .build();

            for dent in walker {
                let dent = match dent {
                    Ok(d) => d,
                    Err(e) => {
                        warn!("Walker error: {}", e);
                        continue;
                    }
                };
                if !dent.file_type().map(|t| t.is_file()).unwrap_or(false) {
                    continue;
                }

                let relative = display_relative(&root, dent.path());
                let name = dent.file_name().to_string_lossy();
                if matcher.is_match(name.as_ref()) || matcher.is_match(&relative) {
                    if outcome.matches.len() >= max_results {
                        outcome.truncated = true;
                        break;
                    }
                    outcome.matches.push(relative);
                }
            }

            outcome
        })
        .await
        .map_err(|e| ToolError::Panicked(e.to_string()))
    }
}

/// Decode as UTF-8, falling back to Latin-1 so legacy sources stay readable.
fn decode_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => e.into_bytes().iter().map(|&b| b as char).collect(),
    }
}

fn render_lines(
    text: &str,
    file_name: &str,
    relative_path: &str,
    offset: usize,
    limit: Option<usize>,
) -> Result<String> {
    let lines: Vec<&str> = text.lines().collect();
    let total = lines.len();
    let start = offset - 1;

    if total == 0 && offset == 1 {
        return Ok(format!(
            "--- START OF FILE CONTENT FOR '{file_name}' (Lines 0-0 of 0, Path: {relative_path}) ---\n\n--- END OF FILE CONTENT ---"
        ));
    }
    if start >= total {
        return Err(ToolError::OffsetBeyondEnd { offset, total });
    }

    let end = match limit {
        Some(limit) => start.saturating_add(limit).min(total),
        None => total,
    };

    Ok(format!(
        "--- START OF FILE CONTENT FOR '{}' (Lines {}-{} of {}, Path: {}) ---\n{}\n--- END OF FILE CONTENT ---",
        file_name,
        start + 1,
        end,
        total,
        relative_path,
        lines[start..end].join("\n")
    ))
}
