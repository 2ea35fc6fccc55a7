// ABOUTME: Path confinement for the file tools
// ABOUTME: Resolves model-supplied relative paths and rejects anything escaping the root

use crate::error::{Result, ToolError};
use std::path::{Component, Path, PathBuf};

/// Resolve `user_path` against `root`, refusing absolute paths, paths that
/// climb above the root, and paths whose existing part resolves outside the
/// root through a symlink.
///
/// `root` is expected to be canonical (see [`crate::Workspace::new`]). No
/// file content is touched here; only metadata of existing ancestors.
pub fn resolve_within(root: &Path, user_path: &str) -> Result<PathBuf> {
    let unsafe_path = || ToolError::UnsafePath(user_path.to_string());

    if user_path.trim().is_empty() || user_path.contains('\0') {
        return Err(unsafe_path());
    }

    let candidate = Path::new(user_path);
    if candidate.is_absolute() {
        return Err(unsafe_path());
    }

    let mut normalized = PathBuf::new();
    for component in candidate.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return Err(unsafe_path());
                }
            }
            Component::RootDir | Component::Prefix(_) => return Err(unsafe_path()),
        }
    }

    let full = root.join(&normalized);

    // The deepest existing ancestor decides where symlinks actually lead.
    let existing = full
        .ancestors()
        .find(|p| p.symlink_metadata().is_ok())
        .unwrap_or(root);
    let canonical = existing.canonicalize().map_err(|_| unsafe_path())?;
    if !canonical.starts_with(root) {
        return Err(unsafe_path());
    }

    if existing == full.as_path() {
        Ok(canonical)
    } else {
        let remainder = full.strip_prefix(existing).map_err(|_| unsafe_path())?;
        Ok(canonical.join(remainder))
    }
}

/// Render `path` relative to `root` with `/` separators.
pub fn display_relative(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}
