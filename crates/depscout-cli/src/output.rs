// ABOUTME: Renders batch results for the terminal
// ABOUTME: JSON array of records (null when unresolved) or a coloured per-file report

use anyhow::Result;
use colored::Colorize;
use depscout_agent::{BatchSummary, FileResolution, SessionOutcome};
use depscout_core::DependencyRecord;
use std::fmt::Write;

/// One entry per input file, `null` for files without a record
pub fn render_json(resolutions: &[FileResolution]) -> Result<String> {
    let records: Vec<Option<&DependencyRecord>> =
        resolutions.iter().map(FileResolution::record).collect();
    Ok(serde_json::to_string_pretty(&records)?)
}

pub fn render_pretty(resolutions: &[FileResolution]) -> String {
    let mut out = String::new();
    for resolution in resolutions {
        let stats = format!(
            "[{} turns, {} tool calls, {}ms]",
            resolution.turns, resolution.tool_calls, resolution.duration_ms
        );
        match &resolution.outcome {
            SessionOutcome::Resolved(record) => {
                let _ = writeln!(
                    out,
                    "{} {}  {} ({})  {}",
                    "✓".green().bold(),
                    resolution.target_file.bold(),
                    record.name.cyan(),
                    record.type_of_file,
                    stats.dimmed()
                );
                let _ = writeln!(out, "    internal: {}", list_or_dash(&record.internal_deps));
                let _ = writeln!(out, "    external: {}", list_or_dash(&record.external_deps));
            }
            SessionOutcome::Unresolved(reason) => {
                let _ = writeln!(
                    out,
                    "{} {}  unresolved: {}  {}",
                    "?".yellow().bold(),
                    resolution.target_file.bold(),
                    reason,
                    stats.dimmed()
                );
            }
            SessionOutcome::Failed(error) => {
                let _ = writeln!(
                    out,
                    "{} {}  failed: {}  {}",
                    "✗".red().bold(),
                    resolution.target_file.bold(),
                    error,
                    stats.dimmed()
                );
            }
        }
    }

    let summary = BatchSummary::from_resolutions(resolutions);
    let _ = writeln!(out, "\n{}", summary.to_string().bold());
    out
}

fn list_or_dash(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}
