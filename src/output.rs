//! CLI output formatting for run results.
//!
//! # Output Format
//!
//! ```text
//! Files copied: 312   Files skipped: 14   Directory trees skipped: 2
//! Cache: 290 cached, 22 rendered (312 total)
//! Cache repair: 1 stale entry removed, 0 unreferenced files
//! Rotations: none 20 clockwise 1 anticlockwise 1 mirror_left_right 0 ...
//! Complete in 41.3s
//! ```
//!
//! With `--json` the [`RunSummary`] is printed as one JSON document instead.
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::run::{CacheRepair, RunSummary};

// ============================================================================
// Run summary
// ============================================================================

/// Format a run summary as display lines.
pub fn format_run_summary(summary: &RunSummary) -> Vec<String> {
    if summary.up_to_date {
        return vec![
            "Input unchanged since the last run, nothing to do".to_string(),
            format_elapsed(summary.elapsed_secs),
        ];
    }

    let mut lines = vec![format!(
        "Files copied: {}   Files skipped: {}   Directory trees skipped: {}",
        summary.copied, summary.skipped_files, summary.skipped_dirs
    )];

    if summary.failed > 0 {
        lines.push(format!("Files failed: {}", summary.failed));
    }
    if summary.output_refused {
        lines.push("Previous output kept: it contains files framefill did not write".to_string());
    }
    if summary.cache_enabled {
        lines.push(format!("Cache: {}", summary.cache));
    } else if summary.cache.fallbacks > 0 {
        lines.push(format!(
            "Copied unmodified: {}",
            summary.cache.fallbacks
        ));
    }
    if let Some(repair) = &summary.cache_repair {
        lines.push(format!("Cache repair: {}", format_repair(repair)));
    }
    if !summary.rotations.is_empty() {
        lines.push(format!("Rotations: {}", summary.rotations));
    }
    lines.push(format_elapsed(summary.elapsed_secs));
    lines
}

fn format_repair(repair: &CacheRepair) -> String {
    let mut text = format!(
        "{} stale {} removed, {} unreferenced {}",
        repair.removed_rows,
        plural(repair.removed_rows, "entry", "entries"),
        repair.unreferenced,
        plural(repair.unreferenced, "file", "files"),
    );
    if repair.pruned > 0 {
        text.push_str(&format!(" ({} deleted)", repair.pruned));
    }
    text
}

fn plural<'a>(n: usize, one: &'a str, many: &'a str) -> &'a str {
    if n == 1 { one } else { many }
}

fn format_elapsed(secs: f64) -> String {
    format!("Complete in {secs:.1}s")
}

/// Print a run summary to stdout.
pub fn print_run_summary(summary: &RunSummary) {
    for line in format_run_summary(summary) {
        println!("{}", line);
    }
}

/// Print a run summary as pretty JSON to stdout.
pub fn print_run_summary_json(summary: &RunSummary) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(summary)?);
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
