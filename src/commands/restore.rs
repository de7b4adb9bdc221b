// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Restore command - rebuilds a tracker's row from its change history

use crate::config;
use crate::history;
use crate::table::TrackerTable;
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Run the restore command
pub fn run(
    table_path: &Path,
    history_path: &Path,
    tracker: &str,
    to: Option<&str>,
    list: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let table = TrackerTable::load(table_path)
        .with_context(|| format!("Failed to load table from {}", table_path.display()))?;
    let events = history::load_history(history_path)
        .with_context(|| format!("Failed to load history from {}", history_path.display()))?;
    info!(events = events.len(), "loaded change history");

    if list {
        let options = history::state_options(&events, tracker);
        if options.is_empty() {
            println!("No restorable states found for tracker '{tracker}'.");
            return Ok(());
        }
        println!("Restorable states for '{tracker}' (most recent first):");
        for option in options {
            println!(
                "  {} - {} change(s) to: {}",
                option.restore_to,
                option.changes.len(),
                option.fields_changed.join(", ")
            );
        }
        return Ok(());
    }

    let Some(to) = to else {
        bail!("Specify --to <timestamp> to restore, or --list to see the options");
    };
    let Some(restore_to) = history::parse_timestamp(to) else {
        bail!("Unable to parse restore timestamp '{to}'");
    };

    let result = history::restore_tracker_state(&table, &events, tracker, restore_to)?;
    let output_dir = config::resolve_output_dir(output, Some(table_path));
    let (summary_path, row_path) = history::write_restore_report(&result, &output_dir)?;

    println!(
        "Restored '{}' to {} ({} change(s) replayed, {} skipped)",
        result.tracker,
        result.restore_to,
        result.applied.len(),
        result.skipped.len()
    );
    for diff in &result.delta {
        println!("  {}: changed", diff.column);
    }
    println!("Summary written to {}", summary_path.display());
    println!("Restored row written to {}", row_path.display());

    Ok(())
}
