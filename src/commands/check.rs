// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Check-json command - scans the JSON-bearing columns for malformed cells

use crate::config;
use crate::jsonscan;
use crate::table::TrackerTable;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};

/// Run the check-json command
pub fn run(table_path: &Path, output: Option<PathBuf>) -> Result<()> {
    let table = TrackerTable::load(table_path)
        .with_context(|| format!("Failed to load table from {}", table_path.display()))?;

    let issues = jsonscan::scan(&table.rows);
    if issues.is_empty() {
        println!("No malformed JSON found in 'Filters' or 'Formatting' columns.");
        return Ok(());
    }

    let output_dir = config::resolve_output_dir(output, Some(table_path));
    let written = jsonscan::write_reports(&output_dir, &table.rows, &issues)?;

    eprintln!(
        "{}",
        format!("Warning: {} malformed JSON cell(s) found.", issues.len()).yellow()
    );
    for issue in &issues {
        println!("  {} [{}]: {}", issue.id, issue.column, issue.error);
        println!("    {}", issue.snippet);
    }
    if let Some((rows_path, details_path)) = written {
        println!("Offending rows written to {}", rows_path.display());
        println!("Details written to {}", details_path.display());
    }

    Ok(())
}
