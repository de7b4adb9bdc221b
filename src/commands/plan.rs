// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Plan command - previews which rows and columns a batch of edits would touch

use crate::config;
use crate::planner;
use crate::table::TrackerTable;
use anyhow::{Context, Result};
use chrono::Local;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Run the plan command
pub fn run(
    table_path: &Path,
    remove: &[String],
    swaps: &[(String, String)],
    add: &[String],
    output: Option<PathBuf>,
) -> Result<()> {
    let table = TrackerTable::load(table_path)
        .with_context(|| format!("Failed to load table from {}", table_path.display()))?;
    info!(rows = table.len(), "planning modifications");

    let swap_map: BTreeMap<String, String> = swaps.iter().cloned().collect();
    let plan = planner::identify_modifications(&table.rows, remove, &swap_map, add);

    if plan.is_empty() {
        println!("No trackers would be modified.");
        return Ok(());
    }

    println!("{} tracker(s) would be modified:", plan.len());
    for (id, columns) in &plan {
        let name = table.get(id).map(|row| row.name.as_str()).unwrap_or("?");
        println!(
            "  {id} ({name}): {}",
            columns.iter().cloned().collect::<Vec<_>>().join(", ")
        );
    }

    let output_dir = config::resolve_output_dir(output, Some(table_path));
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create directory {}", output_dir.display()))?;
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let plan_path = output_dir.join(format!("plan_{stamp}.json"));
    let json = serde_json::to_string_pretty(&plan).context("Failed to serialize plan")?;
    fs::write(&plan_path, json)
        .with_context(|| format!("Failed to write {}", plan_path.display()))?;
    println!("Plan written to {}", plan_path.display());

    Ok(())
}
