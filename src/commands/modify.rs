// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Modify command - applies remove / swap / add operations to selected
//! trackers and writes the edited rows alongside a pristine backup

use crate::config;
use crate::engine::{self, RemovalInstructions};
use crate::jsonscan;
use crate::planner;
use crate::table::{self, TrackerTable};
use anyhow::{bail, Context, Result};
use owo_colors::OwoColorize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Run the modify command
#[allow(clippy::too_many_arguments)]
pub fn run(
    table_path: &Path,
    rows: &[String],
    remove: Vec<String>,
    swaps: &[(String, String)],
    swap_file: Option<&Path>,
    plan_file: Option<&Path>,
    add: &[String],
    output: Option<PathBuf>,
) -> Result<()> {
    let table = TrackerTable::load(table_path)
        .with_context(|| format!("Failed to load table from {}", table_path.display()))?;
    let output_dir = config::resolve_output_dir(output, Some(table_path));

    // Pre-scan: malformed JSON columns are reported up front and left
    // untouched by the edit.
    let issues = jsonscan::scan(&table.rows);
    if let Some((rows_path, _)) =
        jsonscan::write_reports(&output_dir, &table.rows, &issues)?
    {
        eprintln!(
            "{}",
            format!(
                "Warning: {} malformed JSON cell(s) found; see {}",
                issues.len(),
                rows_path.display()
            )
            .yellow()
        );
    }

    let mut swap_map: BTreeMap<String, String> = swaps.iter().cloned().collect();
    if let Some(path) = swap_file {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let from_file: BTreeMap<String, String> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        swap_map.extend(from_file);
    }

    let removals = match plan_file {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let per_tracker: BTreeMap<String, Vec<String>> = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            RemovalInstructions::PerTracker(per_tracker)
        }
        None => RemovalInstructions::Uniform(remove.clone()),
    };

    if removals.is_empty() && swap_map.is_empty() && add.is_empty() {
        bail!("Nothing to do: specify --remove, --swap, --swap-file, --plan, or --add");
    }

    // Without an explicit row selection, edit the rows the planner says the
    // batch would actually touch.
    let selected_ids: Vec<String> = if rows.is_empty() {
        let canonical_removals = match &removals {
            RemovalInstructions::Uniform(refs) => refs.clone(),
            RemovalInstructions::PerTracker(map) => {
                map.values().flatten().cloned().collect()
            }
        };
        planner::identify_modifications(&table.rows, &canonical_removals, &swap_map, add)
            .into_keys()
            .collect()
    } else {
        rows.to_vec()
    };

    if selected_ids.is_empty() {
        println!("No trackers match the requested operations.");
        return Ok(());
    }
    for id in &selected_ids {
        if table.get(id).is_none() {
            bail!("Tracker '{id}' not found in {}", table_path.display());
        }
    }
    info!(selected = selected_ids.len(), "modifying trackers");

    let outcome = engine::modify_trackers(&table, &selected_ids, &removals, &swap_map, add);
    let (modified_path, backup_path) =
        table::write_artifacts(&output_dir, &outcome.modified, &outcome.backup)?;

    println!(
        "{} {} tracker(s)",
        "Modified".green(),
        outcome.modified.len()
    );
    println!("  edited rows: {}", modified_path.display());
    println!("  backup:      {}", backup_path.display());

    Ok(())
}
