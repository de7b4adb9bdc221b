// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Audit command - reports where canonical field names appear across a table

use crate::audit::{master_audit, AuditOutcome};
use crate::config;
use crate::table::TrackerTable;
use anyhow::{Context, Result};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Run the audit command
pub fn run(
    table_path: &Path,
    fields: &[String],
    detailed: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let table = TrackerTable::load(table_path)
        .with_context(|| format!("Failed to load table from {}", table_path.display()))?;
    info!(rows = table.len(), fields = fields.len(), "auditing table");

    match master_audit(&table.rows, fields, detailed) {
        AuditOutcome::Ids(ids) => {
            if ids.is_empty() {
                println!("No trackers reference the audited fields.");
            } else {
                println!("{} tracker(s) reference the audited fields:", ids.len());
                for id in ids {
                    println!("  {id}");
                }
            }
        }
        AuditOutcome::Report(report) => {
            let output_dir = config::resolve_output_dir(output, Some(table_path));
            fs::create_dir_all(&output_dir).with_context(|| {
                format!("Failed to create directory {}", output_dir.display())
            })?;
            let stamp = Local::now().format("%Y%m%d_%H%M%S");
            let report_path = output_dir.join(format!("audit_report_{stamp}.json"));
            let json = serde_json::to_string_pretty(&report)
                .context("Failed to serialize audit report")?;
            fs::write(&report_path, json)
                .with_context(|| format!("Failed to write {}", report_path.display()))?;

            println!("{} tracker(s) reference the audited fields.", report.len());
            for entry in &report {
                println!("  {} ({})", entry.id, entry.name);
                for finding in &entry.findings {
                    println!(
                        "    {} as {} in: {}",
                        finding.canonical,
                        finding.path,
                        finding.columns.join(", ")
                    );
                }
            }
            println!("Detailed report written to {}", report_path.display());
        }
    }

    Ok(())
}
