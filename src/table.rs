// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Tracker table persistence - loads and validates the JSON row-array export,
//! saves edited copies, and writes the timestamped modify artifacts

use crate::types::{TrackerRow, REQUIRED_COLUMNS};
use anyhow::{Context, Result};
use chrono::Local;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Validation failure while loading a table file
#[derive(Debug, Error)]
pub enum TableError {
    /// One or more rows were missing required columns; every offender is
    /// reported in one pass so the export can be fixed wholesale
    #[error("missing required columns: {}", .0.join("; "))]
    MissingColumns(Vec<String>),
    /// The file's top level was not an array of objects
    #[error("expected a JSON array of row objects, found {0}")]
    NotARowArray(String),
}

/// An in-memory tracker export
#[derive(Debug, Clone, Default)]
pub struct TrackerTable {
    /// Rows in file order
    pub rows: Vec<TrackerRow>,
}

impl TrackerTable {
    /// Load a table from a JSON row-array file.
    ///
    /// Every row must carry all required columns; missing ones are collected
    /// across the whole file and reported together. Non-string cell values
    /// (numbers, booleans, null) are normalized to their string forms, since
    /// exports are not consistent about quoting.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let parsed: Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        let Value::Array(raw_rows) = parsed else {
            return Err(TableError::NotARowArray(json_kind(&parsed).to_string()).into());
        };

        let mut missing: Vec<String> = Vec::new();
        let mut rows = Vec::with_capacity(raw_rows.len());
        for (index, raw) in raw_rows.into_iter().enumerate() {
            let Value::Object(object) = raw else {
                missing.push(format!("row {index}: not an object"));
                continue;
            };
            let absent: Vec<&str> = REQUIRED_COLUMNS
                .iter()
                .filter(|col| !object.contains_key(**col))
                .copied()
                .collect();
            if !absent.is_empty() {
                missing.push(format!("row {index}: {}", absent.join(", ")));
                continue;
            }
            let normalized: serde_json::Map<String, Value> = object
                .into_iter()
                .map(|(key, value)| (key, Value::String(stringify_cell(&value))))
                .collect();
            let row: TrackerRow = serde_json::from_value(Value::Object(normalized))
                .with_context(|| format!("Failed to decode row {index}"))?;
            rows.push(row);
        }

        if !missing.is_empty() {
            return Err(TableError::MissingColumns(missing).into());
        }
        Ok(Self { rows })
    }

    /// Save the table as a pretty-printed JSON row array
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        let json =
            serde_json::to_string_pretty(&self.rows).context("Failed to serialize table")?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Look up a row by tracker id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&TrackerRow> {
        self.rows.iter().find(|row| row.id == id)
    }

    /// Number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Normalize a raw cell to its column text
fn stringify_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Write the edited rows and their pristine backups as a timestamped pair of
/// files in `output_dir`, returning the two paths (modified, backup)
pub fn write_artifacts(
    output_dir: &Path,
    modified: &[TrackerRow],
    backup: &[TrackerRow],
) -> Result<(PathBuf, PathBuf)> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create directory {}", output_dir.display()))?;
    let stamp = Local::now().format("%Y%m%d_%H%M%S");

    let modified_path = output_dir.join(format!("modified_{stamp}.json"));
    let backup_path = output_dir.join(format!("backup_{stamp}.json"));

    let modified_json =
        serde_json::to_string_pretty(modified).context("Failed to serialize modified rows")?;
    fs::write(&modified_path, modified_json)
        .with_context(|| format!("Failed to write {}", modified_path.display()))?;

    let backup_json =
        serde_json::to_string_pretty(backup).context("Failed to serialize backup rows")?;
    fs::write(&backup_path, backup_json)
        .with_context(|| format!("Failed to write {}", backup_path.display()))?;

    Ok((modified_path, backup_path))
}
