// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Malformed-JSON pre-scan over the `Filters` and `Formatting` columns, with
//! an error-context snippet pointing at the offending character

use crate::types::{TrackerRow, COL_FILTERS, COL_FORMATTING};
use anyhow::{Context, Result};
use chrono::Local;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// How many characters of context to show on each side of the error position
const CONTEXT_WINDOW: usize = 30;

/// One malformed JSON cell
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct JsonIssue {
    /// Tracker identifier of the offending row
    pub id: String,
    /// Tracker display name
    pub name: String,
    /// Base object type
    pub object_name: String,
    /// Which column held the malformed text
    pub column: String,
    /// The parser's error message
    pub error: String,
    /// Text around the error position with the offending character marked
    pub snippet: String,
    /// The full problematic cell value
    pub value: String,
}

/// Scan the JSON-bearing columns of every row.
///
/// Empty cells and the literals `null`, `nan`, and `[]` are fine; anything
/// else must parse as JSON. The `nan` literal shows up in exports produced by
/// spreadsheet tooling and is treated as an empty cell rather than an error.
#[must_use]
pub fn scan(rows: &[TrackerRow]) -> Vec<JsonIssue> {
    let mut issues = Vec::new();
    for row in rows {
        for column in [COL_FILTERS, COL_FORMATTING] {
            let Some(raw) = row.column(column) else {
                continue;
            };
            let trimmed = raw.trim();
            if trimmed.is_empty()
                || trimmed.eq_ignore_ascii_case("null")
                || trimmed.eq_ignore_ascii_case("nan")
                || trimmed == "[]"
            {
                continue;
            }
            if let Err(error) = serde_json::from_str::<Value>(raw) {
                issues.push(JsonIssue {
                    id: row.id.clone(),
                    name: row.name.clone(),
                    object_name: row.object_name.clone(),
                    column: column.to_string(),
                    snippet: context_snippet(raw, error_offset(raw, &error)),
                    error: error.to_string(),
                    value: raw.to_string(),
                });
            }
        }
    }
    issues
}

/// Character offset of a parse error, derived from its line/column pair
fn error_offset(text: &str, error: &serde_json::Error) -> usize {
    let line = error.line().max(1);
    let column = error.column().max(1);
    let mut offset = 0usize;
    for (index, candidate) in text.split('\n').enumerate() {
        if index + 1 == line {
            return offset + (column - 1).min(candidate.chars().count());
        }
        offset += candidate.chars().count() + 1;
    }
    text.chars().count()
}

/// Text around `position` with the character there highlighted, or an
/// end-of-string marker when the parser ran off the end
fn context_snippet(text: &str, position: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    let start = position.saturating_sub(CONTEXT_WINDOW);
    let end = (position + CONTEXT_WINDOW).min(chars.len());

    let mut snippet = if position < chars.len() {
        let before: String = chars[start..position].iter().collect();
        let after: String = chars[position + 1..end].iter().collect();
        format!("{before} >>>>{}<<<< {after}", chars[position])
    } else {
        let before: String = chars[start..end].iter().collect();
        format!("{before} >>>>[END_OF_STRING]<<<< ")
    };

    if start > 0 {
        snippet = format!("...{snippet}");
    }
    if end < chars.len() {
        snippet.push_str("...");
    }
    snippet
}

/// Write the timestamped pair of scan reports: the full offending rows and
/// the per-cell detail. Returns the two paths (rows, details). No files are
/// written when the scan is clean.
pub fn write_reports(
    output_dir: &Path,
    rows: &[TrackerRow],
    issues: &[JsonIssue],
) -> Result<Option<(PathBuf, PathBuf)>> {
    if issues.is_empty() {
        return Ok(None);
    }
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create directory {}", output_dir.display()))?;
    let stamp = Local::now().format("%Y%m%d%H%M%S");

    let offenders: Vec<&TrackerRow> = rows
        .iter()
        .filter(|row| issues.iter().any(|issue| issue.id == row.id))
        .collect();

    let rows_path = output_dir.join(format!("malformed_json_trackers_{stamp}.json"));
    let rows_json =
        serde_json::to_string_pretty(&offenders).context("Failed to serialize offending rows")?;
    fs::write(&rows_path, rows_json)
        .with_context(|| format!("Failed to write {}", rows_path.display()))?;

    let details_path = output_dir.join(format!("malformed_json_details_{stamp}.json"));
    let details_json =
        serde_json::to_string_pretty(issues).context("Failed to serialize issue details")?;
    fs::write(&details_path, details_json)
        .with_context(|| format!("Failed to write {}", details_path.display()))?;

    Ok(Some((rows_path, details_path)))
}
