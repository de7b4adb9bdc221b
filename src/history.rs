// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Change-history restore - replays a tracker's audit-trail events backwards
//! to rebuild the row as it stood at a chosen point in time

use crate::table::TrackerTable;
use crate::types::TrackerRow;
use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Map-style columns are excluded from restore; their history entries are
/// noisy auto-saves rather than deliberate edits
const IGNORED_FIELDS: [&str; 2] = ["label map", "resize map"];

/// Validation failure while loading a history export
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Rows missing required history columns, all reported in one pass
    #[error("history file missing required columns: {}", .0.join("; "))]
    MissingColumns(Vec<String>),
}

/// One audit-trail event: a single column of a tracker changed value
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEvent {
    /// Tracker display name the event belongs to
    pub tracker: String,
    /// Tracker identifier
    pub tracker_id: String,
    /// Column header the change applies to, when the export carried one
    pub field: Option<String>,
    /// Value before the change
    pub old_value: String,
    /// Value after the change
    pub new_value: String,
    /// Who made the change, when recorded
    pub modified_by: Option<String>,
    /// When the change was recorded; `None` when the timestamp was unparseable
    pub recorded_at: Option<NaiveDateTime>,
}

/// One restorable point in time: every event sharing a timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct StateOption {
    /// Tracker display name
    pub tracker: String,
    /// Tracker identifier
    pub tracker_id: String,
    /// The shared timestamp
    pub restore_to: NaiveDateTime,
    /// Column headers changed at this timestamp, first-seen order
    pub fields_changed: Vec<String>,
    /// The underlying events
    pub changes: Vec<HistoryEvent>,
}

/// One history event that was replayed onto the working row
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedChange {
    /// Column header restored
    pub field: String,
    /// When the change was recorded
    pub recorded_at: NaiveDateTime,
    /// Who made the change
    pub modified_by: Option<String>,
    /// Value the column held before this replay step
    pub current_value: String,
    /// The event's post-change value, kept for the report
    pub history_new_value: String,
    /// Value written back (the event's pre-change value)
    pub restored_value: String,
}

/// One column that differs between the current row and the restored snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaEntry {
    /// Column header
    pub column: String,
    /// Current value
    pub before: String,
    /// Restored value
    pub after: String,
}

/// Outcome of a restore: the rebuilt row plus the full accounting of what
/// was replayed, what was skipped, and how the snapshot differs
#[derive(Debug, Clone)]
pub struct RestoreResult {
    /// Tracker display name
    pub tracker: String,
    /// Tracker identifier
    pub tracker_id: String,
    /// The target point in time
    pub restore_to: NaiveDateTime,
    /// The row as it stands in the current table
    pub before_row: TrackerRow,
    /// The row rebuilt as of `restore_to`
    pub restored_row: TrackerRow,
    /// Events replayed, most recent first
    pub applied: Vec<AppliedChange>,
    /// Events that could not be replayed, with reasons
    pub skipped: Vec<String>,
    /// Column-level difference between current and restored
    pub delta: Vec<DeltaEntry>,
}

/// Load a history export from a JSON row-array file.
///
/// Header synonyms are accepted per cell: `Tracker` or `Tracker Name`,
/// `id Tracker` or `Tracker Name Id`, `Field` or `API Field`, and
/// `Modified By` or `Last Modified By Name`. Rows missing the required
/// columns fail the load as a batch.
pub fn load_history(path: &Path) -> Result<Vec<HistoryEvent>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let parsed: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    let Value::Array(raw_rows) = parsed else {
        bail!("expected a JSON array of history rows in {}", path.display());
    };

    let mut missing: Vec<String> = Vec::new();
    let mut events = Vec::with_capacity(raw_rows.len());
    for (index, raw) in raw_rows.iter().enumerate() {
        let Some(object) = raw.as_object() else {
            missing.push(format!("row {index}: not an object"));
            continue;
        };
        let cell = |names: &[&str]| -> Option<String> {
            names
                .iter()
                .find_map(|name| object.get(*name))
                .map(cell_text)
        };

        let mut absent = Vec::new();
        let tracker = cell(&["Tracker", "Tracker Name"]);
        if tracker.is_none() {
            absent.push("Tracker");
        }
        let tracker_id = cell(&["id Tracker", "Tracker Name Id"]);
        if tracker_id.is_none() {
            absent.push("id Tracker");
        }
        let modify_date = cell(&["Modify Date"]);
        if modify_date.is_none() {
            absent.push("Modify Date");
        }
        let old_value = cell(&["Old Value"]);
        if old_value.is_none() {
            absent.push("Old Value");
        }
        let new_value = cell(&["New Value"]);
        if new_value.is_none() {
            absent.push("New Value");
        }
        if !absent.is_empty() {
            missing.push(format!("row {index}: {}", absent.join(", ")));
            continue;
        }

        let field = cell(&["Field", "API Field"]).filter(|f| !f.trim().is_empty());
        events.push(HistoryEvent {
            tracker: tracker.unwrap_or_default().trim().to_string(),
            tracker_id: tracker_id.unwrap_or_default().trim().to_string(),
            field: field.map(|f| f.trim().to_string()),
            old_value: old_value.unwrap_or_default(),
            new_value: new_value.unwrap_or_default(),
            modified_by: cell(&["Modified By", "Last Modified By Name"])
                .filter(|m| !m.trim().is_empty()),
            recorded_at: modify_date.as_deref().and_then(parse_timestamp),
        });
    }

    if !missing.is_empty() {
        return Err(HistoryError::MissingColumns(missing).into());
    }
    Ok(events)
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parse an export timestamp. Day-first forms are tried before ISO ones,
/// matching the locale the exports come from.
#[must_use]
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    const DATETIME_FORMATS: [&str; 6] = [
        "%d/%m/%Y %H:%M:%S",
        "%d/%m/%Y %H:%M",
        "%d-%m-%Y %H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];
    for format in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(ts);
        }
    }
    const DATE_FORMATS: [&str; 3] = ["%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d"];
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

fn is_ignored_field(field: Option<&str>) -> bool {
    field.is_some_and(|f| IGNORED_FIELDS.contains(&f.trim().to_lowercase().as_str()))
}

/// Distinct tracker names present in a history export, sorted
#[must_use]
pub fn tracker_names(events: &[HistoryEvent]) -> Vec<String> {
    let names: BTreeSet<String> = events
        .iter()
        .map(|e| e.tracker.clone())
        .filter(|n| !n.is_empty())
        .collect();
    names.into_iter().collect()
}

/// The restorable points in time for one tracker, most recent first.
///
/// Events with unparseable timestamps or ignored fields do not contribute.
#[must_use]
pub fn state_options(events: &[HistoryEvent], tracker: &str) -> Vec<StateOption> {
    let tracker = tracker.trim();
    let relevant: Vec<&HistoryEvent> = events
        .iter()
        .filter(|e| e.tracker == tracker)
        .filter(|e| e.recorded_at.is_some())
        .filter(|e| !is_ignored_field(e.field.as_deref()))
        .collect();

    let mut timestamps: Vec<NaiveDateTime> =
        relevant.iter().filter_map(|e| e.recorded_at).collect();
    timestamps.sort_unstable();
    timestamps.dedup();
    timestamps.reverse();

    timestamps
        .into_iter()
        .map(|ts| {
            let changes: Vec<HistoryEvent> = relevant
                .iter()
                .filter(|e| e.recorded_at == Some(ts))
                .map(|e| (*e).clone())
                .collect();
            let mut fields_changed: Vec<String> = Vec::new();
            for change in &changes {
                let name = change
                    .field
                    .clone()
                    .unwrap_or_else(|| "Unknown field".to_string());
                if !fields_changed.contains(&name) {
                    fields_changed.push(name);
                }
            }
            StateOption {
                tracker: tracker.to_string(),
                tracker_id: changes
                    .first()
                    .map(|c| c.tracker_id.clone())
                    .unwrap_or_default(),
                restore_to: ts,
                fields_changed,
                changes,
            }
        })
        .collect()
}

/// Rebuild a tracker's row as it stood at `restore_to`.
///
/// Every event recorded at or after the target time is undone by writing its
/// pre-change value back, most recent first, so older events win. The table
/// itself is not modified; the caller decides what to do with the snapshot.
pub fn restore_tracker_state(
    table: &TrackerTable,
    events: &[HistoryEvent],
    tracker: &str,
    restore_to: NaiveDateTime,
) -> Result<RestoreResult> {
    let tracker = tracker.trim();
    if tracker.is_empty() {
        bail!("A tracker name must be provided for restore operations");
    }
    let before_row = table
        .rows
        .iter()
        .find(|row| row.name.trim() == tracker)
        .cloned()
        .with_context(|| format!("Tracker '{tracker}' not found in current dataset"))?;

    let mut relevant: Vec<&HistoryEvent> = events
        .iter()
        .filter(|e| e.tracker == tracker)
        .filter(|e| e.recorded_at.is_some_and(|ts| ts >= restore_to))
        .filter(|e| !is_ignored_field(e.field.as_deref()))
        .collect();
    relevant.sort_by_key(|e| std::cmp::Reverse(e.recorded_at));

    let mut working_row = before_row.clone();
    let mut applied = Vec::new();
    let mut skipped = Vec::new();

    for event in relevant {
        let Some(field) = event.field.as_deref() else {
            skipped.push("Missing field column in history row".to_string());
            continue;
        };
        let Some(current) = working_row.column(field).map(str::to_string) else {
            skipped.push(format!("Field '{field}' not present in tracker dataset"));
            continue;
        };
        if !working_row.set_column(field, event.old_value.clone()) {
            skipped.push(format!("Field '{field}' not present in tracker dataset"));
            continue;
        }
        applied.push(AppliedChange {
            field: field.to_string(),
            recorded_at: event.recorded_at.unwrap_or(restore_to),
            modified_by: event.modified_by.clone(),
            current_value: current,
            history_new_value: event.new_value.clone(),
            restored_value: event.old_value.clone(),
        });
    }

    let delta = row_delta(&before_row, &working_row);

    Ok(RestoreResult {
        tracker: tracker.to_string(),
        tracker_id: before_row.id.clone(),
        restore_to,
        before_row,
        restored_row: working_row,
        applied,
        skipped,
        delta,
    })
}

fn row_delta(before: &TrackerRow, after: &TrackerRow) -> Vec<DeltaEntry> {
    before
        .headers()
        .into_iter()
        .filter_map(|header| {
            let before_val = before.column(&header).unwrap_or_default();
            let after_val = after.column(&header).unwrap_or_default();
            (before_val != after_val).then(|| DeltaEntry {
                column: header,
                before: before_val.to_string(),
                after: after_val.to_string(),
            })
        })
        .collect()
}

fn format_value(value: &str) -> &str {
    if value.is_empty() {
        "(empty)"
    } else {
        value
    }
}

/// Write the restore report pair: a human-readable summary and the restored
/// row as JSON. Returns the two paths (summary, row).
pub fn write_restore_report(
    result: &RestoreResult,
    output_dir: &Path,
) -> Result<(PathBuf, PathBuf)> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create directory {}", output_dir.display()))?;
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let label = if result.tracker.is_empty() {
        result.tracker_id.clone()
    } else {
        result.tracker.clone()
    };
    let prefix = format!("restore_{label}_{stamp}");

    let fields_touched: BTreeSet<&str> =
        result.applied.iter().map(|c| c.field.as_str()).collect();
    let mut lines = vec![
        format!("Tracker: {}", result.tracker),
        format!("Tracker ID: {}", result.tracker_id),
        format!("Restore to: {}", result.restore_to),
        format!("History rows applied: {}", result.applied.len()),
        format!(
            "Fields touched: {}",
            if fields_touched.is_empty() {
                "None".to_string()
            } else {
                fields_touched.into_iter().collect::<Vec<_>>().join(", ")
            }
        ),
        String::new(),
        "Applied changes (most recent first):".to_string(),
    ];
    if result.applied.is_empty() {
        lines.push("- None (target time is at or after last change)".to_string());
    } else {
        for change in &result.applied {
            lines.push(format!(
                "- {}: {} -> {} (recorded at {}, by {})",
                change.field,
                format_value(&change.current_value),
                format_value(&change.restored_value),
                change.recorded_at,
                change.modified_by.as_deref().unwrap_or("unknown"),
            ));
        }
    }

    if result.delta.is_empty() {
        lines.push(String::new());
        lines.push("No differences between current row and restored snapshot.".to_string());
    } else {
        lines.push(String::new());
        lines.push("Before vs. restored snapshot:".to_string());
        for diff in &result.delta {
            lines.push(format!(
                "* {}: '{}' -> '{}'",
                diff.column,
                format_value(&diff.before),
                format_value(&diff.after)
            ));
        }
    }

    if !result.skipped.is_empty() {
        lines.push(String::new());
        lines.push("Skipped history rows:".to_string());
        for reason in &result.skipped {
            lines.push(format!("- {reason}"));
        }
    }

    let summary_path = output_dir.join(format!("{prefix}_summary.txt"));
    fs::write(&summary_path, lines.join("\n"))
        .with_context(|| format!("Failed to write {}", summary_path.display()))?;

    let row_path = output_dir.join(format!("{prefix}_restored_row.json"));
    let row_json = serde_json::to_string_pretty(&result.restored_row)
        .context("Failed to serialize restored row")?;
    fs::write(&row_path, row_json)
        .with_context(|| format!("Failed to write {}", row_path.display()))?;

    Ok((summary_path, row_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(text: &str) -> NaiveDateTime {
        parse_timestamp(text).expect("fixture timestamp")
    }

    fn event(tracker: &str, field: &str, old: &str, new: &str, when: &str) -> HistoryEvent {
        HistoryEvent {
            tracker: tracker.into(),
            tracker_id: "t1".into(),
            field: Some(field.into()),
            old_value: old.into(),
            new_value: new.into(),
            modified_by: Some("alex".into()),
            recorded_at: Some(ts(when)),
        }
    }

    fn table_with(name: &str, fields: &str) -> TrackerTable {
        TrackerTable {
            rows: vec![TrackerRow {
                id: "t1".into(),
                name: name.into(),
                fields: fields.into(),
                ..Default::default()
            }],
        }
    }

    #[test]
    fn timestamps_parse_dayfirst_and_iso() {
        assert_eq!(
            parse_timestamp("25/12/2024 13:45:00"),
            NaiveDate::from_ymd_opt(2024, 12, 25).and_then(|d| d.and_hms_opt(13, 45, 0))
        );
        assert_eq!(
            parse_timestamp("2024-12-25 13:45:00"),
            parse_timestamp("25/12/2024 13:45:00")
        );
        assert_eq!(
            parse_timestamp("25/12/2024"),
            NaiveDate::from_ymd_opt(2024, 12, 25).and_then(|d| d.and_hms_opt(0, 0, 0))
        );
        assert!(parse_timestamp("not a date").is_none());
    }

    #[test]
    fn state_options_group_by_timestamp_newest_first() {
        let events = vec![
            event("Alpha", "Fields", "A__c", "A__c,B__c", "01/01/2024 10:00:00"),
            event("Alpha", "Query", "old q", "new q", "01/01/2024 10:00:00"),
            event("Alpha", "Fields", "A__c,B__c", "A__c", "02/01/2024 09:00:00"),
            event("Beta", "Fields", "x", "y", "03/01/2024 09:00:00"),
        ];
        let options = state_options(&events, "Alpha");
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].restore_to, ts("02/01/2024 09:00:00"));
        assert_eq!(options[1].fields_changed, vec!["Fields", "Query"]);
    }

    #[test]
    fn ignored_map_fields_excluded_from_options() {
        let events = vec![
            event("Alpha", "Label Map", "a", "b", "01/01/2024 10:00:00"),
            event("Alpha", "Resize Map", "a", "b", "01/01/2024 10:00:00"),
        ];
        assert!(state_options(&events, "Alpha").is_empty());
    }

    #[test]
    fn restore_replays_old_values_newest_first() {
        // Two edits to Fields after the target time; the older one must win
        // so the row lands on its oldest known pre-change value.
        let table = table_with("Alpha", "A__c");
        let events = vec![
            event("Alpha", "Fields", "A__c,B__c,C__c", "A__c,B__c", "02/01/2024 09:00:00"),
            event("Alpha", "Fields", "A__c,B__c", "A__c", "03/01/2024 09:00:00"),
        ];
        let result =
            restore_tracker_state(&table, &events, "Alpha", ts("01/01/2024 00:00:00"))
                .expect("restore");
        assert_eq!(result.restored_row.fields, "A__c,B__c,C__c");
        assert_eq!(result.applied.len(), 2);
        assert_eq!(result.delta.len(), 1);
        assert_eq!(result.delta[0].column, "Fields");
        // The table row itself stays untouched.
        assert_eq!(table.rows[0].fields, "A__c");
    }

    #[test]
    fn events_before_target_are_not_replayed() {
        let table = table_with("Alpha", "A__c");
        let events = vec![event(
            "Alpha",
            "Fields",
            "A__c,B__c",
            "A__c",
            "01/01/2024 09:00:00",
        )];
        let result =
            restore_tracker_state(&table, &events, "Alpha", ts("02/01/2024 00:00:00"))
                .expect("restore");
        assert!(result.applied.is_empty());
        assert_eq!(result.restored_row, result.before_row);
    }

    #[test]
    fn unknown_field_is_skipped_with_reason() {
        let table = table_with("Alpha", "A__c");
        let events = vec![event(
            "Alpha",
            "No Such Column",
            "old",
            "new",
            "02/01/2024 09:00:00",
        )];
        let result =
            restore_tracker_state(&table, &events, "Alpha", ts("01/01/2024 00:00:00"))
                .expect("restore");
        assert!(result.applied.is_empty());
        assert_eq!(result.skipped.len(), 1);
        assert!(result.skipped[0].contains("No Such Column"));
    }

    #[test]
    fn missing_tracker_is_an_error() {
        let table = table_with("Alpha", "A__c");
        let err = restore_tracker_state(&table, &[], "Nope", ts("01/01/2024 00:00:00"))
            .expect_err("should fail");
        assert!(format!("{err:#}").contains("Nope"));
    }

    #[test]
    fn report_files_written() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let table = table_with("Alpha", "A__c");
        let events = vec![event("Alpha", "Fields", "A__c,B__c", "A__c", "02/01/2024 09:00:00")];
        let result =
            restore_tracker_state(&table, &events, "Alpha", ts("01/01/2024 00:00:00"))
                .expect("restore");
        let (summary, row) = write_restore_report(&result, dir.path()).expect("report");
        assert!(summary.exists());
        assert!(row.exists());
        let text = fs::read_to_string(summary).expect("read summary");
        assert!(text.contains("Tracker: Alpha"));
        assert!(text.contains("Fields"));
    }
}
