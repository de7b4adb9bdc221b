// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Read-only audit - reports where canonical field names appear across a
//! table, structurally in the filter definitions and textually everywhere else

use crate::filters;
use crate::locate;
use crate::types::{TrackerRow, COL_FILTERS, TEXT_COLUMNS};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Pseudo-column name reported for a structural hit inside the parsed filter
/// array, as opposed to a textual hit on the raw `Filters` column
pub const FILTERS_STRUCTURED: &str = "Filters (Structured)";

/// One contextual path found for an audited canonical field
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AuditFinding {
    /// The canonical field name that was audited
    pub canonical: String,
    /// The full contextual reference as it appears in the row
    pub path: String,
    /// Columns the path was found in, sorted and deduplicated
    pub columns: Vec<String>,
    /// Whether the path appears as a condition field in the filter definition
    pub in_filter_definition: bool,
}

/// Detailed audit entry for one matching row
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AuditReportRow {
    /// Tracker identifier
    pub id: String,
    /// Tracker display name
    pub name: String,
    /// Owner identifier
    pub owner_id: String,
    /// Base object type
    pub object_name: String,
    /// Every contextual path found, sorted by canonical then path
    pub findings: Vec<AuditFinding>,
}

/// Result of an audit run: either the matching tracker ids, or the full
/// per-path breakdown when a detailed report was requested
#[derive(Debug, Clone, PartialEq)]
pub enum AuditOutcome {
    /// Ids of rows where at least one audited field was found
    Ids(Vec<String>),
    /// One entry per matching row with the per-path detail
    Report(Vec<AuditReportRow>),
}

/// Audit `rows` for the given canonical field names.
///
/// A structural match is a filter condition whose `field` equals the
/// canonical name or ends with `"." + canonical`; it is reported under the
/// [`FILTERS_STRUCTURED`] pseudo-column. Textual matches come from the
/// contextual scan over every text column; a path already found structurally
/// is not double-reported for the raw `Filters` column. Without a detailed
/// report the scan stops at the first matching field per row.
#[must_use]
pub fn master_audit(rows: &[TrackerRow], canonical_fields: &[String], detailed: bool) -> AuditOutcome {
    let mut ids = Vec::new();
    let mut report = Vec::new();

    for row in rows {
        let parsed = filters::parse_filters(&row.filters);
        let mut findings: Vec<AuditFinding> = Vec::new();
        let mut row_matched = false;

        for canonical in canonical_fields {
            let structural = filters::find_structural_matches(&parsed, canonical);

            let mut paths: BTreeSet<String> = structural.iter().cloned().collect();
            let mut columns_by_path: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
            for path in &structural {
                columns_by_path
                    .entry(path.clone())
                    .or_default()
                    .insert(FILTERS_STRUCTURED.to_string());
            }

            for column in TEXT_COLUMNS {
                let Some(text) = row.column(column) else {
                    continue;
                };
                if text.is_empty() {
                    continue;
                }
                for path in locate::find_contextual_occurrences(text, canonical) {
                    // A structural hit already accounts for the raw text of
                    // the Filters column.
                    let structurally_found = structural.contains(&path);
                    paths.insert(path.clone());
                    if column == COL_FILTERS && structurally_found {
                        continue;
                    }
                    columns_by_path
                        .entry(path)
                        .or_default()
                        .insert(column.to_string());
                }
            }

            if paths.is_empty() {
                continue;
            }
            row_matched = true;
            if !detailed {
                break;
            }
            for path in paths {
                let columns = columns_by_path
                    .get(&path)
                    .map(|set| set.iter().cloned().collect())
                    .unwrap_or_default();
                findings.push(AuditFinding {
                    canonical: canonical.clone(),
                    in_filter_definition: structural.contains(&path),
                    path,
                    columns,
                });
            }
        }

        if !row_matched {
            continue;
        }
        if detailed {
            report.push(AuditReportRow {
                id: row.id.clone(),
                name: row.name.clone(),
                owner_id: row.owner_id.clone(),
                object_name: row.object_name.clone(),
                findings,
            });
        } else {
            ids.push(row.id.clone());
        }
    }

    if detailed {
        AuditOutcome::Report(report)
    } else {
        AuditOutcome::Ids(ids)
    }
}

/// Ids of the rows where any of `canonical_fields` appears
#[must_use]
pub fn audit_ids(rows: &[TrackerRow], canonical_fields: &[String]) -> Vec<String> {
    match master_audit(rows, canonical_fields, false) {
        AuditOutcome::Ids(ids) => ids,
        AuditOutcome::Report(_) => Vec::new(),
    }
}
