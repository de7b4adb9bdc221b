// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Modification planner - previews which rows and columns a requested
//! remove / swap / add batch would touch, without performing the edit

use crate::filters;
use crate::locate;
use crate::types::{
    TrackerRow, COL_FIELDS, COL_FILTERS, COL_FORMATTING, COL_LABEL_MAP, COL_LOGIC,
    COL_ORDER_BY, COL_QUERY, COL_RESIZE_MAP,
};
use std::collections::{BTreeMap, BTreeSet};

/// The text columns the planner scans besides the structural filter check
const SCAN_COLUMNS: [&str; 7] = [
    COL_FIELDS,
    COL_LOGIC,
    COL_QUERY,
    COL_FORMATTING,
    COL_ORDER_BY,
    COL_RESIZE_MAP,
    COL_LABEL_MAP,
];

/// Determine, per tracker id, which columns the requested operations would
/// change. Rows no operation would touch are absent from the result.
///
/// Swap detection applies the same precondition as the engine: when the
/// swap's new reference already exists in a row, the affected columns are
/// attributed as if the old reference were being removed (plus `Logic` when
/// both sides are structurally present in the filters).
#[must_use]
pub fn identify_modifications(
    rows: &[TrackerRow],
    fields_to_remove: &[String],
    swap_map: &BTreeMap<String, String>,
    fields_to_add: &[String],
) -> BTreeMap<String, BTreeSet<String>> {
    let mut plan: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for row in rows {
        let mut touched: BTreeSet<String> = BTreeSet::new();
        let parsed = filters::parse_filters(&row.filters);

        for canonical in fields_to_remove {
            if !filters::find_structural_matches(&parsed, canonical).is_empty() {
                touched.insert(COL_FILTERS.to_string());
                touched.insert(COL_LOGIC.to_string());
            }
            for column in SCAN_COLUMNS {
                if let Some(text) = row.column(column) {
                    if !locate::find_contextual_occurrences(text, canonical).is_empty() {
                        touched.insert(column.to_string());
                    }
                }
            }
        }

        for (old, new) in swap_map {
            let new_exists = parsed.iter().any(|cond| cond.field == *new)
                || locate::contains_reference(&row.fields, new);

            if parsed.iter().any(|cond| cond.field == *old) {
                touched.insert(COL_FILTERS.to_string());
                if new_exists {
                    // Degraded swap removes a filter condition, so the logic
                    // positions get renumbered too.
                    touched.insert(COL_LOGIC.to_string());
                }
            }
            for column in SCAN_COLUMNS {
                if let Some(text) = row.column(column) {
                    if locate::contains_reference(text, old) {
                        touched.insert(column.to_string());
                    }
                }
            }
        }

        if !fields_to_add.is_empty() {
            let present: Vec<&str> = row
                .fields
                .split(',')
                .map(str::trim)
                .filter(|i| !i.is_empty())
                .collect();
            if fields_to_add
                .iter()
                .any(|add| !present.contains(&add.as_str()))
            {
                touched.insert(COL_FIELDS.to_string());
            }
        }

        if !touched.is_empty() {
            plan.insert(row.id.clone(), touched);
        }
    }

    plan
}
