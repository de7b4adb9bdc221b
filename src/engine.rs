// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Consistency engine - applies remove / swap / add operations to tracker
//! rows, keeping all six text encodings mutually consistent, and runs them
//! over a selected batch with a pre-mutation backup

use crate::filters;
use crate::kvlist;
use crate::locate;
use crate::logic;
use crate::query;
use crate::table::TrackerTable;
use crate::types::{canonical_name, TrackerRow};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

/// Removal requests for a batch: one list for every row, or per-tracker
/// lists from an audit-derived plan, looked up by tracker id
#[derive(Debug, Clone)]
pub enum RemovalInstructions {
    /// The same references are removed from every selected row
    Uniform(Vec<String>),
    /// Each tracker id gets its own removal list; absent ids get none
    PerTracker(BTreeMap<String, Vec<String>>),
}

impl Default for RemovalInstructions {
    fn default() -> Self {
        Self::Uniform(Vec::new())
    }
}

impl RemovalInstructions {
    fn for_row(&self, tracker_id: &str) -> Vec<String> {
        match self {
            Self::Uniform(refs) => refs.clone(),
            Self::PerTracker(map) => map.get(tracker_id).cloned().unwrap_or_default(),
        }
    }

    /// True when no row would receive any removal
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Uniform(refs) => refs.is_empty(),
            Self::PerTracker(map) => map.values().all(Vec::is_empty),
        }
    }
}

/// Result of a batch edit: the rewritten rows and the untouched pre-change
/// snapshot of the same rows
#[derive(Debug, Clone)]
pub struct ModifyOutcome {
    /// Selected rows after the requested operations
    pub modified: Vec<TrackerRow>,
    /// The same rows exactly as they were loaded
    pub backup: Vec<TrackerRow>,
}

/// Expand removal references to every contextual path in the row's field
/// list that resolves to the same canonical names
fn expand_references(row: &TrackerRow, references: &[String]) -> Vec<String> {
    let mut expanded: BTreeSet<String> = BTreeSet::new();
    for reference in references {
        expanded.insert(reference.clone());
        for occurrence in
            locate::find_contextual_occurrences(&row.fields, canonical_name(reference))
        {
            expanded.insert(occurrence);
        }
    }
    expanded.into_iter().collect()
}

/// Remove every occurrence of the given field references from one row.
///
/// Filters lose their matching conditions, the logic expression is
/// renumbered against the removed 1-based positions, the query's select list
/// and WHERE clause are pruned, and the field list, ordering list, resize map,
/// label map, and formatting rules all drop their matching entries.
pub fn remove_from_row(row: &mut TrackerRow, references: &[String]) {
    let contextual = expand_references(row, references);
    if contextual.is_empty() {
        return;
    }

    for reference in &contextual {
        row.fields = kvlist::remove_list_entry(&row.fields, reference);
    }

    let removed_positions = match filters::try_parse_filters(&row.filters) {
        Some(conditions) => {
            let (survivors, removed) = filters::remove_by_reference(conditions, &contextual);
            row.filters = filters::serialize_filters(&survivors);
            removed
        }
        // Malformed filters stay untouched; the pre-scan has already told
        // the user about them.
        None => Vec::new(),
    };

    row.logic = logic::update_logic(&row.logic, &removed_positions);
    row.query = query::update_query(&row.query, &contextual);

    if !row.formatting.trim().is_empty() {
        if let Some(rules) = filters::try_parse_formatting(&row.formatting) {
            let kept: Vec<_> = rules
                .into_iter()
                .filter(|rule| {
                    !rule.filters.iter().any(|cond| {
                        contextual
                            .iter()
                            .any(|r| cond.field == *r || cond.field.starts_with(&format!("{r}.")))
                    })
                })
                .collect();
            row.formatting =
                serde_json::to_string(&kept).unwrap_or_else(|_| row.formatting.clone());
        }
    }

    for reference in &contextual {
        row.order_by = kvlist::remove_list_entry(&row.order_by, reference);
    }

    let canonical_keys: BTreeSet<&str> =
        contextual.iter().map(|r| canonical_name(r)).collect();
    for key in canonical_keys {
        let resize_sep = kvlist::detect_separator(&row.resize_map);
        row.resize_map = kvlist::remove_entry(&row.resize_map, key, resize_sep);
        let label_sep = kvlist::detect_separator(&row.label_map);
        row.label_map = kvlist::remove_entry(&row.label_map, key, label_sep);
    }
}

/// Whether the swap target is already present in the row, either structurally
/// in the filter conditions or textually in the field list
#[must_use]
pub fn swap_target_present(row: &TrackerRow, new_reference: &str) -> bool {
    if filters::parse_filters(&row.filters)
        .iter()
        .any(|cond| cond.field == new_reference)
    {
        return true;
    }
    locate::contains_reference(&row.fields, new_reference)
}

/// Rewrite every occurrence of `old_reference` to `new_reference` across all
/// encodings of one row.
///
/// The filter array is updated structurally (field, label, and sobject
/// recomputed from the new reference); every other encoding gets a
/// word-bounded textual substitution. Callers are expected to have checked
/// [`swap_target_present`] first.
pub fn swap_in_row(row: &mut TrackerRow, old_reference: &str, new_reference: &str) {
    row.fields = kvlist::swap_field_in_text(&row.fields, old_reference, new_reference);
    row.logic = kvlist::swap_field_in_text(&row.logic, old_reference, new_reference);
    row.query = kvlist::swap_field_in_text(&row.query, old_reference, new_reference);
    row.formatting = row
        .formatting
        .split('\n')
        .map(|line| kvlist::swap_field_in_text(line, old_reference, new_reference))
        .collect::<Vec<_>>()
        .join("\n");
    row.order_by = kvlist::swap_field_in_text(&row.order_by, old_reference, new_reference);
    row.resize_map = kvlist::swap_field_in_text(&row.resize_map, old_reference, new_reference);
    row.label_map = kvlist::swap_field_in_text(&row.label_map, old_reference, new_reference);

    match filters::try_parse_filters(&row.filters) {
        Some(mut conditions) => {
            filters::apply_swap(&mut conditions, old_reference, new_reference, &row.object_name);
            row.filters = filters::serialize_filters(&conditions);
        }
        None => {
            warn!(
                tracker = %row.id,
                "filters column is not valid JSON; falling back to textual swap"
            );
            row.filters =
                kvlist::swap_field_in_text(&row.filters, old_reference, new_reference);
        }
    }
}

/// Append new canonical field names to the row's field list, skipping any
/// already present. The ordering list is deliberately left alone.
pub fn add_to_row(row: &mut TrackerRow, new_names: &[String]) {
    row.fields = kvlist::add_unique(&row.fields, new_names);
}

/// Apply one batch of remove / swap / add operations to the selected rows.
///
/// The backup snapshot is taken before any mutation. Swaps whose target
/// reference already exists in a row degrade to removal of the old reference
/// for that row. Rows are processed independently; a row the table does not
/// contain is skipped.
#[must_use]
pub fn modify_trackers(
    table: &TrackerTable,
    selected_ids: &[String],
    removals: &RemovalInstructions,
    swaps: &BTreeMap<String, String>,
    additions: &[String],
) -> ModifyOutcome {
    let selected: Vec<TrackerRow> = selected_ids
        .iter()
        .filter_map(|id| table.get(id).cloned())
        .collect();
    let backup = selected.clone();
    let mut modified = selected;

    for row in &mut modified {
        let mut row_removals = removals.for_row(&row.id);

        let mut row_swaps: Vec<(String, String)> = Vec::new();
        for (old, new) in swaps {
            if swap_target_present(row, new) {
                info!(
                    tracker = %row.id,
                    %old,
                    %new,
                    "swap target already present; converting swap to removal"
                );
                if !row_removals.contains(old) {
                    row_removals.push(old.clone());
                }
            } else {
                row_swaps.push((old.clone(), new.clone()));
            }
        }

        if !row_removals.is_empty() {
            remove_from_row(row, &row_removals);
        }
        for (old, new) in &row_swaps {
            swap_in_row(row, old, new);
        }
        if !additions.is_empty() {
            add_to_row(row, additions);
        }
    }

    ModifyOutcome { modified, backup }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TrackerRow;

    fn sample_row() -> TrackerRow {
        TrackerRow {
            id: "a0x000000000001".into(),
            name: "Site Build".into(),
            owner_id: "005000000000001".into(),
            object_name: "Site__c".into(),
            fields: "A__c,B__c,C__c".into(),
            filters: concat!(
                r#"[{"field":"A__c","label":"A","sobject":"Site__c","operator":"equals","value":"1"},"#,
                r#"{"field":"B__c","label":"B","sobject":"Site__c","operator":"equals","value":"2"},"#,
                r#"{"field":"C__c","label":"C","sobject":"Site__c","operator":"equals","value":"3"}]"#
            )
            .into(),
            logic: "1 AND (2 OR 3)".into(),
            query: "SELECT A__c, B__c, C__c FROM Site__c WHERE A__c = 1 AND B__c = 2".into(),
            formatting: r#"[{"filters":[{"field":"B__c"}],"style":"bold"}]"#.into(),
            order_by: "A__c,B__c".into(),
            resize_map: "A__c=100,B__c=200".into(),
            label_map: "A__c:Alpha,B__c:Beta".into(),
            ..Default::default()
        }
    }

    #[test]
    fn remove_rewrites_every_encoding() {
        let mut row = sample_row();
        remove_from_row(&mut row, &["B__c".into()]);

        assert_eq!(row.fields, "A__c, C__c");
        assert!(!row.filters.contains("B__c"));
        assert_eq!(row.logic, "1 OR 2");
        assert_eq!(row.query, "SELECT A__c,C__c FROM Site__c WHERE (A__c = 1)");
        assert_eq!(row.formatting, "[]");
        assert_eq!(row.order_by, "A__c");
        assert_eq!(row.resize_map, "A__c=100");
        assert_eq!(row.label_map, "A__c:Alpha");
    }

    #[test]
    fn remove_strips_contextual_paths_of_the_same_canonical() {
        let mut row = sample_row();
        row.fields = "A__c,Rel__r.B__c,C__c".into();
        remove_from_row(&mut row, &["B__c".into()]);
        assert_eq!(row.fields, "A__c, C__c");
    }

    #[test]
    fn remove_of_absent_reference_is_a_noop_for_lists() {
        let mut row = sample_row();
        let before_fields = row.fields.clone();
        remove_from_row(&mut row, &["Zed__c".into()]);
        assert_eq!(row.fields, before_fields);
        assert_eq!(row.logic, "1 AND (2 OR 3)");
    }

    #[test]
    fn malformed_filters_stay_untouched_on_remove() {
        let mut row = sample_row();
        row.filters = "{broken".into();
        remove_from_row(&mut row, &["B__c".into()]);
        assert_eq!(row.filters, "{broken");
        // No positions removed, so logic is renumbered against nothing.
        assert_eq!(row.logic, "1 AND (2 OR 3)");
    }

    #[test]
    fn swap_updates_all_encodings_and_recomputes_filter_metadata() {
        let mut row = sample_row();
        swap_in_row(&mut row, "A__c", "Account__r.Status__c");

        assert_eq!(row.fields, "Account__r.Status__c,B__c,C__c");
        assert!(row.query.starts_with("SELECT Account__r.Status__c, B__c"));
        assert_eq!(row.resize_map, "Account__r.Status__c=100,B__c=200");
        let conditions = filters::parse_filters(&row.filters);
        assert_eq!(conditions[0].field, "Account__r.Status__c");
        assert_eq!(conditions[0].label.as_deref(), Some("Status"));
        assert_eq!(conditions[0].sobject.as_deref(), Some("Account__c"));
        // Untouched conditions keep their metadata.
        assert_eq!(conditions[1].label.as_deref(), Some("B"));
    }

    #[test]
    fn swap_degrades_to_removal_when_target_exists() {
        let table = TrackerTable {
            rows: vec![sample_row()],
        };
        let ids = vec![sample_row().id];
        let mut swaps = BTreeMap::new();
        swaps.insert("A__c".to_string(), "B__c".to_string());

        let swapped = modify_trackers(
            &table,
            &ids,
            &RemovalInstructions::default(),
            &swaps,
            &[],
        );
        let removed = modify_trackers(
            &table,
            &ids,
            &RemovalInstructions::Uniform(vec!["A__c".into()]),
            &BTreeMap::new(),
            &[],
        );
        assert_eq!(swapped.modified, removed.modified);
        assert!(!swapped.modified[0].fields.contains("A__c"));
    }

    #[test]
    fn add_is_idempotent_and_fields_only() {
        let mut row = sample_row();
        let order_by_before = row.order_by.clone();
        add_to_row(&mut row, &["B__c".into(), "D__c".into()]);
        assert_eq!(row.fields, "A__c,B__c,C__c,D__c");
        assert_eq!(row.order_by, order_by_before);

        add_to_row(&mut row, &["D__c".into()]);
        assert_eq!(row.fields, "A__c,B__c,C__c,D__c");
    }

    #[test]
    fn backup_is_pristine() {
        let table = TrackerTable {
            rows: vec![sample_row()],
        };
        let ids = vec![sample_row().id];
        let outcome = modify_trackers(
            &table,
            &ids,
            &RemovalInstructions::Uniform(vec!["B__c".into()]),
            &BTreeMap::new(),
            &[],
        );
        assert_eq!(outcome.backup[0], sample_row());
        assert_ne!(outcome.modified[0], outcome.backup[0]);
    }

    #[test]
    fn per_tracker_removals_only_touch_their_row() {
        let mut other = sample_row();
        other.id = "a0x000000000002".into();
        let table = TrackerTable {
            rows: vec![sample_row(), other.clone()],
        };
        let mut plan = BTreeMap::new();
        plan.insert(sample_row().id, vec!["B__c".to_string()]);

        let outcome = modify_trackers(
            &table,
            &[sample_row().id, other.id.clone()],
            &RemovalInstructions::PerTracker(plan),
            &BTreeMap::new(),
            &[],
        );
        assert!(!outcome.modified[0].fields.contains("B__c"));
        assert!(outcome.modified[1].fields.contains("B__c"));
    }
}
