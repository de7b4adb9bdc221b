// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Filter-condition store - parses, queries, and rewrites the JSON array
//! encoding of a tracker's filter conditions

use crate::types::{FilterCondition, FormattingRule};

/// Parse the raw `Filters` column into an ordered condition list.
///
/// Empty text, `null`, and `[]` are all the empty list. Malformed JSON also
/// degrades to the empty list here; the pre-scan in [`crate::jsonscan`]
/// reports malformed columns to the user before any edit is attempted.
#[must_use]
pub fn parse_filters(raw: &str) -> Vec<FilterCondition> {
    try_parse_filters(raw).unwrap_or_default()
}

/// Like [`parse_filters`] but distinguishes malformed JSON (`None`) from the
/// legitimately-empty encodings, so rewriters can leave a malformed column
/// untouched instead of clobbering it
#[must_use]
pub fn try_parse_filters(raw: &str) -> Option<Vec<FilterCondition>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
        return Some(Vec::new());
    }
    serde_json::from_str(trimmed).ok()
}

/// Tolerant parse of the `Formatting` column's rule array; same contract as
/// [`try_parse_filters`]
#[must_use]
pub fn try_parse_formatting(raw: &str) -> Option<Vec<FormattingRule>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
        return Some(Vec::new());
    }
    serde_json::from_str(trimmed).ok()
}

/// Serialize a condition list back to the compact column encoding.
///
/// An empty list serializes to the literal `[]`, never an empty string, so
/// round-trips through the export stay stable.
#[must_use]
pub fn serialize_filters(filters: &[FilterCondition]) -> String {
    serde_json::to_string(filters).unwrap_or_else(|_| "[]".to_string())
}

/// Field references in `filters` that resolve to `canonical`: the condition's
/// `field` equals the canonical name or ends with `"." + canonical`.
#[must_use]
pub fn find_structural_matches(filters: &[FilterCondition], canonical: &str) -> Vec<String> {
    filters
        .iter()
        .filter(|cond| {
            cond.field == canonical || cond.field.ends_with(&format!(".{canonical}"))
        })
        .map(|cond| cond.field.clone())
        .collect()
}

/// Whether any reference in `references` claims a condition's `field`, either
/// exactly or as a dotted prefix of it
fn reference_matches(field: &str, references: &[String]) -> bool {
    references
        .iter()
        .any(|r| field == r || field.starts_with(&format!("{r}.")))
}

/// Remove every condition whose field matches one of `references`.
///
/// Returned positions are 1-based per the original ordering, which is the
/// contract the logic rewriter renumbers against; survivors keep their
/// relative order.
#[must_use]
pub fn remove_by_reference(
    filters: Vec<FilterCondition>,
    references: &[String],
) -> (Vec<FilterCondition>, Vec<usize>) {
    let mut survivors = Vec::with_capacity(filters.len());
    let mut removed_positions = Vec::new();
    for (pos, cond) in filters.into_iter().enumerate() {
        if reference_matches(&cond.field, references) {
            removed_positions.push(pos + 1);
        } else {
            survivors.push(cond);
        }
    }
    (survivors, removed_positions)
}

/// Rewrite every condition bound to `old_reference` to point at
/// `new_reference`, recomputing `label` and `sobject` from the new reference
/// rather than copying the stale ones.
pub fn apply_swap(
    filters: &mut [FilterCondition],
    old_reference: &str,
    new_reference: &str,
    base_object: &str,
) {
    for cond in filters.iter_mut() {
        if cond.field == old_reference {
            cond.field = new_reference.to_string();
            if cond.label.is_some() {
                cond.label = Some(filter_label(new_reference));
            }
            if cond.sobject.is_some() {
                cond.sobject = Some(filter_sobject(new_reference, base_object));
            }
        }
    }
}

/// Display label for a field reference: final path segment, `__c`/`__r`
/// suffix dropped, underscores to spaces, each word title-cased.
#[must_use]
pub fn filter_label(reference: &str) -> String {
    if reference.is_empty() {
        return String::new();
    }
    let final_segment = reference.rsplit('.').next().unwrap_or(reference);
    let root = final_segment
        .strip_suffix("__c")
        .or_else(|| final_segment.strip_suffix("__r"))
        .unwrap_or(final_segment);
    root.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Owning object for a field reference: the penultimate relationship segment
/// with `__r` rewritten to `__c`, or the tracker's base object for a bare
/// (0-hop) reference.
#[must_use]
pub fn filter_sobject(reference: &str, base_object: &str) -> String {
    if reference.is_empty() {
        return base_object.to_string();
    }
    let parts: Vec<&str> = reference.split('.').collect();
    if parts.len() == 1 {
        return base_object.to_string();
    }
    let relationship = parts[parts.len() - 2];
    relationship
        .strip_suffix("__r")
        .map_or_else(|| relationship.to_string(), |stem| format!("{stem}__c"))
}
