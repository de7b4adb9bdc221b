// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Rewriters for the comma-separated list encodings: plain reference lists,
//! `key=value` / `key:value` maps, and word-bounded reference swaps

use regex::Regex;

/// Remove an exact entry from a comma-separated list, preserving the order of
/// the survivors. Entries are trimmed before comparison.
#[must_use]
pub fn remove_list_entry(list_text: &str, entry: &str) -> String {
    if entry.trim().is_empty() {
        return list_text.to_string();
    }
    let kept: Vec<&str> = list_text
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty() && *item != entry)
        .collect();
    kept.join(", ")
}

/// Remove the entry whose key (left of the first `separator`) equals `key`.
///
/// Items without the separator are not key/value pairs and are kept verbatim.
#[must_use]
pub fn remove_entry(kv_text: &str, key: &str, separator: char) -> String {
    if kv_text.is_empty() || key.is_empty() {
        return kv_text.to_string();
    }
    let kept: Vec<&str> = kv_text
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .filter(|item| match item.split_once(separator) {
            Some((left, _)) => left.trim() != key,
            None => true,
        })
        .collect();
    kept.join(", ")
}

/// Pick the map separator for a `ResizeMap` / `Label Map` style encoding:
/// `:` when the first entry carries a colon and no equals sign, `=` otherwise.
#[must_use]
pub fn detect_separator(kv_text: &str) -> char {
    let first = kv_text.split(',').next().unwrap_or("");
    if first.contains(':') && !first.contains('=') {
        ':'
    } else {
        '='
    }
}

/// Replace every word-bounded occurrence of `old` with `new`.
///
/// This is the one swap primitive shared by all the text encodings; word
/// boundaries keep `A__c` from rewriting the middle of `BA__c`.
#[must_use]
pub fn swap_field_in_text(text: &str, old: &str, new: &str) -> String {
    if old.is_empty() {
        return text.to_string();
    }
    let pattern = format!(r"\b{}\b", regex::escape(old));
    match Regex::new(&pattern) {
        Ok(re) => re.replace_all(text, new).into_owned(),
        Err(_) => text.to_string(),
    }
}

/// Append each of `new_items` not already present in the comma list,
/// preserving existing order and appending additions at the end.
#[must_use]
pub fn add_unique(list_text: &str, new_items: &[String]) -> String {
    let mut items: Vec<String> = list_text
        .split(',')
        .map(str::trim)
        .filter(|i| !i.is_empty())
        .map(String::from)
        .collect();
    for item in new_items {
        if !items.iter().any(|existing| existing == item) {
            items.push(item.clone());
        }
    }
    items.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_exact_list_entry_only() {
        assert_eq!(remove_list_entry("A__c,B__c,C__c", "B__c"), "A__c, C__c");
        assert_eq!(remove_list_entry("A__c, B__c", "B__c2"), "A__c, B__c");
    }

    #[test]
    fn removes_key_value_entry() {
        assert_eq!(remove_entry("A__c=100,B__c=200", "A__c", '='), "B__c=200");
        assert_eq!(remove_entry("A__c:Alpha,B__c:Beta", "B__c", ':'), "A__c:Alpha");
    }

    #[test]
    fn keeps_items_without_separator() {
        assert_eq!(remove_entry("A__c=1,loose,B__c=2", "loose", '='), "A__c=1, loose, B__c=2");
    }

    #[test]
    fn detects_separator_from_first_entry() {
        assert_eq!(detect_separator("A__c:Alpha,B__c:Beta"), ':');
        assert_eq!(detect_separator("A__c=100"), '=');
        assert_eq!(detect_separator("A__c=http://x,B__c=2"), '=');
        assert_eq!(detect_separator(""), '=');
    }

    #[test]
    fn swap_is_word_bounded() {
        assert_eq!(swap_field_in_text("A__c,BA__c", "A__c", "Z__c"), "Z__c,BA__c");
        assert_eq!(
            swap_field_in_text("X__r.A__c = 'v'", "X__r.A__c", "Y__r.B__c"),
            "Y__r.B__c = 'v'"
        );
    }

    #[test]
    fn add_unique_skips_present_entries() {
        assert_eq!(
            add_unique("A__c,B__c", &["B__c".into(), "C__c".into()]),
            "A__c,B__c,C__c"
        );
        assert_eq!(add_unique("", &["A__c".into()]), "A__c");
    }
}
