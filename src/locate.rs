// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Contextual field locator - finds every dotted relationship path in a block
//! of text that resolves to a given canonical field name

use regex::Regex;

/// Find every contextual occurrence of `canonical` in `text`.
///
/// A contextual occurrence is `canonical` itself or any dotted relationship
/// path ending in it (`Account__r.Status__c` for `Status__c`), word-bounded on
/// both ends so `Status__c` never matches inside `Other_Status__c2`. Returns
/// the distinct matched paths, sorted for stable display.
#[must_use]
pub fn find_contextual_occurrences(text: &str, canonical: &str) -> Vec<String> {
    if text.is_empty() || canonical.is_empty() {
        return Vec::new();
    }
    let pattern = format!(
        r"\b((?:[A-Za-z0-9_]+__r\.)*{})\b",
        regex::escape(canonical)
    );
    let Ok(re) = Regex::new(&pattern) else {
        return Vec::new();
    };
    let mut paths: Vec<String> = re
        .captures_iter(text)
        .map(|cap| cap[1].to_string())
        .collect();
    paths.sort();
    paths.dedup();
    paths
}

/// Word-bounded containment check for a full reference string
#[must_use]
pub fn contains_reference(text: &str, reference: &str) -> bool {
    if text.is_empty() || reference.is_empty() {
        return false;
    }
    let pattern = format!(r"\b{}\b", regex::escape(reference));
    Regex::new(&pattern).map_or(false, |re| re.is_match(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_bare_and_prefixed_paths() {
        let text = "Status__c, Account__r.Status__c, Site__r.Account__r.Status__c";
        let found = find_contextual_occurrences(text, "Status__c");
        assert_eq!(
            found,
            vec![
                "Account__r.Status__c".to_string(),
                "Site__r.Account__r.Status__c".to_string(),
                "Status__c".to_string(),
            ]
        );
    }

    #[test]
    fn respects_word_boundaries() {
        let found = find_contextual_occurrences("Other_Status__c2, XStatus__c", "Status__c");
        assert!(found.is_empty());
    }

    #[test]
    fn deduplicates_repeated_paths() {
        let text = "A__r.F__c AND A__r.F__c OR F__c";
        let found = find_contextual_occurrences(text, "F__c");
        assert_eq!(found, vec!["A__r.F__c".to_string(), "F__c".to_string()]);
    }

    #[test]
    fn empty_inputs_yield_nothing() {
        assert!(find_contextual_occurrences("", "F__c").is_empty());
        assert!(find_contextual_occurrences("F__c", "").is_empty());
    }

    #[test]
    fn contains_reference_is_word_bounded() {
        assert!(contains_reference("SELECT A__c FROM X", "A__c"));
        assert!(!contains_reference("SELECT BA__c FROM X", "A__c"));
    }
}
