// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Query rewriter - prunes removed field references from a
//! `SELECT ... FROM ... WHERE ... [ORDER BY ...]` string while keeping the
//! surviving boolean expression balanced
//!
//! WHERE conditions are split on top-level AND/OR only; a parenthesized
//! sub-expression travels with its segment and is removed wholesale when any
//! removed reference appears inside it. Nested groups are deliberately not
//! decomposed further.

use once_cell::sync::Lazy;
use regex::Regex;

static SELECT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(SELECT\s+)(.*?)(\s+FROM\s+)").expect("select pattern"));
static WHERE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^(.*?WHERE\s+)(.*?)(\s+ORDER\s+BY.*|$)").expect("where pattern")
});
static OPERATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bAND\b|\bOR\b").expect("operator pattern"));
static SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("space pattern"));

/// Remove every select-list entry and WHERE condition referencing one of
/// `references_to_remove` (full contextual reference strings).
///
/// A query that does not match the expected `SELECT ... FROM` or `WHERE`
/// shape passes through the corresponding step unchanged.
#[must_use]
pub fn update_query(query: &str, references_to_remove: &[String]) -> String {
    let query = prune_select_list(query, references_to_remove);
    prune_where_clause(&query, references_to_remove)
}

fn prune_select_list(query: &str, references: &[String]) -> String {
    let Some(caps) = SELECT_RE.captures(query) else {
        return query.to_string();
    };
    let whole = caps.get(0).expect("whole match");
    let before = &caps[1];
    let items = &caps[2];
    let after = &caps[3];

    let kept: Vec<&str> = items
        .split(',')
        .map(str::trim)
        .filter(|item| {
            !references
                .iter()
                .any(|r| item == r || item.starts_with(&format!("{r}.")))
        })
        .collect();

    format!("{}{}{}{}", before, kept.join(","), after, &query[whole.end()..])
}

fn prune_where_clause(query: &str, references: &[String]) -> String {
    let Some(caps) = WHERE_RE.captures(query) else {
        return query.to_string();
    };
    let prefix = &caps[1];
    let condition = &caps[2];
    let suffix = &caps[3];

    let matchers: Vec<Regex> = references
        .iter()
        .filter_map(|r| Regex::new(&format!(r"(?i)\b{}\b", regex::escape(r))).ok())
        .collect();

    let mut kept: Vec<String> = Vec::new();
    for part in split_on_operators(condition) {
        if is_operator(&part) {
            if matches!(kept.last(), Some(last) if !is_operator(last)) {
                kept.push(part.to_uppercase());
            }
            continue;
        }
        if matchers.iter().any(|re| re.is_match(&part)) {
            if matches!(kept.last(), Some(last) if is_operator(last)) {
                kept.pop();
            }
        } else {
            kept.push(part);
        }
    }
    if matches!(kept.last(), Some(last) if is_operator(last)) {
        kept.pop();
    }

    if kept.is_empty() {
        return elide_where(prefix, suffix);
    }

    let mut cond = SPACE_RE.replace_all(&kept.join(" "), " ").trim().to_string();
    cond = strip_edge_operators(&cond);
    if cond.is_empty() {
        return elide_where(prefix, suffix);
    }
    if !is_wrapped(&cond) {
        cond = format!("({cond})");
    }
    format!("{} {} {}", prefix.trim(), cond, suffix.trim())
        .trim()
        .to_string()
}

/// Reassemble the query with the entire WHERE clause elided
fn elide_where(prefix: &str, suffix: &str) -> String {
    let trimmed = prefix.trim();
    // The matched prefix always ends with the WHERE keyword itself.
    let without_keyword = trimmed[..trimmed.len() - 5].trim_end();
    format!("{without_keyword}{suffix}").trim().to_string()
}

/// Split a WHERE condition on top-level AND/OR only; an operator inside a
/// parenthesized group stays with its segment, keeping the group atomic
fn split_on_operators(condition: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth: i32 = 0;
    let mut cursor = 0;
    for m in OPERATOR_RE.find_iter(condition) {
        let between = &condition[cursor..m.start()];
        depth += paren_delta(between);
        if depth == 0 {
            current.push_str(between);
            let segment = current.trim();
            if !segment.is_empty() {
                parts.push(segment.to_string());
            }
            current.clear();
            parts.push(m.as_str().to_string());
        } else {
            current.push_str(between);
            current.push_str(m.as_str());
        }
        cursor = m.end();
    }
    current.push_str(&condition[cursor..]);
    let segment = current.trim();
    if !segment.is_empty() {
        parts.push(segment.to_string());
    }
    parts
}

fn paren_delta(text: &str) -> i32 {
    text.chars().fold(0, |acc, c| match c {
        '(' => acc + 1,
        ')' => acc - 1,
        _ => acc,
    })
}

fn is_operator(part: &str) -> bool {
    part.eq_ignore_ascii_case("AND") || part.eq_ignore_ascii_case("OR")
}

fn strip_edge_operators(text: &str) -> String {
    let mut result = text.trim();
    loop {
        let upper = result.to_uppercase();
        if upper.starts_with("AND ") {
            result = result[4..].trim_start();
        } else if upper.starts_with("OR ") {
            result = result[3..].trim_start();
        } else if upper.ends_with(" AND") {
            result = result[..result.len() - 4].trim_end();
        } else if upper.ends_with(" OR") {
            result = result[..result.len() - 3].trim_end();
        } else {
            break;
        }
    }
    result.to_string()
}

/// Already wrapped: starts and ends with parens and the counts balance.
/// This intentionally accepts forms like `(A) OR (B)` as wrapped, matching
/// the flat segmentation model.
fn is_wrapped(cond: &str) -> bool {
    cond.starts_with('(')
        && cond.ends_with(')')
        && cond.matches('(').count() == cond.matches(')').count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn removes_select_entry_and_where_condition() {
        let q = "SELECT A__c, B__c FROM Obj WHERE A__c = 'x' AND B__c = 'y'";
        assert_eq!(
            update_query(q, &refs(&["B__c"])),
            "SELECT A__c FROM Obj WHERE (A__c = 'x')"
        );
    }

    #[test]
    fn removes_dotted_subpath_select_entries() {
        let q = "SELECT A__c, Rel__r.A__c.Name FROM Obj WHERE A__c = 'x'";
        let out = update_query(q, &refs(&["Rel__r.A__c"]));
        assert_eq!(out, "SELECT A__c FROM Obj WHERE (A__c = 'x')");
    }

    #[test]
    fn elides_where_when_nothing_survives() {
        let q = "SELECT A__c, B__c FROM Obj WHERE B__c = 'y' ORDER BY A__c";
        assert_eq!(
            update_query(q, &refs(&["B__c"])),
            "SELECT A__c FROM Obj ORDER BY A__c"
        );
    }

    #[test]
    fn preserves_order_by_suffix() {
        let q = "SELECT A__c, B__c FROM Obj WHERE A__c = 1 AND B__c = 2 ORDER BY A__c DESC";
        assert_eq!(
            update_query(q, &refs(&["B__c"])),
            "SELECT A__c FROM Obj WHERE (A__c = 1) ORDER BY A__c DESC"
        );
    }

    #[test]
    fn query_without_where_passes_through_that_step() {
        let q = "SELECT A__c, B__c FROM Obj";
        assert_eq!(update_query(q, &refs(&["B__c"])), "SELECT A__c FROM Obj");
    }

    #[test]
    fn unmatched_shape_passes_through_unchanged() {
        let q = "not a query at all";
        assert_eq!(update_query(q, &refs(&["B__c"])), q);
    }

    #[test]
    fn keeps_middle_condition_chain_connected() {
        let q = "SELECT A__c, B__c, C__c FROM Obj WHERE A__c = 1 AND B__c = 2 AND C__c = 3";
        assert_eq!(
            update_query(q, &refs(&["B__c"])),
            "SELECT A__c,C__c FROM Obj WHERE (A__c = 1 AND C__c = 3)"
        );
    }

    #[test]
    fn parenthesized_group_is_removed_atomically() {
        // Flat segmentation: a nested group containing a removed reference
        // goes away wholesale, including conditions that only it carried.
        let q = "SELECT A__c, B__c, C__c FROM Obj WHERE (B__c = 2 OR C__c = 3) AND A__c = 1";
        let out = update_query(q, &refs(&["B__c"]));
        assert_eq!(out, "SELECT A__c,C__c FROM Obj WHERE (A__c = 1)");
    }

    #[test]
    fn where_references_match_case_insensitively() {
        let q = "SELECT A__c FROM Obj WHERE a__C = 'x' AND C__c = 1";
        assert_eq!(
            update_query(q, &refs(&["A__c"])),
            "SELECT  FROM Obj WHERE (C__c = 1)"
        );
    }

    #[test]
    fn output_parens_stay_balanced() {
        let q = "SELECT A__c, B__c FROM Obj WHERE (A__c = 'x' OR A__c = 'y') AND B__c = 2";
        let out = update_query(q, &refs(&["B__c"]));
        let open = out.matches('(').count();
        let close = out.matches(')').count();
        assert_eq!(open, close);
        assert!(out.contains("WHERE (A__c = 'x' OR A__c = 'y')"));
    }
}
