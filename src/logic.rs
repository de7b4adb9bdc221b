// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Logic rewriter - renumbers the boolean-logic mini-language (1-based filter
//! positions combined with AND/OR and parentheses) after filter removals

use once_cell::sync::Lazy;
use regex::Regex;

static OPERATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bAND\b|\bOR\b").expect("operator pattern"));
static POSITION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d+\b").expect("position pattern"));
static SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("space pattern"));

/// Rewrite a logic expression after the given 1-based filter positions have
/// been removed.
///
/// References to removed positions are dropped along with their connective;
/// surviving positions are renumbered contiguously from 1. When exactly one
/// distinct position survives, the whole expression collapses to that bare
/// number, since operators and grouping are meaningless with one condition.
/// Empty input and all-positions-removed both yield the empty string.
#[must_use]
pub fn update_logic(logic: &str, removed_positions: &[usize]) -> String {
    if logic.trim().is_empty() {
        return String::new();
    }

    // Split into operator tokens and the condition segments between them,
    // treating parenthesized text as part of the adjacent segment.
    let mut kept: Vec<String> = Vec::new();
    for token in tokenize(logic) {
        match token {
            Token::Operator(op) => {
                // An operator may only follow a condition segment.
                if matches!(kept.last(), Some(last) if !is_operator(last)) {
                    kept.push(op);
                }
            }
            Token::Segment(seg) => {
                let had_positions = POSITION_RE.is_match(&seg);
                let rewritten = renumber_positions(&seg, removed_positions);
                if had_positions && !POSITION_RE.is_match(&rewritten) {
                    // Every position in this segment was removed: drop the
                    // segment and the connective that joined it.
                    if matches!(kept.last(), Some(last) if is_operator(last)) {
                        kept.pop();
                    }
                } else {
                    let trimmed = rewritten.trim().to_string();
                    if !trimmed.is_empty() {
                        kept.push(trimmed);
                    }
                }
            }
        }
    }

    if matches!(kept.last(), Some(last) if is_operator(last)) {
        kept.pop();
    }

    let survivors: Vec<&str> = kept
        .iter()
        .flat_map(|part| POSITION_RE.find_iter(part).map(|m| m.as_str()))
        .collect();
    if survivors.is_empty() {
        return String::new();
    }
    let mut distinct: Vec<&str> = survivors.clone();
    distinct.sort_unstable();
    distinct.dedup();
    if distinct.len() == 1 {
        return (*distinct[0]).to_string();
    }

    let joined = kept.join(" ");
    let balanced = drop_unmatched_parens(&joined);
    let tightened = SPACE_RE
        .replace_all(&balanced, " ")
        .replace("( ", "(")
        .replace(" )", ")");
    strip_dangling_operators(tightened.trim())
}

enum Token {
    Operator(String),
    Segment(String),
}

fn tokenize(logic: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut cursor = 0;
    for m in OPERATOR_RE.find_iter(logic) {
        let segment = logic[cursor..m.start()].trim();
        if !segment.is_empty() {
            tokens.push(Token::Segment(segment.to_string()));
        }
        tokens.push(Token::Operator(m.as_str().to_uppercase()));
        cursor = m.end();
    }
    let tail = logic[cursor..].trim();
    if !tail.is_empty() {
        tokens.push(Token::Segment(tail.to_string()));
    }
    tokens
}

fn is_operator(token: &str) -> bool {
    token.eq_ignore_ascii_case("AND") || token.eq_ignore_ascii_case("OR")
}

/// Drop removed positions from a segment and shift the survivors down by the
/// count of removed positions below them
fn renumber_positions(segment: &str, removed_positions: &[usize]) -> String {
    POSITION_RE
        .replace_all(segment, |caps: &regex::Captures<'_>| {
            let pos: usize = caps[0].parse().unwrap_or(0);
            if removed_positions.contains(&pos) {
                String::new()
            } else {
                let shift = removed_positions.iter().filter(|r| **r < pos).count();
                (pos - shift).to_string()
            }
        })
        .into_owned()
}

/// Remove parentheses left unmatched by segment drops
fn drop_unmatched_parens(text: &str) -> String {
    let mut depth = 0usize;
    let forward: String = text
        .chars()
        .filter(|c| match c {
            '(' => {
                depth += 1;
                true
            }
            ')' => {
                if depth == 0 {
                    false
                } else {
                    depth -= 1;
                    true
                }
            }
            _ => true,
        })
        .collect();

    let mut extra_opens = depth;
    let mut reversed: Vec<char> = Vec::with_capacity(forward.len());
    for c in forward.chars().rev() {
        if c == '(' && extra_opens > 0 {
            extra_opens -= 1;
            continue;
        }
        reversed.push(c);
    }
    reversed.into_iter().rev().collect()
}

fn strip_dangling_operators(text: &str) -> String {
    let mut result = text.trim();
    loop {
        let upper = result.to_uppercase();
        if let Some(rest) = upper.strip_prefix("AND ") {
            result = result[result.len() - rest.len()..].trim_start();
        } else if let Some(rest) = upper.strip_prefix("OR ") {
            result = result[result.len() - rest.len()..].trim_start();
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
