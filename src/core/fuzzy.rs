#![forbid(unsafe_code)]

use std::collections::BTreeSet;

/// Greedy leftmost case-insensitive subsequence match.
///
/// Scans `query` character by character; each character must occur in `text`
/// strictly after the previous one. Returns the set of matched char offsets
/// into `text` (one per query character), or `None` when any character cannot
/// be placed. No attempt is made to find a more contiguous subsequence.
///
/// `subsequence_match("re1", "repo1")` yields `{0, 1, 4}`.
#[must_use]
pub fn subsequence_match(query: &str, text: &str) -> Option<BTreeSet<usize>> {
    let text_chars: Vec<char> = text.chars().collect();
    let mut positions = BTreeSet::new();
    let mut cursor = 0usize;

    for q in query.chars() {
        let found = text_chars[cursor..]
            .iter()
            .position(|t| chars_eq_ignore_case(q, *t))?;
        let idx = cursor + found;
        positions.insert(idx);
        cursor = idx + 1;
    }

    Some(positions)
}

fn chars_eq_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}
