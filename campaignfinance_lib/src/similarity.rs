//! Trigram similarity for fuzzy name matching.
//!
//! Follows the PostgreSQL `pg_trgm` model: each word is lowercased, padded
//! with two leading spaces and one trailing space, and broken into the set of
//! its 3-character windows. The score of two strings is the size of the
//! intersection of their trigram sets divided by the size of the union.

use std::collections::BTreeSet;

/// Default minimum score for a name to count as a match.
pub const DEFAULT_THRESHOLD: f64 = 0.6;

/// Extract the set of trigrams for `text`.
///
/// Words are runs of alphanumeric characters; everything else separates
/// words and is dropped.
pub fn trigrams(text: &str) -> BTreeSet<[char; 3]> {
    let mut set = BTreeSet::new();
    let lowered = text.to_lowercase();

    for word in lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let padded: Vec<char> = "  "
            .chars()
            .chain(word.chars())
            .chain(std::iter::once(' '))
            .collect();
        for window in padded.windows(3) {
            set.insert([window[0], window[1], window[2]]);
        }
    }

    set
}

/// Similarity of two strings in `[0.0, 1.0]`.
///
/// Returns `0.0` when either side has no trigrams (empty or punctuation only).
pub fn similarity(a: &str, b: &str) -> f64 {
    let left = trigrams(a);
    let right = trigrams(b);
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }

    let shared = left.intersection(&right).count();
    let union = left.len() + right.len() - shared;
    shared as f64 / union as f64
}
