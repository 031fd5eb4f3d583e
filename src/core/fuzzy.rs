// src/core/fuzzy.rs

//! Typo-tolerant suggestions for unknown command and subcommand names.
//!
//! The same [`Matcher`] is used at every level of the command tree; only the
//! candidate set changes.

use crate::constants::DEFAULT_SUGGESTION_DISTANCE;

/// Suggests known names that are within `max_distance` edits of the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Matcher {
    /// Largest edit distance still reported as a suggestion.
    pub max_distance: usize,
}

impl Default for Matcher {
    fn default() -> Self {
        Self {
            max_distance: DEFAULT_SUGGESTION_DISTANCE,
        }
    }
}

impl Matcher {
    /// A matcher with the given threshold.
    pub fn new(max_distance: usize) -> Self {
        Self { max_distance }
    }

    /// Returns every candidate within the distance threshold, closest first and
    /// alphabetical among equals. An empty (or all-whitespace) input matches nothing.
    pub fn suggest<I, S>(&self, candidates: I, input: &str) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let input = input.trim();
        if input.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(usize, String)> = candidates
            .into_iter()
            .filter_map(|candidate| {
                let candidate = candidate.as_ref();
                let distance = levenshtein(input, candidate);
                (distance <= self.max_distance).then(|| (distance, candidate.to_string()))
            })
            .collect();

        scored.sort();
        scored.dedup();
        scored.into_iter().map(|(_, name)| name).collect()
    }
}

/// Classic Levenshtein distance over Unicode scalar values.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    // Two rolling rows are enough: row i only reads row i - 1.
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr: Vec<usize> = vec![0; b_chars.len() + 1];

    for (i, a_char) in a_chars.iter().enumerate() {
        if let Some(first) = curr.first_mut() {
            *first = i + 1;
        }
        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = usize::from(a_char != b_char);
            let deletion = prev.get(j + 1).copied().unwrap_or(usize::MAX).saturating_add(1);
            let insertion = curr.get(j).copied().unwrap_or(usize::MAX).saturating_add(1);
            let substitution = prev.get(j).copied().unwrap_or(usize::MAX).saturating_add(cost);
            if let Some(cell) = curr.get_mut(j + 1) {
                *cell = deletion.min(insertion).min(substitution);
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev.last().copied().unwrap_or(0)
}

// MARK: --- UNIT TESTS ---
