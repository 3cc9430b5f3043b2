//! Weighted context-window scoring.
//!
//! Compares the head/tail fingerprint of a detached operation against the
//! corresponding windows of a candidate anchor. An entry that matches at
//! its exact position outweighs one that merely occurs somewhere in the
//! window; a zero entry stands for "nothing here" and matches only another
//! zero.

use rustc_hash::FxHashSet;

/// Points for a hit at the expected position.
pub const EXACT_HIT: u32 = 2;
/// Points for a hit elsewhere in the window.
pub const IN_WINDOW_HIT: u32 = 1;

/// Scores candidate anchors against one operation's fingerprint.
pub struct ContextMatcher<'q> {
    head: &'q [u32],
    tail: &'q [u32],
}

impl<'q> ContextMatcher<'q> {
    /// Creates a matcher for the given query fingerprint.
    pub fn new(head: &'q [u32], tail: &'q [u32]) -> Self {
        ContextMatcher { head, tail }
    }

    /// Weighted score of a candidate's head and tail windows.
    pub fn score(&self, head_window: &[u32], tail_window: &[u32]) -> u32 {
        Self::score_window(self.head, head_window) + Self::score_window(self.tail, tail_window)
    }

    /// True if every non-zero query entry matches at its exact position.
    pub fn strict(&self, head_window: &[u32], tail_window: &[u32]) -> bool {
        Self::nonzero_entries_match(self.head, head_window)
            && Self::nonzero_entries_match(self.tail, tail_window)
    }

    /// Number of tail entries that match at their exact position; a pair
    /// of zeros counts as a match.
    pub fn tail_hits(&self, tail_window: &[u32]) -> usize {
        Self::positional_hits(self.tail, tail_window)
    }

    /// Length of the tail query.
    pub fn tail_len(&self) -> usize {
        self.tail.len()
    }

    /// Number of non-zero entries matching at their exact position across
    /// head and tail.
    pub fn exact_hits(&self, head_window: &[u32], tail_window: &[u32]) -> usize {
        let count = |query: &[u32], window: &[u32]| {
            query
                .iter()
                .enumerate()
                .filter(|&(i, &q)| q != 0 && window.get(i) == Some(&q))
                .count()
        };
        count(self.head, head_window) + count(self.tail, tail_window)
    }

    fn score_window(query: &[u32], window: &[u32]) -> u32 {
        let values: FxHashSet<u32> = window.iter().copied().collect();
        query
            .iter()
            .enumerate()
            .map(|(i, &q)| {
                if window.get(i) == Some(&q) {
                    EXACT_HIT
                } else if q != 0 && values.contains(&q) {
                    IN_WINDOW_HIT
                } else {
                    0
                }
            })
            .sum()
    }

    fn nonzero_entries_match(query: &[u32], window: &[u32]) -> bool {
        query
            .iter()
            .enumerate()
            .all(|(i, &q)| q == 0 || window.get(i) == Some(&q))
    }

    fn positional_hits(query: &[u32], window: &[u32]) -> usize {
        query
            .iter()
            .enumerate()
            .filter(|&(i, &q)| window.get(i).copied().unwrap_or(0) == q)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_beats_in_window() {
        let head = [7, 8];
        let tail = [];
        let m = ContextMatcher::new(&head, &tail);

        let exact = m.score(&[7, 8], &[]);
        let shifted = m.score(&[8, 7], &[]);
        let miss = m.score(&[1, 2], &[]);

        assert_eq!(exact, 2 * EXACT_HIT);
        assert_eq!(shifted, 2 * IN_WINDOW_HIT);
        assert_eq!(miss, 0);
        assert!(exact > shifted && shifted > miss);
    }

    #[test]
    fn test_zero_matches_only_zero() {
        let head = [0, 5];
        let tail = [];
        let m = ContextMatcher::new(&head, &tail);

        // The zero entry scores exactly when the window also has nothing
        // there, and never as an in-window hit.
        assert_eq!(m.score(&[0, 5], &[]), 2 * EXACT_HIT);
        assert_eq!(m.score(&[9, 5], &[]), EXACT_HIT);
        assert_eq!(m.score(&[0, 9], &[]), EXACT_HIT);
    }

    #[test]
    fn test_strict_ignores_zero_entries() {
        let head = [0, 5];
        let tail = [7, 0];
        let m = ContextMatcher::new(&head, &tail);

        assert!(m.strict(&[9, 5], &[7, 8]));
        assert!(!m.strict(&[9, 6], &[7, 8]));
        assert!(!m.strict(&[9, 5], &[8, 8]));
    }

    #[test]
    fn test_tail_hits_counts_zero_pairs() {
        let head = [];
        let tail = [7, 9, 0, 0];
        let m = ContextMatcher::new(&head, &tail);

        assert_eq!(m.tail_hits(&[7, 9, 1, 2]), 2);
        assert_eq!(m.tail_hits(&[7, 9, 0, 0]), 4);
        // A short window reads as zeros past its end.
        assert_eq!(m.tail_hits(&[7, 9]), 4);
    }

    #[test]
    fn test_exact_hits_skip_zeros() {
        let head = [0, 5];
        let tail = [7, 0];
        let m = ContextMatcher::new(&head, &tail);
        assert_eq!(m.exact_hits(&[0, 5], &[7, 0]), 2);
        assert_eq!(m.exact_hits(&[0, 0], &[0, 0]), 0);
    }
}
