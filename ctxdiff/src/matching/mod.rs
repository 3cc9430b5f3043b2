//! Tree matching.
//!
//! This module provides the partner map between two trees, the XCC
//! matcher that builds it, and the sequence matchers (LCS skeleton
//! aligner, weighted context-window scorer) used by the delta editor and
//! the resolver.

pub mod context;
pub mod lcs;
pub mod xcc;

pub use context::ContextMatcher;
pub use lcs::{lcs_indices, skeleton_gaps, Gap};
pub use xcc::XccMatcher;

use crate::error::{Error, Result};
use crate::tree::{NodeId, Tree};

/// A symmetric bijection between the nodes of two trees.
///
/// Partner links live outside the trees: each side is a dense map from
/// arena slot to the partner's id. Pairing a node that already has a
/// partner fails; the matcher owns all mutation, consumers only read.
#[derive(Debug)]
pub struct Matching {
    a_to_b: Vec<Option<NodeId>>,
    b_to_a: Vec<Option<NodeId>>,
    pairs: usize,
}

impl Matching {
    /// Creates an empty matching sized for the two trees.
    pub fn new(a: &Tree, b: &Tree) -> Self {
        Matching {
            a_to_b: vec![None; a.len()],
            b_to_a: vec![None; b.len()],
            pairs: 0,
        }
    }

    /// Records the pair `(a, b)`.
    ///
    /// Fails if either node already has a partner.
    pub fn pair(&mut self, a: NodeId, b: NodeId) -> Result<()> {
        if self.a_to_b[a.index()].is_some() {
            return Err(Error::Parameter(format!(
                "node {} of the first tree is already matched",
                a.index()
            )));
        }
        if self.b_to_a[b.index()].is_some() {
            return Err(Error::Parameter(format!(
                "node {} of the second tree is already matched",
                b.index()
            )));
        }
        self.a_to_b[a.index()] = Some(b);
        self.b_to_a[b.index()] = Some(a);
        self.pairs += 1;
        Ok(())
    }

    /// Returns the partner of a first-tree node.
    pub fn partner_in_b(&self, a: NodeId) -> Option<NodeId> {
        self.a_to_b.get(a.index()).copied().flatten()
    }

    /// Returns the partner of a second-tree node.
    pub fn partner_in_a(&self, b: NodeId) -> Option<NodeId> {
        self.b_to_a.get(b.index()).copied().flatten()
    }

    /// Whether a first-tree node has a partner.
    pub fn is_matched_in_a(&self, a: NodeId) -> bool {
        self.partner_in_b(a).is_some()
    }

    /// Whether a second-tree node has a partner.
    pub fn is_matched_in_b(&self, b: NodeId) -> bool {
        self.partner_in_a(b).is_some()
    }

    /// Number of recorded pairs.
    pub fn len(&self) -> usize {
        self.pairs
    }

    /// Whether any pair has been recorded.
    pub fn is_empty(&self) -> bool {
        self.pairs == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Content;

    fn two_trees() -> (Tree, Tree) {
        let mut a = Tree::with_root(Content::element("r"));
        let a1 = a.push(Content::text("x"));
        a.append(a.root(), a1).unwrap();

        let mut b = Tree::with_root(Content::element("r"));
        let b1 = b.push(Content::text("x"));
        b.append(b.root(), b1).unwrap();
        (a, b)
    }

    #[test]
    fn test_pair_is_symmetric() {
        let (a, b) = two_trees();
        let mut m = Matching::new(&a, &b);
        m.pair(a.root(), b.root()).unwrap();

        assert_eq!(m.partner_in_b(a.root()), Some(b.root()));
        assert_eq!(m.partner_in_a(b.root()), Some(a.root()));
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn test_double_pair_fails() {
        let (a, b) = two_trees();
        let a_child = a.children(a.root())[0];
        let b_child = b.children(b.root())[0];

        let mut m = Matching::new(&a, &b);
        m.pair(a.root(), b.root()).unwrap();
        assert!(m.pair(a.root(), b_child).is_err());
        assert!(m.pair(a_child, b.root()).is_err());
        assert_eq!(m.len(), 1);
    }
}
