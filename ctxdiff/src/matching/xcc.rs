//! XCC tree matcher.
//!
//! Pairs the nodes of two trees top-down and bottom-up: the top-down pass
//! transplants whole identical subtrees (tree-hash equality confirmed by a
//! structural recheck), the bottom-up pass pairs remaining nodes with
//! equal payloads under already-matched parents. Passes repeat until a
//! fixpoint is reached.

use tracing::debug;

use super::Matching;
use crate::error::Result;
use crate::tree::{GenerationIndex, HashCache, NodeId, Tree};

/// Matcher over a fixed pair of trees and their hash caches.
pub struct XccMatcher<'a> {
    a: &'a Tree,
    b: &'a Tree,
    a_hashes: &'a HashCache,
    b_hashes: &'a HashCache,
}

impl<'a> XccMatcher<'a> {
    /// Creates a matcher for the given trees.
    pub fn new(a: &'a Tree, b: &'a Tree, a_hashes: &'a HashCache, b_hashes: &'a HashCache) -> Self {
        XccMatcher {
            a,
            b,
            a_hashes,
            b_hashes,
        }
    }

    /// Builds the matching. The roots are always paired.
    pub fn match_trees(&self) -> Result<Matching> {
        let mut matching = Matching::new(self.a, self.b);
        matching.pair(self.a.root(), self.b.root())?;

        let generations = GenerationIndex::build(self.a);
        let mut postorder = Vec::new();
        self.a.for_each_post(self.a.root(), |n| postorder.push(n));

        let mut round = 0usize;
        loop {
            let mut progress = self.top_down(&generations, &mut matching)?;
            progress |= self.bottom_up(&postorder, &mut matching)?;
            round += 1;
            if !progress {
                break;
            }
        }
        debug!(pairs = matching.len(), rounds = round, "matching complete");
        Ok(matching)
    }

    /// Top-down pass: generation by generation, pair each unmatched node
    /// whose parent is matched with the first unmatched child of the
    /// partner parent that roots an identical subtree.
    fn top_down(&self, generations: &GenerationIndex, matching: &mut Matching) -> Result<bool> {
        let mut progress = false;
        for depth in 1..generations.depth_count() {
            for &a_node in generations.row(depth) {
                if matching.is_matched_in_a(a_node) {
                    continue;
                }
                let Some(a_parent) = self.a.parent(a_node) else {
                    continue;
                };
                let Some(b_parent) = matching.partner_in_b(a_parent) else {
                    continue;
                };
                let candidate = self
                    .b
                    .children(b_parent)
                    .iter()
                    .copied()
                    .find(|&b_child| {
                        !matching.is_matched_in_b(b_child) && self.subtrees_equal(a_node, b_child)
                    });
                if let Some(b_node) = candidate {
                    self.pair_subtrees(a_node, b_node, matching)?;
                    progress = true;
                }
            }
        }
        Ok(progress)
    }

    /// Bottom-up pass: post-order over the first tree, pair each remaining
    /// unmatched node with the first unmatched child of the partner parent
    /// that has an equal payload. Earlier child index wins.
    fn bottom_up(&self, postorder: &[NodeId], matching: &mut Matching) -> Result<bool> {
        let mut progress = false;
        for &a_node in postorder {
            if matching.is_matched_in_a(a_node) {
                continue;
            }
            let Some(a_parent) = self.a.parent(a_node) else {
                continue;
            };
            let Some(b_parent) = matching.partner_in_b(a_parent) else {
                continue;
            };
            let candidate = self.b.children(b_parent).iter().copied().find(|&b_child| {
                !matching.is_matched_in_b(b_child) && self.nodes_equal(a_node, b_child)
            });
            if let Some(b_node) = candidate {
                matching.pair(a_node, b_node)?;
                progress = true;
            }
        }
        Ok(progress)
    }

    /// Subtree equality: tree-hash equality plus a pair-wise structural
    /// recheck in document order. A hash hit that fails the recheck is
    /// treated as "not equal".
    fn subtrees_equal(&self, a_node: NodeId, b_node: NodeId) -> bool {
        if self.a_hashes.subtree_hash(self.a, a_node) != self.b_hashes.subtree_hash(self.b, b_node)
        {
            return false;
        }
        let structural = self.structural_eq(a_node, b_node);
        if !structural {
            debug!(
                a = a_node.index(),
                b = b_node.index(),
                "tree-hash collision demoted to mismatch"
            );
        }
        structural
    }

    fn structural_eq(&self, a_node: NodeId, b_node: NodeId) -> bool {
        let mut a_iter = self.a.preorder_of(a_node);
        let mut b_iter = self.b.preorder_of(b_node);
        loop {
            match (a_iter.next(), b_iter.next()) {
                (None, None) => return true,
                (Some(x), Some(y)) => {
                    if self.a.children(x).len() != self.b.children(y).len()
                        || !self.nodes_equal(x, y)
                    {
                        return false;
                    }
                }
                _ => return false,
            }
        }
    }

    /// Node equality: hash equality confirmed by payload comparison.
    fn nodes_equal(&self, a_node: NodeId, b_node: NodeId) -> bool {
        self.a_hashes.node_hash(self.a, a_node) == self.b_hashes.node_hash(self.b, b_node)
            && self.a.content(a_node) == self.b.content(b_node)
    }

    /// Pairs two identical subtrees node by node in document order.
    fn pair_subtrees(&self, a_node: NodeId, b_node: NodeId, matching: &mut Matching) -> Result<()> {
        let pairs: Vec<(NodeId, NodeId)> = self
            .a
            .preorder_of(a_node)
            .zip(self.b.preorder_of(b_node))
            .collect();
        for (x, y) in pairs {
            matching.pair(x, y)?;
        }
        Ok(())
    }
}
