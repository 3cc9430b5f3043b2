//! Context fingerprints.
//!
//! A fingerprint anchors an operation to its surroundings: the head window
//! holds the node hashes of the `k` nodes preceding the anchor in document
//! order, the tail window the hashes of the nodes at and after it. Window
//! entries that fall outside the document are 0, and so are entries on an
//! ancestor of the anchor: an ancestor's own hash never identifies the
//! site, since every slot below it shares it. Removed sibling subtrees are
//! skipped before the tail so that context survives the edit itself.

use rustc_hash::FxHashSet;

use crate::error::{Error, Result};
use crate::tree::{Anchor, DocOrderIndex, HashCache, NodeId, Tree};

/// Default fingerprint radius.
pub const DEFAULT_RADIUS: usize = 4;

/// Builds head/tail fingerprints around anchors of one indexed tree.
pub struct FingerprintFactory<'a> {
    tree: &'a Tree,
    index: &'a DocOrderIndex,
    hashes: &'a HashCache,
    radius: usize,
}

impl<'a> FingerprintFactory<'a> {
    /// Creates a factory over a tree, its document-order index and hash
    /// cache.
    pub fn new(
        tree: &'a Tree,
        index: &'a DocOrderIndex,
        hashes: &'a HashCache,
        radius: usize,
    ) -> Self {
        FingerprintFactory {
            tree,
            index,
            hashes,
            radius,
        }
    }

    /// The configured window radius.
    pub fn radius(&self) -> usize {
        self.radius
    }

    /// Document-order position of an anchor. An append slot sits one past
    /// the last descendant of its base.
    pub fn anchor_position(&self, anchor: &Anchor) -> Result<usize> {
        if let Some(target) = anchor.target {
            return self
                .index
                .position(target)
                .ok_or_else(|| Error::Parameter("anchor target is not indexed".into()));
        }
        let base = anchor
            .base
            .ok_or_else(|| Error::Parameter("anchor has neither target nor base".into()))?;
        let base_pos = self
            .index
            .position(base)
            .ok_or_else(|| Error::Parameter("anchor base is not indexed".into()))?;
        Ok(base_pos + self.index.size(base))
    }

    /// Head fingerprint: hashes of the `radius` nodes before the anchor,
    /// farthest first.
    pub fn head(&self, anchor: &Anchor) -> Result<Vec<u32>> {
        let position = self.anchor_position(anchor)? as isize;
        let ancestors = self.ancestors_of(anchor);
        let mut window = vec![0u32; self.radius];
        for (i, slot) in window.iter_mut().enumerate() {
            let p = position - (self.radius - i) as isize;
            if p < 0 {
                continue;
            }
            if let Some(node) = self.index.node_at(p as usize) {
                if !ancestors.contains(&node) {
                    *slot = self.hashes.node_hash(self.tree, node);
                }
            }
        }
        Ok(window)
    }

    /// Tail fingerprint: hashes of the `radius` nodes from the anchor on,
    /// after skipping `skip_subtrees` sibling subtrees.
    pub fn tail(&self, anchor: &Anchor, skip_subtrees: usize) -> Result<Vec<u32>> {
        let mut position = self.anchor_position(anchor)?;
        for _ in 0..skip_subtrees {
            match self.index.node_at(position) {
                Some(node) => position += self.index.size(node),
                None => break,
            }
        }
        let mut window = vec![0u32; self.radius];
        for (i, slot) in window.iter_mut().enumerate() {
            if let Some(node) = self.index.node_at(position + i) {
                *slot = self.hashes.node_hash(self.tree, node);
            }
        }
        Ok(window)
    }

    fn ancestors_of(&self, anchor: &Anchor) -> FxHashSet<NodeId> {
        let mut ancestors = FxHashSet::default();
        let mut cursor = anchor.base;
        while let Some(node) = cursor {
            ancestors.insert(node);
            cursor = self.tree.parent(node);
        }
        ancestors
    }
}
