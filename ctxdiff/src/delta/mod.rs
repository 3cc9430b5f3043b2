//! Delta model.
//!
//! Operations come in two kinds: a node update replaces one node's payload
//! in place, a forest update splices a run of sibling subtrees. Detached
//! operations carry a child-index path and head/tail context fingerprints;
//! attaching binds them to a concrete anchor in a target tree.

pub mod editor;
pub mod fingerprint;

pub use editor::DeltaEditor;
pub use fingerprint::{FingerprintFactory, DEFAULT_RADIUS};

use crate::error::Result;
use crate::matching::XccMatcher;
use crate::tree::{Anchor, Content, DocOrderIndex, HashCache, NodeId, Tree};

/// The closed set of operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    /// Replace one node's payload, keeping its children.
    UpdateNode,
    /// Replace a run of sibling subtrees with another run.
    UpdateForest,
}

/// A detached subtree, used for the remove and insert forests of an
/// operation. Node-update payloads are shallow subtrees without children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subtree {
    /// Payload of the subtree root.
    pub content: Content,
    /// Child subtrees in order.
    pub children: Vec<Subtree>,
}

impl Subtree {
    /// Creates a leaf subtree.
    pub fn new(content: Content) -> Self {
        Subtree {
            content,
            children: Vec::new(),
        }
    }

    /// Copies the whole subtree rooted at a tree node.
    pub fn from_node(tree: &Tree, id: NodeId) -> Self {
        Subtree {
            content: tree.content(id).clone(),
            children: tree
                .children(id)
                .iter()
                .map(|&child| Subtree::from_node(tree, child))
                .collect(),
        }
    }

    /// Copies only the payload of a tree node.
    pub fn shallow(tree: &Tree, id: NodeId) -> Self {
        Subtree::new(tree.content(id).clone())
    }

    /// Number of nodes in this subtree.
    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(Subtree::node_count)
            .sum::<usize>()
    }

    /// Builds this subtree as detached nodes of `tree` and returns the id
    /// of its root.
    pub fn graft(&self, tree: &mut Tree) -> Result<NodeId> {
        let id = tree.push(self.content.clone());
        for child in &self.children {
            let child_id = child.graft(tree)?;
            tree.append(id, child_id)?;
        }
        Ok(id)
    }

    /// Builds a standalone tree from this subtree.
    pub fn to_tree(&self) -> Result<Tree> {
        let mut tree = Tree::with_root(self.content.clone());
        let root = tree.root();
        for child in &self.children {
            let child_id = child.graft(&mut tree)?;
            tree.append(root, child_id)?;
        }
        Ok(tree)
    }
}

/// A family-neutral operation record, locatable by path and context
/// fingerprints.
#[derive(Debug, Clone, PartialEq)]
pub struct DetachedOperation {
    /// Operation kind.
    pub kind: OpKind,
    /// Child-index path from the root to the anchor; empty for the root.
    pub path: Vec<usize>,
    /// Forest removed at the anchor (one shallow payload for node
    /// updates).
    pub remove: Vec<Subtree>,
    /// Forest inserted at the anchor.
    pub insert: Vec<Subtree>,
    /// Node hashes of the nodes preceding the anchor in document order.
    pub head: Vec<u32>,
    /// Node hashes of the nodes at and after the anchor, with removed
    /// subtrees skipped.
    pub tail: Vec<u32>,
}

impl DetachedOperation {
    /// Number of sibling subtrees the operation removes at its anchor.
    pub fn removed_siblings(&self) -> usize {
        match self.kind {
            OpKind::UpdateNode => 0,
            OpKind::UpdateForest => self.remove.len(),
        }
    }
}

/// A detached operation bound to a concrete anchor in a target tree.
#[derive(Debug, Clone)]
pub struct AttachedOperation {
    /// The resolved anchor in the target tree.
    pub anchor: Anchor,
    /// The operation record.
    pub op: DetachedOperation,
}

/// Computes the delta that transforms `a` into `b`.
///
/// `radius` is the fingerprint radius; pass [`DEFAULT_RADIUS`] unless the
/// patch needs wider context.
pub fn diff(a: &Tree, b: &Tree, radius: usize) -> Result<Vec<DetachedOperation>> {
    let a_hashes = HashCache::new(a);
    let b_hashes = HashCache::new(b);
    let matching = XccMatcher::new(a, b, &a_hashes, &b_hashes).match_trees()?;
    let index = DocOrderIndex::build(a);
    let fingerprints = FingerprintFactory::new(a, &index, &a_hashes, radius);
    DeltaEditor::new(a, b, &matching, &a_hashes, &b_hashes, &fingerprints).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtree_from_node_is_deep() {
        let mut t = Tree::with_root(Content::element("ul"));
        let li = t.push(Content::element("li"));
        let text = t.push(Content::text("a"));
        t.append(t.root(), li).unwrap();
        t.append(li, text).unwrap();

        let st = Subtree::from_node(&t, t.root());
        assert_eq!(st.node_count(), 3);
        assert_eq!(st.children[0].children[0].content, Content::text("a"));

        let shallow = Subtree::shallow(&t, t.root());
        assert_eq!(shallow.node_count(), 1);
    }

    #[test]
    fn test_graft_round_trip() {
        let st = Subtree {
            content: Content::element("li"),
            children: vec![Subtree::new(Content::text("b"))],
        };
        let rebuilt = st.to_tree().unwrap();
        assert_eq!(Subtree::from_node(&rebuilt, rebuilt.root()), st);
    }
}
