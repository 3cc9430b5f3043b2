//! Delta editor.
//!
//! Walks a matching bottom-up and derives the minimal operation sequence:
//! for every matched pair whose child lists disagree, the stable spine of
//! the two lists is aligned and each gap becomes a forest update; a
//! matched pair with differing payloads becomes a node update. Material
//! inside a gap is emitted wholesale as remove+insert, never recursed
//! into, so moves and reorders come out as delete/insert pairs.

use tracing::trace;

use super::fingerprint::FingerprintFactory;
use super::{DetachedOperation, OpKind, Subtree};
use crate::error::Result;
use crate::matching::{skeleton_gaps, Matching};
use crate::tree::{Anchor, HashCache, NodeId, Tree};

/// Derives detached operations from a matching.
pub struct DeltaEditor<'a> {
    a: &'a Tree,
    b: &'a Tree,
    matching: &'a Matching,
    a_hashes: &'a HashCache,
    b_hashes: &'a HashCache,
    fingerprints: &'a FingerprintFactory<'a>,
}

impl<'a> DeltaEditor<'a> {
    /// Creates an editor over two matched trees.
    pub fn new(
        a: &'a Tree,
        b: &'a Tree,
        matching: &'a Matching,
        a_hashes: &'a HashCache,
        b_hashes: &'a HashCache,
        fingerprints: &'a FingerprintFactory<'a>,
    ) -> Self {
        DeltaEditor {
            a,
            b,
            matching,
            a_hashes,
            b_hashes,
            fingerprints,
        }
    }

    /// Collects the operation sequence, children before parents.
    pub fn collect(&self) -> Result<Vec<DetachedOperation>> {
        let mut ops = Vec::new();
        self.emit_pair(self.a.root(), self.b.root(), &mut ops)?;
        Ok(ops)
    }

    fn emit_pair(
        &self,
        a_node: NodeId,
        b_node: NodeId,
        ops: &mut Vec<DetachedOperation>,
    ) -> Result<()> {
        let a_children = self.a.children(a_node);
        let b_children = self.b.children(b_node);
        let (spine, gaps) = skeleton_gaps(a_children, b_children, |&ca, &cb| {
            self.matching.partner_in_b(ca) == Some(cb)
        });

        for &(ai, bi) in &spine {
            self.emit_pair(a_children[ai], b_children[bi], ops)?;
        }

        for gap in gaps {
            let remove: Vec<Subtree> = a_children[gap.a_start..gap.a_end]
                .iter()
                .map(|&c| Subtree::from_node(self.a, c))
                .collect();
            let insert: Vec<Subtree> = b_children[gap.b_start..gap.b_end]
                .iter()
                .map(|&c| Subtree::from_node(self.b, c))
                .collect();
            let anchor = Anchor::slot(self.a, a_node, gap.a_start);
            let mut path = self.a.path_of(a_node);
            path.push(gap.a_start);
            trace!(?path, removed = remove.len(), inserted = insert.len(), "forest update");
            ops.push(DetachedOperation {
                kind: OpKind::UpdateForest,
                head: self.fingerprints.head(&anchor)?,
                tail: self.fingerprints.tail(&anchor, remove.len())?,
                path,
                remove,
                insert,
            });
        }

        if !self.payloads_equal(a_node, b_node) {
            let anchor = Anchor::node(self.a, a_node);
            let path = self.a.path_of(a_node);
            trace!(?path, "node update");
            ops.push(DetachedOperation {
                kind: OpKind::UpdateNode,
                head: self.fingerprints.head(&anchor)?,
                tail: self.fingerprints.tail(&anchor, 0)?,
                path,
                remove: vec![Subtree::shallow(self.a, a_node)],
                insert: vec![Subtree::shallow(self.b, b_node)],
            });
        }
        Ok(())
    }

    fn payloads_equal(&self, a_node: NodeId, b_node: NodeId) -> bool {
        self.a_hashes.node_hash(self.a, a_node) == self.b_hashes.node_hash(self.b, b_node)
            && self.a.content(a_node) == self.b.content(b_node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::{diff, DEFAULT_RADIUS};
    use crate::tree::Content;

    fn list_tree(items: &[&str]) -> Tree {
        let mut t = Tree::with_root(Content::element("ul"));
        for item in items {
            let li = t.push(Content::element("li"));
            let text = t.push(Content::text(*item));
            t.append(t.root(), li).unwrap();
            t.append(li, text).unwrap();
        }
        t
    }

    #[test]
    fn test_identical_trees_give_empty_delta() {
        let a = list_tree(&["a", "b"]);
        let b = list_tree(&["a", "b"]);
        assert!(diff(&a, &b, DEFAULT_RADIUS).unwrap().is_empty());
    }

    #[test]
    fn test_text_change_is_one_forest_update() {
        let mut a = Tree::with_root(Content::element("p"));
        let t1 = a.push(Content::text("hello"));
        a.append(a.root(), t1).unwrap();

        let mut b = Tree::with_root(Content::element("p"));
        let t2 = b.push(Content::text("world"));
        b.append(b.root(), t2).unwrap();

        let ops = diff(&a, &b, DEFAULT_RADIUS).unwrap();
        assert_eq!(ops.len(), 1);
        let op = &ops[0];
        assert_eq!(op.kind, OpKind::UpdateForest);
        assert_eq!(op.path, vec![0]);
        assert_eq!(op.remove, vec![Subtree::new(Content::text("hello"))]);
        assert_eq!(op.insert, vec![Subtree::new(Content::text("world"))]);
        assert_eq!(op.head, vec![0; 4]);
        assert_eq!(op.tail, vec![0; 4]);
    }

    #[test]
    fn test_attribute_change_is_one_node_update() {
        let a = Tree::with_root(Content::element("a"));
        let mut elem = crate::tree::Element::new("a");
        elem.set_attr("href", "x");
        let b = Tree::with_root(Content::Element(elem.clone()));

        let ops = diff(&a, &b, DEFAULT_RADIUS).unwrap();
        assert_eq!(ops.len(), 1);
        let op = &ops[0];
        assert_eq!(op.kind, OpKind::UpdateNode);
        assert_eq!(op.path, Vec::<usize>::new());
        assert_eq!(op.remove, vec![Subtree::new(Content::element("a"))]);
        assert_eq!(op.insert, vec![Subtree::new(Content::Element(elem))]);
    }

    #[test]
    fn test_sibling_insertion_anchors_at_gap() {
        let a = list_tree(&["a", "c"]);
        let b = list_tree(&["a", "b", "c"]);

        let ops = diff(&a, &b, DEFAULT_RADIUS).unwrap();
        assert_eq!(ops.len(), 1);
        let op = &ops[0];
        assert_eq!(op.kind, OpKind::UpdateForest);
        assert_eq!(op.path, vec![1]);
        assert!(op.remove.is_empty());
        assert_eq!(op.insert.len(), 1);
        assert_eq!(op.insert[0].content, Content::element("li"));
        assert_eq!(op.insert[0].children[0].content, Content::text("b"));
    }

    #[test]
    fn test_nested_edits_come_out_children_first() {
        // Change a text deep in the first item and append a new item.
        let a = list_tree(&["x", "y"]);
        let b = list_tree(&["x2", "y", "z"]);

        let ops = diff(&a, &b, DEFAULT_RADIUS).unwrap();
        assert_eq!(ops.len(), 2);
        // The deep text edit precedes the top-level append.
        assert_eq!(ops[0].path, vec![0, 0]);
        assert_eq!(ops[1].path, vec![2]);
    }

    #[test]
    fn test_removal_emits_remove_run() {
        let a = list_tree(&["a", "b", "c"]);
        let b = list_tree(&["a", "c"]);

        let ops = diff(&a, &b, DEFAULT_RADIUS).unwrap();
        assert_eq!(ops.len(), 1);
        let op = &ops[0];
        assert_eq!(op.path, vec![1]);
        assert_eq!(op.remove.len(), 1);
        assert!(op.insert.is_empty());
        assert_eq!(op.remove[0].children[0].content, Content::text("b"));
    }
}
