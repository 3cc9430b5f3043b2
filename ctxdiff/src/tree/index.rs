//! Tree indexes.
//!
//! The document-order index enumerates a tree in pre-order and supports
//! offset lookups and subtree sizes; the generation index groups nodes by
//! depth. Both are built eagerly with a single walk and must be discarded
//! when the tree is mutated.

use super::{NodeId, Tree};

/// Pre-order enumeration of a tree with cached positions and subtree
/// sizes.
#[derive(Debug, Default)]
pub struct DocOrderIndex {
    order: Vec<NodeId>,
    position: Vec<Option<usize>>,
    size: Vec<usize>,
    complete: bool,
}

impl DocOrderIndex {
    /// Creates an empty, unbuilt index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an index for the given tree.
    pub fn build(tree: &Tree) -> Self {
        let mut index = Self::new();
        index.build_all(tree);
        index
    }

    /// Populates the index with a single pre-order walk.
    ///
    /// Detached nodes are not indexed. The tree must not be mutated while
    /// the index is in use.
    pub fn build_all(&mut self, tree: &Tree) {
        self.order.clear();
        self.position = vec![None; tree.len()];
        self.size = vec![0; tree.len()];
        for node in tree.preorder() {
            self.position[node.index()] = Some(self.order.len());
            self.order.push(node);
        }
        // Pre-order lists every subtree contiguously, so sizes can be
        // accumulated bottom-up.
        for &node in self.order.iter().rev() {
            let children_total: usize = tree
                .children(node)
                .iter()
                .map(|&c| self.size[c.index()])
                .sum();
            self.size[node.index()] = 1 + children_total;
        }
        self.complete = true;
    }

    /// Returns true once `build_all` has run.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Number of indexed nodes.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the index is empty (not yet built).
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Returns the node at a document-order position.
    pub fn node_at(&self, position: usize) -> Option<NodeId> {
        self.order.get(position).copied()
    }

    /// Returns the document-order position of a node.
    pub fn position(&self, id: NodeId) -> Option<usize> {
        self.position.get(id.index()).copied().flatten()
    }

    /// Returns the node `offset` document-order positions away from `id`,
    /// or `None` when out of bounds.
    pub fn get(&self, id: NodeId, offset: isize) -> Option<NodeId> {
        let base = self.position(id)? as isize;
        let target = base + offset;
        if target < 0 {
            return None;
        }
        self.node_at(target as usize)
    }

    /// Returns the node count of the subtree rooted at `id`; 0 for nodes
    /// that were not indexed.
    pub fn size(&self, id: NodeId) -> usize {
        self.size.get(id.index()).copied().unwrap_or(0)
    }
}

/// Per-depth enumeration of a tree in document order.
#[derive(Debug, Default)]
pub struct GenerationIndex {
    rows: Vec<Vec<NodeId>>,
    position: Vec<Option<(usize, usize)>>,
}

impl GenerationIndex {
    /// Builds the index for the given tree.
    pub fn build(tree: &Tree) -> Self {
        let mut rows: Vec<Vec<NodeId>> = Vec::new();
        let mut position = vec![None; tree.len()];
        // Pre-order preserves document order within each depth.
        for node in tree.preorder() {
            let depth = tree.depth(node);
            if depth >= rows.len() {
                rows.resize_with(depth + 1, Vec::new);
            }
            position[node.index()] = Some((depth, rows[depth].len()));
            rows[depth].push(node);
        }
        GenerationIndex { rows, position }
    }

    /// Number of populated generations; the root alone gives 1.
    pub fn depth_count(&self) -> usize {
        self.rows.len()
    }

    /// Returns the nodes of one generation in document order.
    pub fn row(&self, depth: usize) -> &[NodeId] {
        self.rows.get(depth).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First node of a generation.
    pub fn first(&self, depth: usize) -> Option<NodeId> {
        self.row(depth).first().copied()
    }

    /// Last node of a generation.
    pub fn last(&self, depth: usize) -> Option<NodeId> {
        self.row(depth).last().copied()
    }

    /// Returns the node `offset` positions away from `id` within the same
    /// generation.
    pub fn get(&self, id: NodeId, offset: isize) -> Option<NodeId> {
        let (depth, pos) = self.position.get(id.index()).copied().flatten()?;
        let target = pos as isize + offset;
        if target < 0 {
            return None;
        }
        self.row(depth).get(target as usize).copied()
    }
}
