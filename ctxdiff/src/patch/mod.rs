//! Patch application.
//!
//! Each attached operation is materialised as a hunk: a reversible
//! in-place edit that can be toggled on and off. A patch session owns the
//! target tree for its lifetime, resolves every operation against the
//! pristine tree, then activates hunks in order; on a strict-mode failure
//! all previously activated hunks are deactivated in reverse.

use tracing::debug;

use crate::delta::{AttachedOperation, DetachedOperation, OpKind, Subtree};
use crate::error::{Error, Result};
use crate::resolver::{ContextResolver, ResolverConfig};
use crate::tree::{Content, DocOrderIndex, HashCache, NodeId, Tree};

/// How the session treats operations that fail to resolve or apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMode {
    /// Abort on the first failure and restore the tree.
    Strict,
    /// Skip failing operations and report them.
    BestEffort,
}

/// Outcome of applying a delta.
#[derive(Debug, Default)]
pub struct ApplyReport {
    /// Number of activated hunks.
    pub applied: usize,
    /// Skipped operations (delta index, reason), best-effort mode only.
    pub skipped: Vec<(usize, String)>,
}

/// A reversible in-place edit bound to one operation.
#[derive(Debug)]
pub enum Hunk {
    /// Payload replacement on one node.
    Node(NodeHunk),
    /// Sibling-run splice under one parent.
    Forest(ForestHunk),
}

/// Undo state of a node update.
#[derive(Debug)]
pub struct NodeHunk {
    target: NodeId,
    before: Content,
    after: Content,
    active: bool,
}

/// Undo state of a forest update.
#[derive(Debug)]
pub struct ForestHunk {
    base: NodeId,
    /// Sibling that followed the affected run when the hunk was built;
    /// anchors the splice when both runs are detached.
    successor: Option<NodeId>,
    removed: Vec<NodeId>,
    inserted: Vec<NodeId>,
    active: bool,
}

impl Hunk {
    /// Builds a hunk for an attached operation, verifying that the nodes
    /// at the anchor match the operation's remove list.
    ///
    /// Inserted subtrees are grafted as detached nodes, ready to splice.
    pub fn build(tree: &mut Tree, attached: &AttachedOperation) -> Result<Hunk> {
        let op = &attached.op;
        match op.kind {
            OpKind::UpdateNode => {
                let target = attached
                    .anchor
                    .target
                    .ok_or_else(|| Error::Parameter("node update without a target node".into()))?;
                let (remove, insert) = match (&op.remove[..], &op.insert[..]) {
                    ([r], [i]) => (r, i),
                    _ => {
                        return Err(Error::Parameter(
                            "node update must carry exactly one payload on each side".into(),
                        ))
                    }
                };
                if tree.content(target) != &remove.content {
                    return Err(Error::ApplyPrecondition(format!(
                        "payload at {:?} does not match the operation's pre-image",
                        tree.path_of(target)
                    )));
                }
                Ok(Hunk::Node(NodeHunk {
                    target,
                    before: remove.content.clone(),
                    after: insert.content.clone(),
                    active: false,
                }))
            }
            OpKind::UpdateForest => {
                let base = attached
                    .anchor
                    .base
                    .ok_or_else(|| Error::Parameter("forest update without a base node".into()))?;
                let index = attached.anchor.index;
                let children = tree.children(base);
                if index + op.remove.len() > children.len() {
                    return Err(Error::ApplyPrecondition(format!(
                        "remove run exceeds the child list of {:?}",
                        tree.path_of(base)
                    )));
                }
                let removed: Vec<NodeId> = children[index..index + op.remove.len()].to_vec();
                let successor = children.get(index + op.remove.len()).copied();
                for (node, subtree) in removed.iter().zip(&op.remove) {
                    if !subtree_matches(tree, *node, subtree) {
                        return Err(Error::ApplyPrecondition(format!(
                            "subtree at {:?} does not match the operation's remove list",
                            tree.path_of(*node)
                        )));
                    }
                }
                let inserted = op
                    .insert
                    .iter()
                    .map(|subtree| subtree.graft(tree))
                    .collect::<Result<Vec<NodeId>>>()?;
                Ok(Hunk::Forest(ForestHunk {
                    base,
                    successor,
                    removed,
                    inserted,
                    active: false,
                }))
            }
        }
    }

    /// Applies the edit; a no-op when already active.
    pub fn activate(&mut self, tree: &mut Tree) -> Result<()> {
        match self {
            Hunk::Node(hunk) => {
                if !hunk.active {
                    tree.set_content(hunk.target, hunk.after.clone());
                    hunk.active = true;
                }
                Ok(())
            }
            Hunk::Forest(hunk) => {
                if !hunk.active {
                    hunk.splice(tree, true)?;
                    hunk.active = true;
                }
                Ok(())
            }
        }
    }

    /// Reverses the edit; a no-op when already inactive.
    pub fn deactivate(&mut self, tree: &mut Tree) -> Result<()> {
        match self {
            Hunk::Node(hunk) => {
                if hunk.active {
                    tree.set_content(hunk.target, hunk.before.clone());
                    hunk.active = false;
                }
                Ok(())
            }
            Hunk::Forest(hunk) => {
                if hunk.active {
                    hunk.splice(tree, false)?;
                    hunk.active = false;
                }
                Ok(())
            }
        }
    }

    /// Flips between the applied and reversed state.
    pub fn toggle(&mut self, tree: &mut Tree) -> Result<()> {
        if self.is_active() {
            self.deactivate(tree)
        } else {
            self.activate(tree)
        }
    }

    /// Whether the edit is currently applied.
    pub fn is_active(&self) -> bool {
        match self {
            Hunk::Node(hunk) => hunk.active,
            Hunk::Forest(hunk) => hunk.active,
        }
    }
}

impl ForestHunk {
    /// Swaps the attached run for the detached one. The splice index is
    /// recomputed from live child positions so that edits elsewhere in the
    /// same child list do not invalidate it.
    fn splice(&self, tree: &mut Tree, forward: bool) -> Result<()> {
        let (outgoing, incoming) = if forward {
            (&self.removed, &self.inserted)
        } else {
            (&self.inserted, &self.removed)
        };
        let index = match (outgoing.first(), self.successor) {
            (Some(&first), _) => tree.child_index(first),
            (None, Some(successor)) => tree.child_index(successor),
            (None, None) => tree.children(self.base).len(),
        };
        for &node in outgoing {
            tree.detach(node)?;
        }
        for (offset, &node) in incoming.iter().enumerate() {
            tree.insert_child(self.base, index + offset, node)?;
        }
        Ok(())
    }
}

fn subtree_matches(tree: &Tree, id: NodeId, subtree: &Subtree) -> bool {
    tree.content(id) == &subtree.content
        && tree.children(id).len() == subtree.children.len()
        && tree
            .children(id)
            .iter()
            .zip(&subtree.children)
            .all(|(&child, sub)| subtree_matches(tree, child, sub))
}

/// An exclusive patching session over one target tree.
pub struct PatchSession<'t> {
    tree: &'t mut Tree,
    hunks: Vec<Hunk>,
    mode: ApplyMode,
}

impl<'t> PatchSession<'t> {
    /// Starts a session. The tree must not be touched by anyone else
    /// while the session lives.
    pub fn new(tree: &'t mut Tree, mode: ApplyMode) -> Self {
        PatchSession {
            tree,
            hunks: Vec::new(),
            mode,
        }
    }

    /// Resolves and applies a delta.
    ///
    /// All operations are resolved against the pristine tree first; hunks
    /// are then built and activated in delta order. In strict mode any
    /// failure rolls back the session and returns the error; in
    /// best-effort mode failing operations are reported in the result.
    pub fn apply(
        &mut self,
        delta: &[DetachedOperation],
        config: &ResolverConfig,
    ) -> Result<ApplyReport> {
        self.tree.validate()?;

        let mut report = ApplyReport::default();
        let mut attached = Vec::new();
        {
            let index = DocOrderIndex::build(self.tree);
            let hashes = HashCache::new(self.tree);
            let resolver = ContextResolver::new(self.tree, &index, &hashes, config.clone());
            for (i, op) in delta.iter().enumerate() {
                match resolver.resolve(op) {
                    Ok(anchor) => attached.push((
                        i,
                        AttachedOperation {
                            anchor,
                            op: op.clone(),
                        },
                    )),
                    Err(error) => {
                        if self.mode == ApplyMode::Strict {
                            return Err(error);
                        }
                        debug!(op = i, %error, "skipping unresolvable operation");
                        report.skipped.push((i, error.to_string()));
                    }
                }
            }
        }

        for (i, operation) in attached {
            match Hunk::build(self.tree, &operation).and_then(|mut hunk| {
                hunk.activate(self.tree)?;
                Ok(hunk)
            }) {
                Ok(hunk) => self.hunks.push(hunk),
                Err(error) => {
                    if self.mode == ApplyMode::Strict {
                        self.rollback()?;
                        return Err(error);
                    }
                    debug!(op = i, %error, "skipping inapplicable operation");
                    report.skipped.push((i, error.to_string()));
                }
            }
        }

        report.applied = self.hunks.len();
        Ok(report)
    }

    /// Deactivates all hunks in reverse activation order.
    pub fn rollback(&mut self) -> Result<()> {
        for hunk in self.hunks.iter_mut().rev() {
            hunk.deactivate(self.tree)?;
        }
        Ok(())
    }

    /// Number of built hunks.
    pub fn len(&self) -> usize {
        self.hunks.len()
    }

    /// Whether the session holds no hunks.
    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }

    /// Toggles one hunk.
    pub fn toggle(&mut self, index: usize) -> Result<()> {
        let hunk = self
            .hunks
            .get_mut(index)
            .ok_or_else(|| Error::Parameter(format!("no hunk at index {}", index)))?;
        hunk.toggle(self.tree)
    }

    /// Whether the hunk at `index` is active.
    pub fn is_active(&self, index: usize) -> bool {
        self.hunks.get(index).map(Hunk::is_active).unwrap_or(false)
    }
}

/// Resolves and applies a delta in one call, without keeping the session.
pub fn apply(
    tree: &mut Tree,
    delta: &[DetachedOperation],
    mode: ApplyMode,
    config: &ResolverConfig,
) -> Result<ApplyReport> {
    let mut session = PatchSession::new(tree, mode);
    session.apply(delta, config)
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

    fn texts(tree: &Tree) -> Vec<String> {
        tree.preorder()
            .filter_map(|n| tree.content(n).as_text().map(str::to_string))
            .collect()
    }

    #[test]
    fn test_apply_round_trip() {
        let a = list_tree(&["a", "c"]);
        let b = list_tree(&["a", "b", "c"]);
        let delta = diff(&a, &b, DEFAULT_RADIUS).unwrap();

        let mut target = list_tree(&["a", "c"]);
        let report = apply(
            &mut target,
            &delta,
            ApplyMode::Strict,
            &ResolverConfig::default(),
        )
        .unwrap();

        assert_eq!(report.applied, 1);
        assert!(report.skipped.is_empty());
        assert_eq!(texts(&target), vec!["a", "b", "c"]);
        target.validate().unwrap();
    }

    #[test]
    fn test_apply_to_diverged_tree() {
        let a = list_tree(&["a", "c"]);
        let b = list_tree(&["a", "b", "c"]);
        let delta = diff(&a, &b, DEFAULT_RADIUS).unwrap();

        let mut target = list_tree(&["a", "c", "d"]);
        apply(
            &mut target,
            &delta,
            ApplyMode::Strict,
            &ResolverConfig::default(),
        )
        .unwrap();
        assert_eq!(texts(&target), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_strict_failure_leaves_tree_unchanged() {
        let a = list_tree(&["a", "c"]);
        let b = list_tree(&["a", "b", "c"]);
        let delta = diff(&a, &b, DEFAULT_RADIUS).unwrap();

        let mut target = Tree::with_root(Content::element("ol"));
        let x = target.push(Content::element("x"));
        target.append(target.root(), x).unwrap();

        let err = apply(
            &mut target,
            &delta,
            ApplyMode::Strict,
            &ResolverConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::ResolutionFailed(_)));
        assert_eq!(target.children(target.root()).len(), 1);
        target.validate().unwrap();
    }

    #[test]
    fn test_best_effort_reports_skips() {
        let a = list_tree(&["a", "c"]);
        let b = list_tree(&["a", "b", "c"]);
        let delta = diff(&a, &b, DEFAULT_RADIUS).unwrap();

        let mut target = Tree::with_root(Content::element("ol"));
        let report = apply(
            &mut target,
            &delta,
            ApplyMode::BestEffort,
            &ResolverConfig::default(),
        )
        .unwrap();
        assert_eq!(report.applied, 0);
        assert_eq!(report.skipped.len(), 1);
    }

    #[test]
    fn test_toggle_involution() {
        let a = list_tree(&["a", "c"]);
        let b = list_tree(&["a", "b", "c"]);
        let delta = diff(&a, &b, DEFAULT_RADIUS).unwrap();

        let mut target = list_tree(&["a", "c"]);
        let mut session = PatchSession::new(&mut target, ApplyMode::Strict);
        session.apply(&delta, &ResolverConfig::default()).unwrap();
        assert!(session.is_active(0));

        session.toggle(0).unwrap();
        assert!(!session.is_active(0));
        session.toggle(0).unwrap();
        assert!(session.is_active(0));
        drop(session);

        assert_eq!(texts(&target), vec!["a", "b", "c"]);
        target.validate().unwrap();
    }

    #[test]
    fn test_toggle_off_restores_original() {
        let a = list_tree(&["a", "b", "c"]);
        let b = list_tree(&["a", "c"]);
        let delta = diff(&a, &b, DEFAULT_RADIUS).unwrap();

        let mut target = list_tree(&["a", "b", "c"]);
        let mut session = PatchSession::new(&mut target, ApplyMode::Strict);
        session.apply(&delta, &ResolverConfig::default()).unwrap();
        session.toggle(0).unwrap();
        drop(session);

        assert_eq!(texts(&target), vec!["a", "b", "c"]);
        target.validate().unwrap();
    }

    #[test]
    fn test_node_update_precondition() {
        let a = Tree::with_root(Content::element("a"));
        let mut elem = crate::tree::Element::new("a");
        elem.set_attr("href", "x");
        let b = Tree::with_root(Content::Element(elem));
        let delta = diff(&a, &b, DEFAULT_RADIUS).unwrap();

        // Applying to the original succeeds.
        let mut target = Tree::with_root(Content::element("a"));
        apply(
            &mut target,
            &delta,
            ApplyMode::Strict,
            &ResolverConfig::default(),
        )
        .unwrap();
        let elem = target.content(target.root()).as_element().unwrap();
        assert_eq!(elem.attrs().get("href").map(String::as_str), Some("x"));
    }
}
