//! Context resolution.
//!
//! Locates the anchor of a detached operation in a target tree that need
//! not be identical to the tree the delta was computed from. The stored
//! path is tried first; when its site does not carry the expected context,
//! candidate anchors around the path-derived position are scored with the
//! context matcher and the best accepted candidate wins.

use tracing::{debug, trace};

use crate::delta::{DetachedOperation, FingerprintFactory, OpKind};
use crate::error::{Error, Result};
use crate::matching::ContextMatcher;
use crate::tree::{Anchor, DocOrderIndex, HashCache, Tree};

/// Named thresholds of the resolver.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Maximum distance, in document-order positions, between the
    /// path-derived guess and an accepted candidate.
    pub search_radius: usize,
    /// Fraction of tail entries that must match at an accepted site.
    pub tail_threshold: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            search_radius: 32,
            tail_threshold: 0.5,
        }
    }
}

/// One scored candidate during the windowed search.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    anchor: Anchor,
    score: u32,
    distance: usize,
    position: usize,
}

/// Resolves detached operations against one target tree.
pub struct ContextResolver<'a> {
    tree: &'a Tree,
    index: &'a DocOrderIndex,
    hashes: &'a HashCache,
    config: ResolverConfig,
}

impl<'a> ContextResolver<'a> {
    /// Creates a resolver over a target tree and its indexes.
    pub fn new(
        tree: &'a Tree,
        index: &'a DocOrderIndex,
        hashes: &'a HashCache,
        config: ResolverConfig,
    ) -> Self {
        ContextResolver {
            tree,
            index,
            hashes,
            config,
        }
    }

    /// Finds the best anchor for an operation.
    ///
    /// Fails with [`Error::ResolutionFailed`] when no candidate within the
    /// search radius reaches the acceptance thresholds.
    pub fn resolve(&self, op: &DetachedOperation) -> Result<Anchor> {
        let radius = op.head.len().max(op.tail.len());
        let fingerprints = FingerprintFactory::new(self.tree, self.index, self.hashes, radius);
        let matcher = ContextMatcher::new(&op.head, &op.tail);

        if let Some(anchor) = self.anchor_at_path(op) {
            let head = fingerprints.head(&anchor)?;
            let tail = fingerprints.tail(&anchor, op.removed_siblings())?;
            if matcher.strict(&head, &tail) {
                trace!(path = ?op.path, "fast path hit");
                return Ok(anchor);
            }
        }

        let guess = self.guess_position(op);
        let mut best: Option<Candidate> = None;
        for anchor in self.candidates(op, guess) {
            let position = fingerprints.anchor_position(&anchor)?;
            let distance = position.abs_diff(guess);
            if distance > self.config.search_radius {
                continue;
            }
            let head = fingerprints.head(&anchor)?;
            let tail = fingerprints.tail(&anchor, op.removed_siblings())?;
            if !self.accepts(op, &matcher, &head, &tail) {
                continue;
            }
            let candidate = Candidate {
                anchor,
                score: matcher.score(&head, &tail),
                distance,
                position,
            };
            trace!(
                position,
                score = candidate.score,
                distance,
                "candidate accepted"
            );
            if Self::better(&candidate, &best) {
                best = Some(candidate);
            }
        }

        match best {
            Some(candidate) => {
                debug!(
                    path = ?op.path,
                    position = candidate.position,
                    score = candidate.score,
                    "anchor resolved by windowed search"
                );
                Ok(candidate.anchor)
            }
            None => Err(Error::ResolutionFailed(format!(
                "no anchor for operation at path /{}",
                op.path
                    .iter()
                    .map(|i| i.to_string())
                    .collect::<Vec<_>>()
                    .join("/")
            ))),
        }
    }

    /// Acceptance rule: all non-zero head entries match exactly, enough of
    /// the tail matches, and a removing operation has at least one exact
    /// non-zero hit.
    fn accepts(
        &self,
        op: &DetachedOperation,
        matcher: &ContextMatcher<'_>,
        head: &[u32],
        tail: &[u32],
    ) -> bool {
        let strict_head = op
            .head
            .iter()
            .enumerate()
            .all(|(i, &q)| q == 0 || head.get(i) == Some(&q));
        if !strict_head {
            return false;
        }
        let tail_len = matcher.tail_len();
        if tail_len > 0 {
            let needed = (self.config.tail_threshold * tail_len as f64).ceil() as usize;
            if matcher.tail_hits(tail) < needed {
                return false;
            }
        }
        if !op.remove.is_empty() && matcher.exact_hits(head, tail) == 0 {
            return false;
        }
        true
    }

    /// Follows the stored path exactly; `None` when it does not address a
    /// usable site in this tree.
    fn anchor_at_path(&self, op: &DetachedOperation) -> Option<Anchor> {
        match op.kind {
            OpKind::UpdateNode => {
                let node = self.tree.node_at_path(&op.path)?;
                Some(Anchor::node(self.tree, node))
            }
            OpKind::UpdateForest => {
                let (&slot, parent_path) = op.path.split_last()?;
                let base = self.tree.node_at_path(parent_path)?;
                let child_count = self.tree.children(base).len();
                if slot > child_count || slot + op.remove.len() > child_count {
                    return None;
                }
                Some(Anchor::slot(self.tree, base, slot))
            }
        }
    }

    /// Approximates the document-order position the path points at,
    /// clamping out-of-range steps to the nearest existing child.
    fn guess_position(&self, op: &DetachedOperation) -> usize {
        let mut node = self.tree.root();
        let mut followed_all = true;
        for &step in &op.path {
            let children = self.tree.children(node);
            match children.get(step).or_else(|| children.last()) {
                Some(&child) => node = child,
                None => {
                    followed_all = false;
                    break;
                }
            }
        }
        let position = self.index.position(node).unwrap_or(0);
        if op.kind == OpKind::UpdateForest && !op.path.is_empty() && followed_all {
            // The walk landed on the child occupying the slot (or the last
            // child when the slot is past the end); for a past-the-end
            // slot the site is one past that child's subtree.
            let slot = op.path[op.path.len() - 1];
            if self
                .tree
                .parent(node)
                .map(|p| self.tree.children(p).len() <= slot)
                .unwrap_or(false)
            {
                return position + self.index.size(node);
            }
        }
        position
    }

    /// Enumerates candidate anchors for the operation near `guess`.
    fn candidates(&self, op: &DetachedOperation, guess: usize) -> Vec<Anchor> {
        let mut anchors = Vec::new();
        match op.kind {
            OpKind::UpdateNode => {
                let lo = guess.saturating_sub(self.config.search_radius);
                let hi = (guess + self.config.search_radius).min(self.index.len().saturating_sub(1));
                for position in lo..=hi {
                    if let Some(node) = self.index.node_at(position) {
                        anchors.push(Anchor::node(self.tree, node));
                    }
                }
            }
            OpKind::UpdateForest => {
                // Every slot of every element is a potential site,
                // including the append slot past the last child; the
                // radius filter happens in the scoring loop.
                for node in self.tree.preorder() {
                    if !self.tree.content(node).is_element() {
                        continue;
                    }
                    let child_count = self.tree.children(node).len();
                    for slot in 0..=child_count {
                        if slot + op.remove.len() > child_count {
                            break;
                        }
                        anchors.push(Anchor::slot(self.tree, node, slot));
                    }
                }
            }
        }
        anchors
    }

    /// Ordering: higher score, then closer to the guess, then earlier
    /// document order.
    fn better(candidate: &Candidate, best: &Option<Candidate>) -> bool {
        match best {
            None => true,
            Some(current) => {
                let lhs = (
                    candidate.score,
                    std::cmp::Reverse(candidate.distance),
                    std::cmp::Reverse(candidate.position),
                );
                let rhs = (
                    current.score,
                    std::cmp::Reverse(current.distance),
                    std::cmp::Reverse(current.position),
                );
                lhs > rhs
            }
        }
    }
}
