//! ctxdiff - context-aware structural diff and patch for tree documents.
//!
//! This library computes, encodes, resolves and applies structural deltas
//! between tree-shaped documents (XML or JsonML). A delta is a sequence of
//! node and forest updates; every operation carries head/tail context
//! fingerprints so that it can be re-anchored in a target document that
//! has drifted from the one the delta was computed against.
//!
//! # Overview
//!
//! Diffing matches the two trees with a top-down/bottom-up XCC pass,
//! derives operations from the matching and fingerprints each anchor from
//! the document-order index. Patching resolves each operation's anchor in
//! the target (exact path first, context search second), then applies the
//! operations as reversible hunks that can be toggled on and off.
//!
//! # Example
//!
//! ```
//! use ctxdiff::{apply, diff, parse_document, ApplyMode, Family, ResolverConfig, DEFAULT_RADIUS};
//!
//! let a = parse_document(Family::Json, r#"["ul", ["li", "a"], ["li", "c"]]"#)?;
//! let b = parse_document(Family::Json, r#"["ul", ["li", "a"], ["li", "b"], ["li", "c"]]"#)?;
//! let delta = diff(&a, &b, DEFAULT_RADIUS)?;
//!
//! let mut target = parse_document(Family::Json, r#"["ul", ["li", "a"], ["li", "c"]]"#)?;
//! apply(&mut target, &delta, ApplyMode::Strict, &ResolverConfig::default())?;
//! # Ok::<(), ctxdiff::Error>(())
//! ```

pub mod delta;
pub mod doc;
pub mod error;
pub mod matching;
pub mod patch;
pub mod resolver;
pub mod tree;

// Re-export commonly used types
pub use delta::{
    diff, AttachedOperation, DeltaEditor, DetachedOperation, FingerprintFactory, OpKind, Subtree,
    DEFAULT_RADIUS,
};
pub use doc::format::{decode_delta, encode_delta, PatchFormat};
pub use doc::{parse_document, serialize_document, Family};
pub use error::{Error, Result};
pub use matching::{ContextMatcher, Matching, XccMatcher};
pub use patch::{apply, ApplyMode, ApplyReport, Hunk, PatchSession};
pub use resolver::{ContextResolver, ResolverConfig};
pub use tree::{
    Anchor, Content, DocOrderIndex, Element, Fnv32, GenerationIndex, HashCache, NodeId, Tree,
};
