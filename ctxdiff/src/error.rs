//! Error types for ctxdiff.

use thiserror::Error;

/// Result type alias for ctxdiff operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during diffing, resolution and patching.
#[derive(Error, Debug)]
pub enum Error {
    /// The tree violates a structural invariant (double parent, corrupt
    /// child bookkeeping).
    #[error("invalid tree: {0}")]
    InvalidTree(String),

    /// Unknown operation tag in a patch, or an unsupported document family.
    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    /// No anchor in the target tree scored above the acceptance threshold.
    #[error("resolution failed: {0}")]
    ResolutionFailed(String),

    /// The remove list of an operation does not match the nodes at the
    /// resolved anchor.
    #[error("apply precondition failed: {0}")]
    ApplyPrecondition(String),

    /// API contract violation (missing index entry, double match, bad path).
    #[error("parameter error: {0}")]
    Parameter(String),

    /// Document or patch parsing error.
    #[error("parse error: {0}")]
    Parse(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// XML error from quick-xml.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// JSON error from serde_json.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
