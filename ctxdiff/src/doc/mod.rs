//! Document families.
//!
//! A family is a concrete document representation together with its
//! parser, serializer and fragment embedding: XML via quick-xml, JsonML
//! via serde_json. Both project onto the shared element/text content
//! model, so the engine itself never touches wire syntax.

pub mod format;
pub mod jsonml;
pub mod xml;

use std::path::Path;

use crate::error::{Error, Result};
use crate::tree::Tree;

/// A supported document family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    /// XML documents (`application/xml`, `text/xml`, `*+xml`).
    Xml,
    /// JsonML documents (`application/json`).
    Json,
}

impl Family {
    /// Picks the family for a MIME type.
    pub fn from_mime(mime: &str) -> Option<Family> {
        match mime {
            "application/json" => Some(Family::Json),
            "application/xml" | "text/xml" => Some(Family::Xml),
            other if other.ends_with("+xml") => Some(Family::Xml),
            _ => None,
        }
    }

    /// The canonical MIME type of this family.
    pub fn mime(&self) -> &'static str {
        match self {
            Family::Xml => "application/xml",
            Family::Json => "application/json",
        }
    }

    /// Detects the family of a file via its MIME type.
    pub fn from_path(path: &Path) -> Result<Family> {
        let mime = mime_for_path(path).ok_or_else(|| {
            Error::UnsupportedType(format!("no known MIME type for {}", path.display()))
        })?;
        Family::from_mime(mime).ok_or_else(|| {
            Error::UnsupportedType(format!("no document family for MIME type {}", mime))
        })
    }
}

/// Maps a file extension to its MIME type.
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "json" => Some("application/json"),
        "xml" => Some("application/xml"),
        "xhtml" => Some("application/xhtml+xml"),
        "svg" => Some("image/svg+xml"),
        "rss" => Some("application/rss+xml"),
        "atom" => Some("application/atom+xml"),
        _ => None,
    }
}

/// Parses a document of the given family into a tree.
pub fn parse_document(family: Family, text: &str) -> Result<Tree> {
    match family {
        Family::Xml => xml::parse_str(text),
        Family::Json => jsonml::parse_str(text),
    }
}

/// Serializes a tree as a document of the given family.
pub fn serialize_document(family: Family, tree: &Tree) -> Result<String> {
    match family {
        Family::Xml => Ok(xml::serialize(tree)),
        Family::Json => jsonml::serialize(tree),
    }
}
