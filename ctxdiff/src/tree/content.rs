//! Node content for tree documents.
//!
//! `Content` is the shared payload model of all document families: an
//! element (tag with attributes) or a text run. XML and JsonML both project
//! onto this shape, so the diff engine never sees family-specific types.

use std::collections::BTreeMap;
use std::fmt;

/// The payload of a tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// An element with a tag name and attributes.
    Element(Element),
    /// A text run.
    Text(String),
}

impl Content {
    /// Creates an element with no attributes.
    pub fn element(name: impl Into<String>) -> Self {
        Content::Element(Element::new(name))
    }

    /// Creates a text run.
    pub fn text(text: impl Into<String>) -> Self {
        Content::Text(text.into())
    }

    /// Returns true if this is an element.
    pub fn is_element(&self) -> bool {
        matches!(self, Content::Element(_))
    }

    /// Returns true if this is a text run.
    pub fn is_text(&self) -> bool {
        matches!(self, Content::Text(_))
    }

    /// Returns a reference to the element, if this is one.
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Content::Element(e) => Some(e),
            Content::Text(_) => None,
        }
    }

    /// Returns the text, if this is a text run.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text(t) => Some(t),
            Content::Element(_) => None,
        }
    }
}

impl fmt::Display for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Content::Element(e) => write!(f, "{}", e),
            Content::Text(t) => write!(f, "{:?}", t),
        }
    }
}

/// An element with a tag name and attributes.
///
/// Attributes are kept in a `BTreeMap` so that iteration is always in
/// ascending key order; the hashing protocol relies on this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attrs: BTreeMap<String, String>,
}

impl Element {
    /// Creates an element with no attributes.
    pub fn new(name: impl Into<String>) -> Self {
        Element {
            name: name.into(),
            attrs: BTreeMap::new(),
        }
    }

    /// Creates an element with the given attributes.
    pub fn with_attrs(name: impl Into<String>, attrs: BTreeMap<String, String>) -> Self {
        Element {
            name: name.into(),
            attrs,
        }
    }

    /// Returns the tag name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the attributes in ascending key order.
    pub fn attrs(&self) -> &BTreeMap<String, String> {
        &self.attrs
    }

    /// Sets an attribute, replacing any previous value.
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attrs.insert(key.into(), value.into());
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.name)?;
        for (k, v) in &self.attrs {
            write!(f, " {}={:?}", k, v)?;
        }
        write!(f, ">")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_kinds() {
        let elem = Content::element("div");
        let text = Content::text("hello");

        assert!(elem.is_element());
        assert!(!elem.is_text());
        assert!(text.is_text());
        assert!(elem.as_element().is_some());
        assert!(elem.as_text().is_none());
        assert_eq!(text.as_text(), Some("hello"));
    }

    #[test]
    fn test_element_attrs_sorted() {
        let mut e = Element::new("a");
        e.set_attr("z", "1");
        e.set_attr("a", "2");
        e.set_attr("m", "3");

        let keys: Vec<&str> = e.attrs().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "m", "z"]);
    }

    #[test]
    fn test_content_equality() {
        let mut attrs = BTreeMap::new();
        attrs.insert("id".to_string(), "foo".to_string());

        let e1 = Content::Element(Element::with_attrs("div", attrs.clone()));
        let e2 = Content::Element(Element::with_attrs("div", attrs));
        let e3 = Content::element("div");

        assert_eq!(e1, e2);
        assert_ne!(e1, e3);
        assert_ne!(e1, Content::text("div"));
    }
}
