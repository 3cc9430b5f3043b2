//! JsonML codec.
//!
//! JsonML encodes an element as an array of tag string, optional
//! attribute object and children; text runs are plain strings. Attribute
//! values may be strings, numbers or booleans on input and are stored as
//! strings.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::delta::Subtree;
use crate::error::{Error, Result};
use crate::tree::{Content, Element, NodeId, Tree};

/// Parses a JsonML document into a tree.
pub fn parse_str(text: &str) -> Result<Tree> {
    let value: Value = serde_json::from_str(text)?;
    tree_from_value(&value)
}

/// Converts a JsonML value into a tree. The root must be an element.
pub fn tree_from_value(value: &Value) -> Result<Tree> {
    let subtree = subtree_from_value(value)?;
    if !subtree.content.is_element() {
        return Err(Error::UnsupportedType(
            "JsonML document root must be an element".into(),
        ));
    }
    subtree.to_tree()
}

/// Serializes a tree as a pretty-printed JsonML document.
pub fn serialize(tree: &Tree) -> Result<String> {
    Ok(serde_json::to_string_pretty(&value_from_tree(tree))?)
}

/// Converts a tree into its JsonML value.
pub fn value_from_tree(tree: &Tree) -> Value {
    value_from_node(tree, tree.root())
}

fn value_from_node(tree: &Tree, id: NodeId) -> Value {
    match tree.content(id) {
        Content::Text(text) => Value::String(text.clone()),
        Content::Element(element) => {
            let mut items = element_header(element);
            for &child in tree.children(id) {
                items.push(value_from_node(tree, child));
            }
            Value::Array(items)
        }
    }
}

/// Converts a detached subtree into its JsonML value.
pub fn value_from_subtree(subtree: &Subtree) -> Value {
    match &subtree.content {
        Content::Text(text) => Value::String(text.clone()),
        Content::Element(element) => {
            let mut items = element_header(element);
            for child in &subtree.children {
                items.push(value_from_subtree(child));
            }
            Value::Array(items)
        }
    }
}

fn element_header(element: &Element) -> Vec<Value> {
    let mut items = vec![Value::String(element.name().to_string())];
    if !element.attrs().is_empty() {
        let attrs: Map<String, Value> = element
            .attrs()
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        items.push(Value::Object(attrs));
    }
    items
}

/// Converts a JsonML value into a detached subtree.
pub fn subtree_from_value(value: &Value) -> Result<Subtree> {
    match value {
        Value::String(text) => Ok(Subtree::new(Content::text(text.clone()))),
        Value::Array(items) => {
            let tag = items
                .first()
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    Error::UnsupportedType(
                        "JsonML element must start with a tag string".into(),
                    )
                })?;
            let mut attrs = BTreeMap::new();
            let mut rest = &items[1..];
            if let Some(Value::Object(map)) = rest.first() {
                for (key, value) in map {
                    attrs.insert(key.clone(), attr_string(value)?);
                }
                rest = &rest[1..];
            }
            let children = rest
                .iter()
                .map(subtree_from_value)
                .collect::<Result<Vec<Subtree>>>()?;
            Ok(Subtree {
                content: Content::Element(Element::with_attrs(tag, attrs)),
                children,
            })
        }
        other => Err(Error::UnsupportedType(format!(
            "JsonML node must be a string or an array, found {}",
            json_kind(other)
        ))),
    }
}

fn attr_string(value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(Error::UnsupportedType(format!(
            "JsonML attribute value must be scalar, found {}",
            json_kind(other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
