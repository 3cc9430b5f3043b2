//! Patch wire format.
//!
//! A serialized delta is a `delta` root holding one element per operation,
//! tagged `node` or `forest`, with a slash-separated `path` attribute and
//! four children in order: head context, removed forest, inserted forest,
//! tail context. Context text is the fingerprint as semicolon-separated
//! lowercase hex with empty entries standing for 0. The delta itself can
//! be encoded as XML or as JsonML; remove/insert forests embed natively
//! when the patch encoding and the document family agree and as escaped
//! strings otherwise.

use serde_json::Value;
use std::path::Path;

use super::{jsonml, xml, Family};
use crate::delta::{DetachedOperation, OpKind, Subtree};
use crate::error::{Error, Result};
use crate::tree::{NodeId, Tree};

/// Root element of a serialized delta.
pub const DELTA_TAG: &str = "delta";
/// Operation tag for node updates.
pub const NODE_OP_TAG: &str = "node";
/// Operation tag for forest updates.
pub const FOREST_OP_TAG: &str = "forest";
/// Context (fingerprint) element tag.
pub const CONTEXT_TAG: &str = "context";
/// Removed-forest element tag.
pub const REMOVE_TAG: &str = "remove";
/// Inserted-forest element tag.
pub const INSERT_TAG: &str = "insert";
/// Path attribute on operation elements.
pub const PATH_ATTR: &str = "path";

/// Encoding of a serialized patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchFormat {
    /// XML patch document.
    Xml,
    /// JsonML patch document.
    Json,
}

impl PatchFormat {
    /// Picks the patch format a file extension implies.
    pub fn from_path(path: &Path) -> Option<PatchFormat> {
        match super::mime_for_path(path)? {
            "application/json" => Some(PatchFormat::Json),
            _ => Some(PatchFormat::Xml),
        }
    }
}

/// Renders a fingerprint as semicolon-separated lowercase hex; zero
/// entries render empty.
pub fn fingerprint_to_hex(entries: &[u32]) -> String {
    entries
        .iter()
        .map(|&e| if e == 0 { String::new() } else { format!("{:x}", e) })
        .collect::<Vec<_>>()
        .join(";")
}

/// Parses a semicolon-separated hex fingerprint.
pub fn fingerprint_from_hex(text: &str) -> Result<Vec<u32>> {
    if text.is_empty() {
        return Ok(Vec::new());
    }
    text.split(';')
        .map(|entry| {
            if entry.is_empty() {
                Ok(0)
            } else {
                u32::from_str_radix(entry, 16)
                    .map_err(|_| Error::Parse(format!("bad fingerprint entry {:?}", entry)))
            }
        })
        .collect()
}

/// Renders a child-index path as slash-separated decimals; empty for the
/// root.
pub fn path_to_string(path: &[usize]) -> String {
    path.iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Parses a slash-separated path.
pub fn path_from_string(text: &str) -> Result<Vec<usize>> {
    if text.is_empty() {
        return Ok(Vec::new());
    }
    text.split('/')
        .map(|step| {
            step.parse::<usize>()
                .map_err(|_| Error::Parse(format!("bad path step {:?}", step)))
        })
        .collect()
}

/// Serializes a delta.
pub fn encode_delta(
    delta: &[DetachedOperation],
    format: PatchFormat,
    family: Family,
) -> Result<String> {
    match format {
        PatchFormat::Xml => encode_xml(delta, family),
        PatchFormat::Json => encode_json(delta, family),
    }
}

/// Deserializes a delta.
pub fn decode_delta(
    text: &str,
    format: PatchFormat,
    family: Family,
) -> Result<Vec<DetachedOperation>> {
    match format {
        PatchFormat::Xml => decode_xml(text, family),
        PatchFormat::Json => decode_json(text, family),
    }
}

fn op_tag(kind: OpKind) -> &'static str {
    match kind {
        OpKind::UpdateNode => NODE_OP_TAG,
        OpKind::UpdateForest => FOREST_OP_TAG,
    }
}

fn kind_for_tag(tag: &str) -> Result<OpKind> {
    match tag {
        NODE_OP_TAG => Ok(OpKind::UpdateNode),
        FOREST_OP_TAG => Ok(OpKind::UpdateForest),
        other => Err(Error::UnsupportedType(format!(
            "unknown operation tag {:?}",
            other
        ))),
    }
}

// ---------------------------------------------------------------- XML --

fn encode_xml(delta: &[DetachedOperation], family: Family) -> Result<String> {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<delta>\n");
    for op in delta {
        out.push_str(&format!(
            "  <{} {}=\"{}\">\n",
            op_tag(op.kind),
            PATH_ATTR,
            xml::escape_attr(&path_to_string(&op.path))
        ));
        write_xml_context(&mut out, &op.head);
        write_xml_forest(&mut out, REMOVE_TAG, &op.remove, family)?;
        write_xml_forest(&mut out, INSERT_TAG, &op.insert, family)?;
        write_xml_context(&mut out, &op.tail);
        out.push_str(&format!("  </{}>\n", op_tag(op.kind)));
    }
    out.push_str("</delta>\n");
    Ok(out)
}

fn write_xml_context(out: &mut String, entries: &[u32]) {
    out.push_str(&format!(
        "    <{tag}>{}</{tag}>\n",
        fingerprint_to_hex(entries),
        tag = CONTEXT_TAG
    ));
}

fn write_xml_forest(
    out: &mut String,
    tag: &str,
    forest: &[Subtree],
    family: Family,
) -> Result<()> {
    if forest.is_empty() {
        out.push_str(&format!("    <{}/>\n", tag));
        return Ok(());
    }
    out.push_str(&format!("    <{}>\n", tag));
    match family {
        Family::Xml => {
            for subtree in forest {
                xml::write_subtree(out, subtree, 3);
            }
        }
        Family::Json => {
            // Foreign fragments embed as one JSON text run.
            let values: Vec<Value> = forest.iter().map(jsonml::value_from_subtree).collect();
            let json = serde_json::to_string(&Value::Array(values))?;
            out.push_str("      ");
            out.push_str(&xml::escape_text(&json));
            out.push('\n');
        }
    }
    out.push_str(&format!("    </{}>\n", tag));
    Ok(())
}

fn decode_xml(text: &str, family: Family) -> Result<Vec<DetachedOperation>> {
    let tree = xml::parse_str(text)?;
    let root = tree.root();
    let root_name = tree
        .content(root)
        .as_element()
        .map(|e| e.name().to_string())
        .unwrap_or_default();
    if root_name != DELTA_TAG {
        return Err(Error::Parse(format!(
            "expected a {} document, found {:?}",
            DELTA_TAG, root_name
        )));
    }

    let mut delta = Vec::new();
    for &op_node in tree.children(root) {
        delta.push(decode_xml_op(&tree, op_node, family)?);
    }
    Ok(delta)
}

fn decode_xml_op(tree: &Tree, op_node: NodeId, family: Family) -> Result<DetachedOperation> {
    let element = tree
        .content(op_node)
        .as_element()
        .ok_or_else(|| Error::Parse("operation must be an element".into()))?;
    let kind = kind_for_tag(element.name())?;
    let path_text = element
        .attrs()
        .get(PATH_ATTR)
        .ok_or_else(|| Error::Parse("operation is missing its path attribute".into()))?;
    let path = path_from_string(path_text)?;

    let children = tree.children(op_node);
    let [head_node, remove_node, insert_node, tail_node] = children else {
        return Err(Error::Parse(format!(
            "operation must have 4 children, found {}",
            children.len()
        )));
    };
    expect_tag(tree, *head_node, CONTEXT_TAG)?;
    expect_tag(tree, *remove_node, REMOVE_TAG)?;
    expect_tag(tree, *insert_node, INSERT_TAG)?;
    expect_tag(tree, *tail_node, CONTEXT_TAG)?;

    Ok(DetachedOperation {
        kind,
        path,
        remove: decode_xml_forest(tree, *remove_node, family)?,
        insert: decode_xml_forest(tree, *insert_node, family)?,
        head: fingerprint_from_hex(&text_content(tree, *head_node))?,
        tail: fingerprint_from_hex(&text_content(tree, *tail_node))?,
    })
}

fn decode_xml_forest(tree: &Tree, node: NodeId, family: Family) -> Result<Vec<Subtree>> {
    match family {
        Family::Xml => Ok(tree
            .children(node)
            .iter()
            .map(|&child| Subtree::from_node(tree, child))
            .collect()),
        Family::Json => {
            let text = text_content(tree, node);
            if text.is_empty() {
                return Ok(Vec::new());
            }
            let value: Value = serde_json::from_str(&text)?;
            let Value::Array(items) = value else {
                return Err(Error::Parse(
                    "embedded JsonML forest must be an array".into(),
                ));
            };
            items.iter().map(jsonml::subtree_from_value).collect()
        }
    }
}

fn expect_tag(tree: &Tree, node: NodeId, tag: &str) -> Result<()> {
    match tree.content(node).as_element() {
        Some(e) if e.name() == tag => Ok(()),
        Some(e) => Err(Error::Parse(format!(
            "expected a {} element, found {}",
            tag,
            e.name()
        ))),
        None => Err(Error::Parse(format!(
            "expected a {} element, found text",
            tag
        ))),
    }
}

fn text_content(tree: &Tree, node: NodeId) -> String {
    tree.children(node)
        .iter()
        .filter_map(|&child| tree.content(child).as_text())
        .collect()
}

// --------------------------------------------------------------- JSON --

fn encode_json(delta: &[DetachedOperation], family: Family) -> Result<String> {
    let mut items = vec![Value::String(DELTA_TAG.to_string())];
    for op in delta {
        let mut attrs = serde_json::Map::new();
        attrs.insert(
            PATH_ATTR.to_string(),
            Value::String(path_to_string(&op.path)),
        );
        let mut entry = vec![
            Value::String(op_tag(op.kind).to_string()),
            Value::Object(attrs),
        ];
        entry.push(json_context(&op.head));
        entry.push(json_forest(REMOVE_TAG, &op.remove, family));
        entry.push(json_forest(INSERT_TAG, &op.insert, family));
        entry.push(json_context(&op.tail));
        items.push(Value::Array(entry));
    }
    Ok(serde_json::to_string_pretty(&Value::Array(items))?)
}

fn json_context(entries: &[u32]) -> Value {
    Value::Array(vec![
        Value::String(CONTEXT_TAG.to_string()),
        Value::String(fingerprint_to_hex(entries)),
    ])
}

fn json_forest(tag: &str, forest: &[Subtree], family: Family) -> Value {
    let mut items = vec![Value::String(tag.to_string())];
    for subtree in forest {
        items.push(match family {
            Family::Json => jsonml::value_from_subtree(subtree),
            // Foreign fragments embed as escaped XML strings.
            Family::Xml => Value::String(xml::fragment_to_string(subtree)),
        });
    }
    Value::Array(items)
}

fn decode_json(text: &str, family: Family) -> Result<Vec<DetachedOperation>> {
    let value: Value = serde_json::from_str(text)?;
    let Value::Array(items) = value else {
        return Err(Error::Parse("patch document must be a JsonML array".into()));
    };
    if items.first().and_then(Value::as_str) != Some(DELTA_TAG) {
        return Err(Error::Parse(format!(
            "expected a {} document",
            DELTA_TAG
        )));
    }

    items[1..]
        .iter()
        .map(|entry| decode_json_op(entry, family))
        .collect()
}

fn decode_json_op(entry: &Value, family: Family) -> Result<DetachedOperation> {
    let Value::Array(items) = entry else {
        return Err(Error::Parse("operation must be a JsonML element".into()));
    };
    let tag = items
        .first()
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Parse("operation must start with a tag string".into()))?;
    let kind = kind_for_tag(tag)?;
    let path_text = items
        .get(1)
        .and_then(Value::as_object)
        .and_then(|attrs| attrs.get(PATH_ATTR))
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Parse("operation is missing its path attribute".into()))?;
    let path = path_from_string(path_text)?;

    let [head_entry, remove_entry, insert_entry, tail_entry] = &items[2..] else {
        return Err(Error::Parse(format!(
            "operation must have 4 children, found {}",
            items.len().saturating_sub(2)
        )));
    };

    Ok(DetachedOperation {
        kind,
        path,
        remove: decode_json_forest(remove_entry, REMOVE_TAG, family)?,
        insert: decode_json_forest(insert_entry, INSERT_TAG, family)?,
        head: decode_json_context(head_entry)?,
        tail: decode_json_context(tail_entry)?,
    })
}

fn decode_json_context(entry: &Value) -> Result<Vec<u32>> {
    let Value::Array(items) = entry else {
        return Err(Error::Parse("context must be a JsonML element".into()));
    };
    if items.first().and_then(Value::as_str) != Some(CONTEXT_TAG) {
        return Err(Error::Parse("expected a context element".into()));
    }
    match items.get(1) {
        None => Ok(Vec::new()),
        Some(Value::String(hex)) => fingerprint_from_hex(hex),
        Some(_) => Err(Error::Parse("context must contain one text node".into())),
    }
}

fn decode_json_forest(entry: &Value, tag: &str, family: Family) -> Result<Vec<Subtree>> {
    let Value::Array(items) = entry else {
        return Err(Error::Parse(format!("{} must be a JsonML element", tag)));
    };
    if items.first().and_then(Value::as_str) != Some(tag) {
        return Err(Error::Parse(format!("expected a {} element", tag)));
    }
    items[1..]
        .iter()
        .map(|item| match family {
            Family::Json => jsonml::subtree_from_value(item),
            Family::Xml => {
                let text = item.as_str().ok_or_else(|| {
                    Error::Parse("embedded XML fragment must be a string".into())
                })?;
                xml::fragment_from_string(text)
            }
        })
        .collect()
}
