//! XML codec.
//!
//! The parser drives quick-xml's streaming reader and builds a tree over
//! the shared content model. Whitespace-only text is dropped and
//! surrounding whitespace trimmed, so a pretty-printed document parses to
//! the same structure as a compact one. Comments, processing instructions
//! and the prolog are not modelled.

use std::collections::BTreeMap;

use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::delta::Subtree;
use crate::error::{Error, Result};
use crate::tree::{Content, Element, NodeId, Tree};

/// Parses an XML document into a tree.
pub fn parse_str(text: &str) -> Result<Tree> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text_start = false;
    reader.config_mut().trim_text_end = false;

    let mut tree: Option<Tree> = None;
    let mut stack: Vec<NodeId> = Vec::new();
    let mut pending_text: Option<String> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                flush_text(&mut tree, &stack, &mut pending_text)?;
                let element = read_element(e, &reader)?;
                let id = attach_element(&mut tree, &stack, element)?;
                stack.push(id);
            }
            Ok(Event::Empty(ref e)) => {
                flush_text(&mut tree, &stack, &mut pending_text)?;
                let element = read_element(e, &reader)?;
                attach_element(&mut tree, &stack, element)?;
            }
            Ok(Event::End(_)) => {
                flush_text(&mut tree, &stack, &mut pending_text)?;
                stack.pop();
            }
            Ok(Event::Text(e)) => {
                let raw = std::str::from_utf8(e.as_ref())
                    .map_err(|err| Error::Parse(err.to_string()))?;
                let text = unescape(raw).map_err(|err| Error::Parse(err.to_string()))?;
                pending_text.get_or_insert_with(String::new).push_str(&text);
            }
            Ok(Event::CData(ref e)) => {
                let text = String::from_utf8_lossy(e.as_ref());
                pending_text.get_or_insert_with(String::new).push_str(&text);
            }
            Ok(Event::Eof) => break,
            // Prolog, doctype, comments and PIs carry no modelled content.
            Ok(_) => {}
            Err(e) => return Err(e.into()),
        }
        buf.clear();
    }

    tree.ok_or_else(|| Error::Parse("document has no root element".into()))
}

fn attach_element(tree: &mut Option<Tree>, stack: &[NodeId], element: Element) -> Result<NodeId> {
    match (tree.as_mut(), stack.last()) {
        (None, _) => {
            let t = Tree::with_root(Content::Element(element));
            let root = t.root();
            *tree = Some(t);
            Ok(root)
        }
        (Some(t), Some(&parent)) => {
            let id = t.push(Content::Element(element));
            t.append(parent, id)?;
            Ok(id)
        }
        (Some(_), None) => Err(Error::Parse("multiple root elements".into())),
    }
}

fn flush_text(
    tree: &mut Option<Tree>,
    stack: &[NodeId],
    pending_text: &mut Option<String>,
) -> Result<()> {
    let Some(text) = pending_text.take() else {
        return Ok(());
    };
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(());
    }
    match (tree.as_mut(), stack.last()) {
        (Some(t), Some(&parent)) => {
            let id = t.push(Content::text(trimmed));
            t.append(parent, id)?;
            Ok(())
        }
        _ => Err(Error::Parse("text content outside the root element".into())),
    }
}

fn read_element<R>(e: &BytesStart<'_>, reader: &Reader<R>) -> Result<Element> {
    let name = reader
        .decoder()
        .decode(e.name().as_ref())
        .map_err(|err| Error::Parse(err.to_string()))?
        .to_string();

    let mut attrs = BTreeMap::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| Error::Parse(format!("attribute error: {}", err)))?;
        let key = reader
            .decoder()
            .decode(attr.key.as_ref())
            .map_err(|err| Error::Parse(err.to_string()))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|err| Error::Parse(err.to_string()))?
            .to_string();
        attrs.insert(key, value);
    }
    Ok(Element::with_attrs(name, attrs))
}

/// Serializes a tree as a pretty-printed XML document.
pub fn serialize(tree: &Tree) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    write_node(&mut out, tree, tree.root(), 0);
    out
}

fn write_node(out: &mut String, tree: &Tree, id: NodeId, indent: usize) {
    match tree.content(id) {
        Content::Element(element) => {
            write_open_tag(out, element, indent, tree.children(id).is_empty());
            for &child in tree.children(id) {
                write_node(out, tree, child, indent + 1);
            }
            if !tree.children(id).is_empty() {
                write_close_tag(out, element, indent);
            }
        }
        Content::Text(text) => {
            push_indent(out, indent);
            out.push_str(&escape_text(text));
            out.push('\n');
        }
    }
}

/// Writes one detached subtree as an XML fragment string.
pub fn fragment_to_string(subtree: &Subtree) -> String {
    let mut out = String::new();
    write_subtree(&mut out, subtree, 0);
    out.trim_end().to_string()
}

/// Parses an XML fragment string back into a single subtree.
///
/// The fragment is wrapped in a synthetic container before parsing, so
/// both element and escaped-text fragments come back intact.
pub fn fragment_from_string(text: &str) -> Result<Subtree> {
    let wrapped = format!("<fragment>{}</fragment>", text);
    let tree = parse_str(&wrapped)?;
    let children = tree.children(tree.root());
    match children {
        [only] => Ok(Subtree::from_node(&tree, *only)),
        _ => Err(Error::Parse(format!(
            "expected one fragment root, found {}",
            children.len()
        ))),
    }
}

/// Writes a detached subtree into `out` at the given indent level.
pub(crate) fn write_subtree(out: &mut String, subtree: &Subtree, indent: usize) {
    match &subtree.content {
        Content::Element(element) => {
            write_open_tag(out, element, indent, subtree.children.is_empty());
            for child in &subtree.children {
                write_subtree(out, child, indent + 1);
            }
            if !subtree.children.is_empty() {
                write_close_tag(out, element, indent);
            }
        }
        Content::Text(text) => {
            push_indent(out, indent);
            out.push_str(&escape_text(text));
            out.push('\n');
        }
    }
}

fn write_open_tag(out: &mut String, element: &Element, indent: usize, self_close: bool) {
    push_indent(out, indent);
    out.push('<');
    out.push_str(element.name());
    for (key, value) in element.attrs() {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape_attr(value));
        out.push('"');
    }
    if self_close {
        out.push_str("/>\n");
    } else {
        out.push_str(">\n");
    }
}

fn write_close_tag(out: &mut String, element: &Element, indent: usize) {
    push_indent(out, indent);
    out.push_str("</");
    out.push_str(element.name());
    out.push_str(">\n");
}

fn push_indent(out: &mut String, indent: usize) {
    for _ in 0..indent {
        out.push_str("  ");
    }
}

/// Escapes special XML characters in text content.
pub(crate) fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escapes special XML characters in attribute values.
pub(crate) fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
