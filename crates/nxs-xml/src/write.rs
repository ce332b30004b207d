//! Indented XML serialization of artifact documents.
//!
//! The writer controls its own layout instead of going through a serde
//! serializer: the artifact format wants a fixed declaration, two-space
//! indentation and attributes in insertion order.

use crate::{NodeId, XmlDoc};

const DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n";
const INDENT: &str = "  ";

pub(crate) fn serialize(doc: &XmlDoc) -> String {
    let mut out = String::from(DECLARATION);
    write_node(doc, doc.root(), 0, &mut out);
    out
}

fn write_node(doc: &XmlDoc, node: NodeId, depth: usize, out: &mut String) {
    if let Some(content) = doc.text_content(node) {
        push_indent(depth, out);
        out.push_str(&escape_text(content));
        out.push('\n');
        return;
    }

    let tag = doc.tag(node).unwrap_or("definition");
    push_indent(depth, out);
    out.push('<');
    out.push_str(tag);
    for (key, value) in doc.attrs(node) {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape_attr(value));
        out.push('"');
    }

    let children = doc.children(node);
    if children.is_empty() {
        out.push_str("/>\n");
        return;
    }

    let only_text = children
        .iter()
        .all(|child| doc.text_content(*child).is_some());
    if only_text {
        out.push('>');
        for child in children {
            if let Some(content) = doc.text_content(*child) {
                out.push_str(&escape_text(content));
            }
        }
        out.push_str("</");
        out.push_str(tag);
        out.push_str(">\n");
        return;
    }

    out.push_str(">\n");
    for child in children {
        write_node(doc, *child, depth + 1, out);
    }
    push_indent(depth, out);
    out.push_str("</");
    out.push_str(tag);
    out.push_str(">\n");
}

fn push_indent(depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}
