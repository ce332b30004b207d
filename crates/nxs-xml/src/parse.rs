//! Event-based parsing of artifact documents.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::{BuildError, NodeId, XmlDoc};

/// Parse XML text into an [`XmlDoc`].
///
/// The document must hold exactly one root element. Whitespace-only text is
/// dropped (the serializer re-indents); attribute order is preserved.
pub(crate) fn parse(text: &str) -> Result<XmlDoc, BuildError> {
    let mut reader = Reader::from_str(text);
    reader.trim_text(true);
    let mut buf = Vec::new();

    let mut doc: Option<XmlDoc> = None;
    let mut stack: Vec<NodeId> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(start)) => {
                open_element(&start, &mut doc, &mut stack, false)?;
            }
            Ok(Event::Empty(start)) => {
                open_element(&start, &mut doc, &mut stack, true)?;
            }
            Ok(Event::End(_)) => {
                stack.pop();
            }
            Ok(Event::Text(text)) => {
                let content = text
                    .unescape()
                    .map_err(|err| BuildError::Xml(err.to_string()))?;
                if let (Some(doc), Some(parent)) = (doc.as_mut(), stack.last()) {
                    doc.text(*parent, &content);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => return Err(BuildError::Xml(err.to_string())),
        }
        buf.clear();
    }

    doc.ok_or_else(|| BuildError::Invalid("document has no root element".into()))
}

fn open_element(
    start: &BytesStart<'_>,
    doc: &mut Option<XmlDoc>,
    stack: &mut Vec<NodeId>,
    empty: bool,
) -> Result<(), BuildError> {
    let tag = String::from_utf8_lossy(start.name().as_ref()).to_string();
    let id = match (doc.as_mut(), stack.last()) {
        (Some(doc), Some(parent)) => doc.element(*parent, &tag),
        (Some(_), None) => {
            return Err(BuildError::Invalid(
                "document has more than one root element".into(),
            ));
        }
        (None, _) => {
            let mut fresh = XmlDoc::new();
            rename_root(&mut fresh, &tag);
            let root = fresh.root();
            *doc = Some(fresh);
            root
        }
    };

    let doc = doc.as_mut().ok_or_else(|| {
        // set just above; kept as an error instead of unwrap
        BuildError::Invalid("document missing while parsing".into())
    })?;
    for attr in start.attributes() {
        let attr = attr.map_err(|err| BuildError::Xml(err.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr
            .unescape_value()
            .map_err(|err| BuildError::Xml(err.to_string()))?;
        doc.set_attr(id, &key, &value);
    }

    if !empty {
        stack.push(id);
    }
    Ok(())
}

fn rename_root(doc: &mut XmlDoc, tag: &str) {
    // XmlDoc::new always creates a "definition" root; parsed documents keep
    // whatever root tag the text carries.
    if tag != "definition" {
        doc.set_root_tag(tag);
    }
}

impl XmlDoc {
    pub(crate) fn set_root_tag(&mut self, tag: &str) {
        let root = self.root();
        if let crate::NodeKind::Element { tag: slot } = &mut self.nodes[root.0].kind {
            *slot = tag.to_string();
        }
    }
}
