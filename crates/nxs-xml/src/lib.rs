//! Tagged-tree model for NXS configuration artifacts.
//!
//! Components and datasources are XML documents with a single `definition`
//! root holding `group`, `field`, `attribute`, `link`, `dimensions` and
//! `datasource` nodes. [`XmlDoc`] stores the document as an arena of nodes;
//! every constructor attaches the new node to a parent on creation, so no
//! node ever exists detached from the tree.

mod parse;
mod write;

use thiserror::Error;

/// Error type produced while building or parsing artifact documents.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The underlying XML text could not be parsed.
    #[error("xml: {0}")]
    Xml(String),
    /// The document structure violates artifact invariants.
    #[error("invalid document: {0}")]
    Invalid(String),
    /// A datasource node already carries a type payload.
    #[error("datasource type already set to {0}")]
    TypeAlreadySet(String),
}

/// Handle to a node inside an [`XmlDoc`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
enum NodeKind {
    Element { tag: String },
    Text { content: String },
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    attrs: Vec<(String, String)>,
    children: Vec<NodeId>,
}

/// Writing mode of a field strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyMode {
    /// Written once before the scan starts.
    Init,
    /// Written at every scan step.
    Step,
    /// Written once after the scan finishes.
    Final,
    /// Filled in by a post-processing stage after the run.
    PostRun,
}

impl StrategyMode {
    /// The attribute value emitted for this mode.
    pub const fn as_str(self) -> &'static str {
        match self {
            StrategyMode::Init => "INIT",
            StrategyMode::Step => "STEP",
            StrategyMode::Final => "FINAL",
            StrategyMode::PostRun => "POSTRUN",
        }
    }

    /// Parse a mode attribute value, case-insensitively.
    pub fn parse(value: &str) -> Option<StrategyMode> {
        match value.to_ascii_uppercase().as_str() {
            "INIT" => Some(StrategyMode::Init),
            "STEP" => Some(StrategyMode::Step),
            "FINAL" => Some(StrategyMode::Final),
            "POSTRUN" => Some(StrategyMode::PostRun),
            _ => None,
        }
    }
}

/// Compression parameters attached to a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compression {
    /// Deflate rate, 0-9.
    pub rate: u32,
    /// Whether the shuffle filter is applied before compression.
    pub shuffle: bool,
}

/// Strategy of a field: when and how its value is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Strategy {
    pub mode: StrategyMode,
    /// Optional trigger label for asynchronous writing.
    pub trigger: Option<String>,
    /// Optional literal element content, e.g. a POSTRUN download pattern.
    pub value: Option<String>,
    /// Index of the dimension growing with each step.
    pub grows: Option<u32>,
    /// Compression parameters; attributes are emitted only when present.
    pub compression: Option<Compression>,
}

impl Strategy {
    /// A strategy with the given mode and no optional parts.
    pub fn new(mode: StrategyMode) -> Self {
        Strategy {
            mode,
            trigger: None,
            value: None,
            grows: None,
            compression: None,
        }
    }
}

/// Member kind read from a TANGO-style bus device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TangoMember {
    Attribute,
    Command,
    Property,
}

impl TangoMember {
    pub const fn as_str(self) -> &'static str {
        match self {
            TangoMember::Attribute => "attribute",
            TangoMember::Command => "command",
            TangoMember::Property => "property",
        }
    }
}

/// Payload of a TANGO-style bus datasource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TangoSource {
    /// Bus address of the device, e.g. `p09/motor/exp.01`.
    pub device: String,
    /// Which member kind is read.
    pub member: TangoMember,
    /// Name of the member to read.
    pub record: String,
    /// Host of the bus database, without port.
    pub host: Option<String>,
    /// Port of the bus database.
    pub port: Option<String>,
    /// Batching label; `__CLIENT__` marks a pass-through read.
    pub group: Option<String>,
}

/// Payload of a database-query datasource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSource {
    /// Database flavour, e.g. `MYSQL`.
    pub db_type: String,
    /// Query text.
    pub query: String,
    /// Result format, e.g. `SPECTRUM`; the writer default applies if absent.
    pub format: Option<String>,
    pub dbname: Option<String>,
    pub host: Option<String>,
    pub port: Option<String>,
}

/// An NXS configuration document: a single `definition` root with typed
/// children, stored in an arena.
#[derive(Debug, Clone)]
pub struct XmlDoc {
    nodes: Vec<NodeData>,
    root: NodeId,
}

impl Default for XmlDoc {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlDoc {
    /// Create an empty document holding only the `definition` root.
    pub fn new() -> Self {
        let root = NodeData {
            kind: NodeKind::Element {
                tag: "definition".to_string(),
            },
            attrs: Vec::new(),
            children: Vec::new(),
        };
        XmlDoc {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    /// Parse a document from XML text.
    pub fn parse(text: &str) -> Result<Self, BuildError> {
        parse::parse(text)
    }

    /// The `definition` root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    fn push(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(data);
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Append a free-form element under `parent`.
    pub fn element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        self.push(
            parent,
            NodeData {
                kind: NodeKind::Element {
                    tag: tag.to_string(),
                },
                attrs: Vec::new(),
                children: Vec::new(),
            },
        )
    }

    /// Append a text node under `parent`.
    pub fn text(&mut self, parent: NodeId, content: &str) -> NodeId {
        self.push(
            parent,
            NodeData {
                kind: NodeKind::Text {
                    content: content.to_string(),
                },
                attrs: Vec::new(),
                children: Vec::new(),
            },
        )
    }

    /// Set an attribute, replacing an existing one with the same key.
    pub fn set_attr(&mut self, node: NodeId, key: &str, value: &str) {
        let attrs = &mut self.nodes[node.0].attrs;
        if let Some(slot) = attrs.iter_mut().find(|(k, _)| k == key) {
            slot.1 = value.to_string();
        } else {
            attrs.push((key.to_string(), value.to_string()));
        }
    }

    /// Read an attribute value.
    pub fn attr(&self, node: NodeId, key: &str) -> Option<&str> {
        self.nodes[node.0]
            .attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Attribute key/value pairs in insertion order.
    pub fn attrs(&self, node: NodeId) -> &[(String, String)] {
        &self.nodes[node.0].attrs
    }

    /// Element tag, or `None` for a text node.
    pub fn tag(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node.0].kind {
            NodeKind::Element { tag } => Some(tag),
            NodeKind::Text { .. } => None,
        }
    }

    /// Text content, or `None` for an element node.
    pub fn text_content(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node.0].kind {
            NodeKind::Element { .. } => None,
            NodeKind::Text { content } => Some(content),
        }
    }

    /// Direct children in document order.
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    /// All nodes of the subtree rooted at `node`, preorder, including `node`.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            out.push(id);
            for child in self.nodes[id.0].children.iter().rev() {
                stack.push(*child);
            }
        }
        out
    }

    /// Concatenated text content of the subtree rooted at `node`.
    pub fn subtree_text(&self, node: NodeId) -> String {
        let mut out = String::new();
        for id in self.descendants(node) {
            if let NodeKind::Text { content } = &self.nodes[id.0].kind {
                out.push_str(content);
            }
        }
        out
    }

    /// Append a `group` node with `type` and `name` attributes.
    pub fn group(&mut self, parent: NodeId, name: &str, nx_type: &str) -> NodeId {
        let id = self.element(parent, "group");
        self.set_attr(id, "type", nx_type);
        self.set_attr(id, "name", name);
        id
    }

    /// Append a `field` node with `name`, `type` and optional `units`.
    pub fn field(
        &mut self,
        parent: NodeId,
        name: &str,
        data_type: &str,
        units: Option<&str>,
    ) -> NodeId {
        let id = self.element(parent, "field");
        self.set_attr(id, "name", name);
        self.set_attr(id, "type", data_type);
        if let Some(units) = units {
            self.set_attr(id, "units", units);
        }
        id
    }

    /// Append an NX `attribute` node with `name` and `type`.
    pub fn nx_attribute(&mut self, parent: NodeId, name: &str, data_type: &str) -> NodeId {
        let id = self.element(parent, "attribute");
        self.set_attr(id, "name", name);
        self.set_attr(id, "type", data_type);
        id
    }

    /// Append a `link` node pointing at `target`.
    pub fn link(&mut self, parent: NodeId, name: &str, target: &str) -> NodeId {
        let id = self.element(parent, "link");
        self.set_attr(id, "name", name);
        self.set_attr(id, "target", target);
        id
    }

    /// Append a `dimensions` node of the given rank.
    pub fn dimensions(&mut self, parent: NodeId, rank: u32) -> NodeId {
        let id = self.element(parent, "dimensions");
        self.set_attr(id, "rank", &rank.to_string());
        id
    }

    /// Append one `dim` entry under a `dimensions` node.
    pub fn dim(&mut self, dimensions: NodeId, index: u32, value: &str) -> NodeId {
        let id = self.element(dimensions, "dim");
        self.set_attr(id, "index", &index.to_string());
        self.set_attr(id, "value", value);
        id
    }

    /// Append a `datasource` node, optionally named.
    ///
    /// The node carries no `type` until one of the `init_*` initializers is
    /// called; initializers are mutually exclusive per node.
    pub fn datasource(&mut self, parent: NodeId, name: Option<&str>) -> NodeId {
        let id = self.element(parent, "datasource");
        if let Some(name) = name {
            self.set_attr(id, "name", name);
        }
        id
    }

    /// Set the strategy of a field, replacing any existing strategy child.
    pub fn set_strategy(&mut self, field: NodeId, strategy: &Strategy) -> NodeId {
        let stale: Vec<NodeId> = self.nodes[field.0]
            .children
            .iter()
            .copied()
            .filter(|child| {
                matches!(&self.nodes[child.0].kind, NodeKind::Element { tag } if tag == "strategy")
            })
            .collect();
        if !stale.is_empty() {
            self.nodes[field.0]
                .children
                .retain(|child| !stale.contains(child));
        }
        let id = self.element(field, "strategy");
        self.set_attr(id, "mode", strategy.mode.as_str());
        if let Some(trigger) = &strategy.trigger {
            self.set_attr(id, "trigger", trigger);
        }
        if let Some(grows) = strategy.grows {
            self.set_attr(id, "grows", &grows.to_string());
        }
        if let Some(compression) = &strategy.compression {
            self.set_attr(id, "compression", "true");
            self.set_attr(id, "rate", &compression.rate.to_string());
            if compression.shuffle {
                self.set_attr(id, "shuffle", "true");
            }
        }
        if let Some(value) = &strategy.value {
            self.text(id, value);
        }
        id
    }

    fn claim_type(&mut self, node: NodeId, ds_type: &str) -> Result<(), BuildError> {
        if let Some(existing) = self.attr(node, "type") {
            return Err(BuildError::TypeAlreadySet(existing.to_string()));
        }
        self.set_attr(node, "type", ds_type);
        Ok(())
    }

    /// Initialize a datasource as a TANGO-style bus read.
    pub fn init_tango(&mut self, node: NodeId, source: &TangoSource) -> Result<(), BuildError> {
        self.claim_type(node, "TANGO")?;
        let device = self.element(node, "device");
        self.set_attr(device, "name", &source.device);
        self.set_attr(device, "member", source.member.as_str());
        if let Some(host) = &source.host {
            self.set_attr(device, "hostname", host);
        }
        if let Some(port) = &source.port {
            self.set_attr(device, "port", port);
        }
        if let Some(group) = &source.group {
            self.set_attr(device, "group", group);
        }
        let record = self.element(node, "record");
        self.set_attr(record, "name", &source.record);
        Ok(())
    }

    /// Initialize a datasource as a database query.
    pub fn init_database(
        &mut self,
        node: NodeId,
        source: &DatabaseSource,
    ) -> Result<(), BuildError> {
        self.claim_type(node, "DB")?;
        let database = self.element(node, "database");
        self.set_attr(database, "dbtype", &source.db_type);
        if let Some(dbname) = &source.dbname {
            self.set_attr(database, "dbname", dbname);
        }
        if let Some(host) = &source.host {
            self.set_attr(database, "hostname", host);
        }
        if let Some(port) = &source.port {
            self.set_attr(database, "port", port);
        }
        let query = self.element(node, "query");
        if let Some(format) = &source.format {
            self.set_attr(query, "format", format);
        }
        self.text(query, &source.query);
        Ok(())
    }

    /// Initialize a datasource as a pass-through client record.
    pub fn init_client(&mut self, node: NodeId, record: &str) -> Result<(), BuildError> {
        self.claim_type(node, "CLIENT")?;
        let child = self.element(node, "record");
        self.set_attr(child, "name", record);
        Ok(())
    }

    /// Initialize a datasource as a sardana-style door record.
    pub fn init_sardana(
        &mut self,
        node: NodeId,
        door: &str,
        record: &str,
    ) -> Result<(), BuildError> {
        self.claim_type(node, "SARDANA")?;
        let door_node = self.element(node, "door");
        self.set_attr(door_node, "name", door);
        let record_node = self.element(node, "record");
        self.set_attr(record_node, "name", record);
        Ok(())
    }

    /// Initialize a datasource as a computed expression over other
    /// datasources. Inputs are referenced as `$datasources.<name>` text; the
    /// expression body lands in a `result` child.
    pub fn init_eval(
        &mut self,
        node: NodeId,
        expression: &str,
        inputs: &[&str],
    ) -> Result<(), BuildError> {
        self.claim_type(node, "EVAL")?;
        for input in inputs {
            self.text(node, &format!("$datasources.{input}"));
        }
        let result = self.element(node, "result");
        self.set_attr(result, "name", "result");
        self.text(result, expression);
        Ok(())
    }

    /// Serialize to indented XML with a leading declaration.
    pub fn to_xml(&self) -> String {
        write::serialize(self)
    }

    /// Produce a new document keeping only nodes accepted by `keep`.
    ///
    /// The root is always kept; rejecting a node drops its whole subtree.
    /// Text nodes are always kept (use [`XmlDoc::rewrite_text`] to drop
    /// them). Removal is a pure filter over the old tree, so no iterator is
    /// ever invalidated by the walk.
    pub fn retain<F>(&self, mut keep: F) -> XmlDoc
    where
        F: FnMut(&XmlDoc, NodeId) -> bool,
    {
        let mut out = XmlDoc {
            nodes: vec![NodeData {
                kind: self.nodes[self.root.0].kind.clone(),
                attrs: self.nodes[self.root.0].attrs.clone(),
                children: Vec::new(),
            }],
            root: NodeId(0),
        };
        self.copy_children(self.root, NodeId(0), &mut out, &mut keep);
        out
    }

    fn copy_children<F>(&self, from: NodeId, to: NodeId, out: &mut XmlDoc, keep: &mut F)
    where
        F: FnMut(&XmlDoc, NodeId) -> bool,
    {
        for child in &self.nodes[from.0].children {
            let data = &self.nodes[child.0];
            let is_text = matches!(data.kind, NodeKind::Text { .. });
            if !is_text && !keep(self, *child) {
                continue;
            }
            let copied = out.push(
                to,
                NodeData {
                    kind: data.kind.clone(),
                    attrs: data.attrs.clone(),
                    children: Vec::new(),
                },
            );
            self.copy_children(*child, copied, out, keep);
        }
    }

    /// Produce a new document with every text node rewritten by `f`.
    ///
    /// Returning `None` drops the text node, which is how now-blank lines
    /// disappear after placeholder cleanup.
    pub fn rewrite_text<F>(&self, mut f: F) -> XmlDoc
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut out = self.clone();
        let mut dropped = Vec::new();
        for (index, node) in out.nodes.iter_mut().enumerate() {
            if let NodeKind::Text { content } = &mut node.kind {
                match f(content) {
                    Some(updated) => *content = updated,
                    None => dropped.push(NodeId(index)),
                }
            }
        }
        if !dropped.is_empty() {
            for node in &mut out.nodes {
                node.children.retain(|child| !dropped.contains(child));
            }
        }
        out
    }

    /// Produce a new document with every attribute value rewritten by `f`.
    pub fn rewrite_attrs<F>(&self, mut f: F) -> XmlDoc
    where
        F: FnMut(&str, &str) -> String,
    {
        let mut out = self.clone();
        for node in &mut out.nodes {
            for (key, value) in &mut node.attrs {
                *value = f(key, value);
            }
        }
        out
    }
}
