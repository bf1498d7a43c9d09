//! Document Nodes
//!
//! Node identifiers and per-node storage for the in-memory document.

use indexmap::IndexMap;

/// Unique identifier for a node within one [`Document`](super::Document).
///
/// Identifiers are never reused: once a node is removed its id stays dead,
/// so a stale id held elsewhere (for example by a binding) can never alias a
/// newer node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Get the raw arena index.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// What a node holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The document root. Exactly one per document, always at index 0.
    Document,

    /// An element with a lowercase tag name and ordered attributes.
    Element {
        tag: String,
        attributes: IndexMap<String, String>,
    },

    /// A text node.
    Text(String),
}

/// Storage for a single node in the arena.
#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl NodeData {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
        }
    }

    pub(crate) fn is_element(&self) -> bool {
        matches!(self.kind, NodeKind::Element { .. })
    }

    pub(crate) fn attribute(&self, name: &str) -> Option<&str> {
        match &self.kind {
            NodeKind::Element { attributes, .. } => attributes.get(name).map(String::as_str),
            _ => None,
        }
    }
}
