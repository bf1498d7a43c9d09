//! In-memory Document
//!
//! The document is an arena of nodes behind a shared lock. A [`Document`] is a
//! cheap handle: cloning it shares the same tree, the same way cloning a
//! signal shares its value.
//!
//! # Locking
//!
//! Every method takes the lock for the duration of the call only. Event
//! handlers are cloned out of the tree before they run, so a handler may
//! freely read and write the document it was dispatched from.

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use super::html::{self, Fragment};
use super::node::{NodeData, NodeId, NodeKind};

/// A DOM event handler, like an element's `onclick` property.
pub type DomHandler = Arc<dyn Fn(NodeId) + Send + Sync>;

/// The node arena plus element event handlers.
///
/// The arena only grows. Removed nodes free their data but keep their slot,
/// so each replaced subtree costs one empty slot per node for the life of
/// the document.
struct Tree {
    /// Removed nodes leave a `None` so ids are never reused.
    nodes: Vec<Option<NodeData>>,

    /// At most one handler per element and event name.
    handlers: HashMap<(NodeId, String), DomHandler>,
}

impl Tree {
    fn new() -> Self {
        Self {
            nodes: vec![Some(NodeData::new(NodeKind::Document))],
            handlers: HashMap::new(),
        }
    }

    fn get(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.nodes.get_mut(id.index()).and_then(Option::as_mut)
    }

    fn insert(&mut self, data: NodeData) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(Some(data));
        id
    }

    fn append(&mut self, parent: NodeId, child: NodeId) -> bool {
        if self.get(parent).is_none() || self.get(child).is_none() || parent == child {
            return false;
        }
        self.detach(child);
        if let Some(node) = self.get_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.get_mut(parent) {
            node.children.push(child);
        }
        true
    }

    fn detach(&mut self, child: NodeId) {
        let parent = self.get(child).and_then(|node| node.parent);
        if let Some(parent) = parent {
            if let Some(node) = self.get_mut(parent) {
                node.children.retain(|c| *c != child);
            }
        }
        if let Some(node) = self.get_mut(child) {
            node.parent = None;
        }
    }

    /// Remove nodes and their whole subtrees from the arena.
    ///
    /// Returns the number of nodes removed.
    fn remove_subtrees<I>(&mut self, roots: I) -> usize
    where
        I: IntoIterator<Item = NodeId>,
    {
        let mut stack: Vec<NodeId> = roots.into_iter().collect();
        for root in &stack {
            self.detach(*root);
        }

        let mut removed = HashSet::new();
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(current.index()).and_then(Option::take) {
                stack.extend(node.children);
                removed.insert(current);
            }
        }

        // One pass over the handlers for the whole batch.
        if !removed.is_empty() {
            self.handlers.retain(|(node, _), _| !removed.contains(node));
        }
        removed.len()
    }

    fn insert_fragment(&mut self, parent: NodeId, fragment: Fragment) {
        match fragment {
            Fragment::Text(text) => {
                let id = self.insert(NodeData::new(NodeKind::Text(text)));
                self.append(parent, id);
            }
            Fragment::Element {
                tag,
                attributes,
                children,
            } => {
                let id = self.insert(NodeData::new(NodeKind::Element { tag, attributes }));
                self.append(parent, id);
                for child in children {
                    self.insert_fragment(id, child);
                }
            }
        }
    }

    /// Descendants of `root` in document order, excluding `root` itself.
    fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = match self.get(root) {
            Some(node) => node.children.iter().rev().copied().collect(),
            None => return out,
        };
        while let Some(id) = stack.pop() {
            if let Some(node) = self.get(id) {
                out.push(id);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    fn text_content(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.get(id) else {
            return;
        };
        match &node.kind {
            NodeKind::Text(text) => out.push_str(text),
            _ => {
                for child in &node.children {
                    self.text_content(*child, out);
                }
            }
        }
    }

    fn serialize(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.get(id) else {
            return;
        };
        match &node.kind {
            NodeKind::Text(text) => out.push_str(&html::escape_text(text)),
            NodeKind::Document => self.serialize_children(id, out),
            NodeKind::Element { tag, attributes } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attributes {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&html::escape_attribute(value));
                    out.push('"');
                }
                out.push('>');
                if !html::is_void_element(tag) {
                    self.serialize_children(id, out);
                    out.push_str("</");
                    out.push_str(tag);
                    out.push('>');
                }
            }
        }
    }

    fn serialize_children(&self, id: NodeId, out: &mut String) {
        if let Some(node) = self.get(id) {
            for child in &node.children {
                self.serialize(*child, out);
            }
        }
    }
}

/// A shared handle to an in-memory HTML document.
///
/// # Example
///
/// ```rust,ignore
/// let doc = Document::from_html(r#"<div id="app"></div>"#);
/// let app = doc.get_element_by_id("app").unwrap();
/// doc.set_inner_html(app, "<p>Hello</p>");
/// assert_eq!(doc.text_content(app), "Hello");
/// ```
#[derive(Clone)]
pub struct Document {
    tree: Arc<RwLock<Tree>>,
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self {
            tree: Arc::new(RwLock::new(Tree::new())),
        }
    }

    /// Create a document whose root holds the parsed markup.
    pub fn from_html(markup: &str) -> Self {
        let document = Self::new();
        let root = document.root();
        document.set_inner_html(root, markup);
        document
    }

    /// The document root node.
    pub fn root(&self) -> NodeId {
        NodeId::new(0)
    }

    /// Check whether a node is still part of the arena.
    pub fn contains(&self, id: NodeId) -> bool {
        self.tree.read().get(id).is_some()
    }

    /// Check whether a node is reachable from the document root.
    pub fn is_connected(&self, id: NodeId) -> bool {
        let tree = self.tree.read();
        let mut current = Some(id);
        while let Some(node_id) = current {
            if node_id == self.root() {
                return true;
            }
            current = tree.get(node_id).and_then(|node| node.parent);
        }
        false
    }

    /// Get a copy of a node's kind.
    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.tree.read().get(id).map(|node| node.kind.clone())
    }

    /// Get the tag name of an element.
    pub fn tag_name(&self, id: NodeId) -> Option<String> {
        match self.tree.read().get(id).map(|node| &node.kind) {
            Some(NodeKind::Element { tag, .. }) => Some(tag.clone()),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.tree.read().get(id).and_then(|node| node.parent)
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.tree
            .read()
            .get(id)
            .map(|node| node.children.clone())
            .unwrap_or_default()
    }

    /// Create a detached element.
    pub fn create_element(&self, tag: &str) -> NodeId {
        self.tree.write().insert(NodeData::new(NodeKind::Element {
            tag: tag.to_ascii_lowercase(),
            attributes: IndexMap::new(),
        }))
    }

    /// Create a detached text node.
    pub fn create_text_node(&self, text: &str) -> NodeId {
        self.tree
            .write()
            .insert(NodeData::new(NodeKind::Text(text.to_string())))
    }

    /// Append `child` as the last child of `parent`, moving it if attached.
    pub fn append_child(&self, parent: NodeId, child: NodeId) -> bool {
        self.tree.write().append(parent, child)
    }

    /// Remove a node and its subtree.
    pub fn remove(&self, id: NodeId) {
        if id != self.root() {
            self.tree.write().remove_subtrees([id]);
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<String> {
        self.tree
            .read()
            .get(id)
            .and_then(|node| node.attribute(name))
            .map(str::to_string)
    }

    /// Set an attribute on an element. Returns `false` for non-elements.
    pub fn set_attribute(&self, id: NodeId, name: &str, value: &str) -> bool {
        let mut tree = self.tree.write();
        match tree.get_mut(id).map(|node| &mut node.kind) {
            Some(NodeKind::Element { attributes, .. }) => {
                attributes.insert(name.to_ascii_lowercase(), value.to_string());
                true
            }
            _ => false,
        }
    }

    /// Find the first connected element with the given `id` attribute.
    pub fn get_element_by_id(&self, element_id: &str) -> Option<NodeId> {
        self.find_by_id(self.root(), element_id)
    }

    /// Find the first element under `root` with the given `id` attribute.
    pub fn find_by_id(&self, root: NodeId, element_id: &str) -> Option<NodeId> {
        let tree = self.tree.read();
        tree.descendants(root)
            .into_iter()
            .find(|id| tree.get(*id).and_then(|node| node.attribute("id")) == Some(element_id))
    }

    /// All elements under `root` carrying `attribute`, in document order.
    pub fn elements_with_attribute(&self, root: NodeId, attribute: &str) -> Vec<NodeId> {
        let tree = self.tree.read();
        tree.descendants(root)
            .into_iter()
            .filter(|id| tree.get(*id).and_then(|node| node.attribute(attribute)).is_some())
            .collect()
    }

    /// All text nodes under `root`, in document order.
    ///
    /// When `root` is itself a text node it is the only result.
    pub fn text_nodes(&self, root: NodeId) -> Vec<NodeId> {
        let tree = self.tree.read();
        if matches!(tree.get(root).map(|n| &n.kind), Some(NodeKind::Text(_))) {
            return vec![root];
        }
        tree.descendants(root)
            .into_iter()
            .filter(|id| matches!(tree.get(*id).map(|n| &n.kind), Some(NodeKind::Text(_))))
            .collect()
    }

    /// All elements under `root`, in document order.
    pub fn elements(&self, root: NodeId) -> Vec<NodeId> {
        let tree = self.tree.read();
        tree.descendants(root)
            .into_iter()
            .filter(|id| tree.get(*id).is_some_and(NodeData::is_element))
            .collect()
    }

    /// Get the text of a text node.
    pub fn text(&self, id: NodeId) -> Option<String> {
        match self.tree.read().get(id).map(|node| &node.kind) {
            Some(NodeKind::Text(text)) => Some(text.clone()),
            _ => None,
        }
    }

    /// Replace the text of a text node.
    ///
    /// Returns `false` if the node is gone or is not a text node.
    pub fn set_text(&self, id: NodeId, text: &str) -> bool {
        let mut tree = self.tree.write();
        match tree.get_mut(id).map(|node| &mut node.kind) {
            Some(NodeKind::Text(current)) => {
                if current != text {
                    current.clear();
                    current.push_str(text);
                }
                true
            }
            _ => false,
        }
    }

    /// Concatenated text of a node and all its descendants.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.tree.read().text_content(id, &mut out);
        out
    }

    /// Replace the children of `id` with the parsed markup.
    ///
    /// The previous children are removed from the arena along with any
    /// event handlers attached to them.
    pub fn set_inner_html(&self, id: NodeId, markup: &str) {
        let fragments = html::parse_fragment(markup);
        let mut tree = self.tree.write();
        let Some(node) = tree.get(id) else {
            return;
        };
        if matches!(node.kind, NodeKind::Text(_)) {
            return;
        }
        let children = node.children.clone();
        tree.remove_subtrees(children);
        for fragment in fragments {
            tree.insert_fragment(id, fragment);
        }
    }

    /// Serialize the children of a node.
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.tree.read().serialize_children(id, &mut out);
        out
    }

    /// Serialize a node including its own tag.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.tree.read().serialize(id, &mut out);
        out
    }

    /// Install the handler for `event` on an element, replacing any previous one.
    pub fn set_handler<F>(&self, id: NodeId, event: &str, handler: F) -> bool
    where
        F: Fn(NodeId) + Send + Sync + 'static,
    {
        let mut tree = self.tree.write();
        if tree.get(id).is_none() {
            return false;
        }
        tree.handlers
            .insert((id, event.to_string()), Arc::new(handler));
        true
    }

    /// Remove the handler for `event` on an element.
    pub fn clear_handler(&self, id: NodeId, event: &str) -> bool {
        self.tree
            .write()
            .handlers
            .remove(&(id, event.to_string()))
            .is_some()
    }

    /// Invoke the handler for `event` on an element, if one is installed.
    ///
    /// Returns whether a handler ran. The lock is released before the
    /// handler is called.
    pub fn dispatch(&self, id: NodeId, event: &str) -> bool {
        let handler = self
            .tree
            .read()
            .handlers
            .get(&(id, event.to_string()))
            .cloned();
        match handler {
            Some(handler) => {
                handler(id);
                true
            }
            None => false,
        }
    }

    /// Number of live nodes in the arena, including the root.
    pub fn node_count(&self) -> usize {
        self.tree.read().nodes.iter().filter(|n| n.is_some()).count()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("node_count", &self.node_count())
            .finish()
    }
}
