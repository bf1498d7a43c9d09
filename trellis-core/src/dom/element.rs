//! Element handles handed to component init hooks.

use std::fmt::Debug;

use super::document::Document;
use super::node::NodeId;

/// A reference to one element inside a [`Document`].
///
/// This is what a component's init hook receives as its root element. It
/// scopes lookups to the component's subtree, the way `root.querySelector`
/// does in a browser.
#[derive(Clone)]
pub struct ElementRef {
    document: Document,
    id: NodeId,
}

impl ElementRef {
    pub fn new(document: Document, id: NodeId) -> Self {
        Self { document, id }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.document.attribute(self.id, name)
    }

    pub fn text_content(&self) -> String {
        self.document.text_content(self.id)
    }

    pub fn inner_html(&self) -> String {
        self.document.inner_html(self.id)
    }

    /// Find a descendant element by its `id` attribute.
    pub fn find_by_id(&self, element_id: &str) -> Option<ElementRef> {
        self.document
            .find_by_id(self.id, element_id)
            .map(|id| ElementRef::new(self.document.clone(), id))
    }

    /// Install the handler for `event` on this element, replacing any previous one.
    pub fn on<F>(&self, event: &str, handler: F) -> bool
    where
        F: Fn(NodeId) + Send + Sync + 'static,
    {
        self.document.set_handler(self.id, event, handler)
    }

    /// Invoke this element's handler for `event`.
    pub fn dispatch(&self, event: &str) -> bool {
        self.document.dispatch(self.id, event)
    }
}

impl PartialEq for ElementRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Debug for ElementRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementRef")
            .field("id", &self.id)
            .field("tag", &self.document.tag_name(self.id))
            .finish()
    }
}
