//! Reactive Store
//!
//! The store owns the state tree and the bindings that render it into the
//! document. It is the single place where a write turns into text-node
//! updates.
//!
//! # Write Path
//!
//! 1. The value is assigned into the tree (intermediate objects are created
//!    as needed).
//! 2. The active [`InvalidationPolicy`] picks the interned paths related to
//!    the written one.
//! 3. Every binding indexed under those paths is collected once.
//! 4. Each collected binding re-renders *all* tags of its original template
//!    against the current state and writes the result into its text node.
//!
//! Locks are taken one at a time and never held while the document is
//! written, so a write may be triggered from inside a DOM event handler or an
//! event-bus handler.

use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::Value;
use smallvec::SmallVec;
use tracing::{debug, trace};

use super::binding::{Binding, BindingId, BindingRegistry, ScopeId};
use super::invalidation::InvalidationPolicy;
use super::node::StateNode;
use super::path::{PathId, PathTable, StatePath};
use super::template;
use super::value::{get_nested_value, render_value, set_nested_value};
use crate::dom::{Document, NodeId};

struct StoreInner {
    /// The state tree.
    state: RwLock<Value>,

    /// Every path a template has mentioned, interned.
    paths: RwLock<PathTable>,

    /// Live bindings, indexed by path and by text node.
    bindings: RwLock<BindingRegistry>,

    /// The document bound text nodes live in.
    document: Document,

    /// Which bindings a write refreshes.
    policy: InvalidationPolicy,
}

/// A reactive state tree bound to a document.
///
/// Cloning a store shares the same state and bindings.
///
/// # Example
///
/// ```rust,ignore
/// let doc = Document::from_html(r#"<p id="t">{{app.title}}</p>"#);
/// let store = Store::new(json!({"app": {"title": "X"}}), doc.clone());
/// let _scope = store.bind_templates(doc.root());
///
/// store.root().child("app").set("title", "Y");
/// assert_eq!(doc.text_content(doc.get_element_by_id("t").unwrap()), "Y");
/// ```
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    /// Create a store with the default invalidation policy.
    pub fn new(state: Value, document: Document) -> Self {
        Self::with_policy(state, document, InvalidationPolicy::default())
    }

    pub fn with_policy(state: Value, document: Document, policy: InvalidationPolicy) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                state: RwLock::new(state),
                paths: RwLock::new(PathTable::new()),
                bindings: RwLock::new(BindingRegistry::new()),
                document,
                policy,
            }),
        }
    }

    pub fn document(&self) -> &Document {
        &self.inner.document
    }

    pub fn policy(&self) -> InvalidationPolicy {
        self.inner.policy
    }

    /// The node addressing the state root.
    pub fn root(&self) -> StateNode {
        StateNode::new(self.clone(), StatePath::root())
    }

    /// The node addressing a dotted path.
    pub fn node(&self, path: &str) -> StateNode {
        StateNode::new(self.clone(), StatePath::parse(path))
    }

    /// Read a copy of the value at a dotted path.
    pub fn get(&self, path: &str) -> Option<Value> {
        get_nested_value(&self.inner.state.read(), path).cloned()
    }

    /// Read and deserialize the value at a dotted path.
    pub fn get_as<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        self.get(path).and_then(|value| serde_json::from_value(value).ok())
    }

    /// Copy of the whole state tree.
    pub fn snapshot(&self) -> Value {
        self.inner.state.read().clone()
    }

    /// Write a value at a dotted path and refresh related bindings.
    ///
    /// Returns the number of bound text nodes that were re-rendered.
    pub fn set<V: Into<Value>>(&self, path: &str, value: V) -> usize {
        self.write(&StatePath::parse(path), value.into())
    }

    /// Read-modify-write at a dotted path.
    pub fn update<F>(&self, path: &str, f: F) -> usize
    where
        F: FnOnce(Option<&Value>) -> Value,
    {
        self.update_path(&StatePath::parse(path), f)
    }

    /// Run `f` over the value at `path` under the read lock. Only for
    /// closures that do not touch the store.
    pub(crate) fn read_with<R>(&self, path: &StatePath, f: impl FnOnce(Option<&Value>) -> R) -> R {
        let state = self.inner.state.read();
        f(get_nested_value(&state, path.as_str()))
    }

    /// Read-modify-write at a parsed path.
    ///
    /// The current value is copied out first so `f` runs without any lock
    /// held and may itself read or write the store.
    pub(crate) fn update_path<F>(&self, path: &StatePath, f: F) -> usize
    where
        F: FnOnce(Option<&Value>) -> Value,
    {
        let current = self.get(path.as_str());
        let next = f(current.as_ref());
        self.write(path, next)
    }

    pub(crate) fn write(&self, path: &StatePath, value: Value) -> usize {
        {
            let mut state = self.inner.state.write();
            set_nested_value(&mut state, path.segments(), value);
        }

        // A binding on several related paths is collected once
        let targets = {
            let related = {
                let paths = self.inner.paths.read();
                self.inner.policy.related_paths(&paths, path)
            };
            self.inner.bindings.read().collect_for(related)
        };

        let refreshed = self.refresh(targets);
        trace!(path = %path, refreshed, "state write");
        refreshed
    }

    /// Re-render the given bindings from current state.
    fn refresh<I>(&self, ids: I) -> usize
    where
        I: IntoIterator<Item = BindingId>,
    {
        // The document is written only after the state lock is released
        let jobs: Vec<(NodeId, Arc<str>)> = {
            let bindings = self.inner.bindings.read();
            ids.into_iter()
                .filter_map(|id| bindings.get(id))
                .map(|binding| (binding.node, Arc::clone(&binding.template)))
                .collect()
        };

        let rendered: Vec<(NodeId, String)> = {
            let state = self.inner.state.read();
            jobs.into_iter()
                .map(|(node, template)| (node, render_template(&state, &template)))
                .collect()
        };

        rendered
            .iter()
            .filter(|(node, text)| self.inner.document.set_text(*node, text))
            .count()
    }

    /// Scan the text nodes under `root` for `{{path}}` tags, bind them and
    /// render their initial text.
    ///
    /// Text nodes that already carry a live binding are skipped, so binding
    /// the same root twice does not duplicate anything. The returned scope
    /// owns the new bindings; dispose it when the content is torn down.
    pub fn bind_templates(&self, root: NodeId) -> BindingScope {
        let document = &self.inner.document;
        let scope = ScopeId::new();
        let mut created = Vec::new();

        for node in document.text_nodes(root) {
            // Already owned by a live binding
            if self.inner.bindings.read().is_bound(node) {
                continue;
            }
            let Some(text) = document.text(node) else {
                continue;
            };
            let tags = template::tag_paths(&text);
            if tags.is_empty() {
                continue;
            }

            let paths: SmallVec<[PathId; 4]> = {
                let mut table = self.inner.paths.write();
                let mut out = SmallVec::new();
                for tag in tags {
                    let id = table.intern(tag);
                    if !out.contains(&id) {
                        out.push(id);
                    }
                }
                out
            };

            let template: Arc<str> = Arc::from(text.as_str());
            let inserted = self.inner.bindings.write().insert(Binding {
                node,
                template: Arc::clone(&template),
                paths,
                scope,
            });
            // Initial render
            if let Some(id) = inserted {
                created.push(id);
                let rendered = render_template(&self.inner.state.read(), &template);
                document.set_text(node, &rendered);
            }
        }

        debug!(scope = ?scope, bindings = created.len(), "bound templates");
        BindingScope {
            id: scope,
            bindings: created,
            store: self.clone(),
        }
    }

    /// Number of live bindings.
    pub fn binding_count(&self) -> usize {
        self.inner.bindings.read().len()
    }

    /// Number of live bindings whose template references exactly `path`.
    pub fn bindings_for(&self, path: &str) -> usize {
        let Some(id) = self.inner.paths.read().lookup(path) else {
            return 0;
        };
        self.inner.bindings.read().bindings_for(id).count()
    }

    fn remove_bindings(&self, ids: &[BindingId]) -> usize {
        let mut bindings = self.inner.bindings.write();
        ids.iter().filter(|id| bindings.remove(**id).is_some()).count()
    }

    fn same_store(&self, other: &Store) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for Store {
    fn eq(&self, other: &Self) -> bool {
        self.same_store(other)
    }
}

impl Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("policy", &self.inner.policy)
            .field("binding_count", &self.binding_count())
            .finish()
    }
}

fn render_template(state: &Value, template: &str) -> String {
    template::render(template, |path| render_value(get_nested_value(state, path)))
}

/// Ownership of the bindings created by one or more bind operations.
///
/// Dropping a scope leaves its bindings in place; call [`dispose`] when the
/// bound content is removed.
///
/// [`dispose`]: BindingScope::dispose
#[must_use = "bindings stay registered until the scope is disposed"]
pub struct BindingScope {
    id: ScopeId,
    bindings: Vec<BindingId>,
    store: Store,
}

impl BindingScope {
    /// A scope with no bindings, useful as an accumulator.
    pub fn empty(store: &Store) -> Self {
        Self {
            id: ScopeId::new(),
            bindings: Vec::new(),
            store: store.clone(),
        }
    }

    pub fn id(&self) -> ScopeId {
        self.id
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Take over another scope's bindings.
    ///
    /// Scopes from a different store are disposed instead, since this scope
    /// could never remove them.
    pub fn absorb(&mut self, other: BindingScope) {
        if self.store.same_store(&other.store) {
            self.bindings.extend(other.bindings);
        } else {
            other.dispose();
        }
    }

    /// Remove every binding owned by this scope. Returns how many were live.
    pub fn dispose(self) -> usize {
        let removed = self.store.remove_bindings(&self.bindings);
        debug!(scope = ?self.id, removed, "disposed binding scope");
        removed
    }
}

impl Debug for BindingScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingScope")
            .field("id", &self.id)
            .field("bindings", &self.bindings.len())
            .finish()
    }
}
