//! Binding Registry
//!
//! A binding ties one text node to the template text it was scanned from.
//! The registry keeps a reverse index from [`PathId`] to the bindings whose
//! template mentions that path, so a write can find what to refresh.
//!
//! Every binding belongs to a scope. Scopes are created per bind operation
//! and disposing a scope removes its bindings, which is how torn-down page
//! content stops costing refresh work.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use smallvec::SmallVec;

use super::path::PathId;
use crate::dom::NodeId;

/// Unique identifier for a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingId(u64);

impl BindingId {
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for BindingId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for a binding scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u64);

impl ScopeId {
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ScopeId {
    fn default() -> Self {
        Self::new()
    }
}

/// A text node bound to its original template.
#[derive(Debug, Clone)]
pub struct Binding {
    /// The bound text node.
    pub node: NodeId,

    /// The node's text as it was when bound, tags included.
    pub template: Arc<str>,

    /// Distinct paths the template references, in first-seen order.
    pub paths: SmallVec<[PathId; 4]>,

    /// The bind operation that created this binding.
    pub scope: ScopeId,
}

/// All live bindings plus their indexes.
#[derive(Debug, Default)]
pub struct BindingRegistry {
    /// Bindings in creation order.
    bindings: IndexMap<BindingId, Binding>,

    /// Path to every binding whose template mentions it.
    by_path: HashMap<PathId, IndexSet<BindingId>>,

    /// A text node carries at most one binding.
    by_node: HashMap<NodeId, BindingId>,
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a binding. A node that is already bound keeps its first
    /// binding and `None` is returned.
    pub fn insert(&mut self, binding: Binding) -> Option<BindingId> {
        if self.by_node.contains_key(&binding.node) {
            return None;
        }
        let id = BindingId::new();
        for path in &binding.paths {
            self.by_path.entry(*path).or_default().insert(id);
        }
        self.by_node.insert(binding.node, id);
        self.bindings.insert(id, binding);
        Some(id)
    }

    pub fn remove(&mut self, id: BindingId) -> Option<Binding> {
        let binding = self.bindings.shift_remove(&id)?;
        for path in &binding.paths {
            if let Some(ids) = self.by_path.get_mut(path) {
                ids.shift_remove(&id);
                if ids.is_empty() {
                    self.by_path.remove(path);
                }
            }
        }
        self.by_node.remove(&binding.node);
        Some(binding)
    }

    pub fn get(&self, id: BindingId) -> Option<&Binding> {
        self.bindings.get(&id)
    }

    pub fn is_bound(&self, node: NodeId) -> bool {
        self.by_node.contains_key(&node)
    }

    /// Bindings whose template references `path`.
    pub fn bindings_for(&self, path: PathId) -> impl Iterator<Item = BindingId> + '_ {
        self.by_path.get(&path).into_iter().flatten().copied()
    }

    /// Collect the bindings for several paths, each binding once.
    pub fn collect_for<I>(&self, paths: I) -> IndexSet<BindingId>
    where
        I: IntoIterator<Item = PathId>,
    {
        paths
            .into_iter()
            .flat_map(|path| self.bindings_for(path))
            .collect()
    }

    /// Paths that currently have at least one binding.
    pub fn bound_paths(&self) -> impl Iterator<Item = PathId> + '_ {
        self.by_path.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
