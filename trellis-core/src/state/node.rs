//! State Nodes
//!
//! A [`StateNode`] is an accessor for one position in the state tree. It
//! knows its own full path, so writing through it can refresh the right
//! bindings without any interception magic.
//!
//! Nodes are plain values: two nodes for the same path of the same store
//! compare equal no matter how they were obtained.

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::path::StatePath;
use super::store::Store;

/// An accessor for the object at one path of a [`Store`].
///
/// # Example
///
/// ```rust,ignore
/// let counter = store.root().child("counter");
/// let step = counter.get_as::<i64>("step").unwrap_or(1);
/// counter.update("value", |v| json!(v.and_then(Value::as_i64).unwrap_or(0) + step));
/// ```
#[derive(Clone)]
pub struct StateNode {
    store: Store,
    path: StatePath,
}

impl StateNode {
    pub(crate) fn new(store: Store, path: StatePath) -> Self {
        Self { store, path }
    }

    pub fn path(&self) -> &StatePath {
        &self.path
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// The node for a child key.
    pub fn child(&self, key: &str) -> StateNode {
        StateNode::new(self.store.clone(), self.path.join(key))
    }

    /// The node one level up, or `None` at the root.
    pub fn parent(&self) -> Option<StateNode> {
        self.path
            .parent()
            .map(|path| StateNode::new(self.store.clone(), path))
    }

    /// A copy of the value at this node's path.
    pub fn value(&self) -> Option<Value> {
        self.store.read_with(&self.path, |value| value.cloned())
    }

    /// A copy of a child value.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.store.read_with(&self.path.join(key), |value| value.cloned())
    }

    /// A child value deserialized into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get(key)
            .and_then(|value| serde_json::from_value(value).ok())
    }

    /// Whether this node currently holds an object.
    pub fn is_object(&self) -> bool {
        self.store.read_with(&self.path, |value| value.is_some_and(Value::is_object))
    }

    /// Keys of the object at this node, in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.store.read_with(&self.path, |value| {
            value
                .and_then(Value::as_object)
                .map(|map| map.keys().cloned().collect())
                .unwrap_or_default()
        })
    }

    /// Write a child value and refresh the related bindings.
    ///
    /// Returns the number of bound text nodes that were re-rendered.
    pub fn set<V: Into<Value>>(&self, key: &str, value: V) -> usize {
        self.store.write(&self.path.join(key), value.into())
    }

    /// Read-modify-write a child value.
    pub fn update<F>(&self, key: &str, f: F) -> usize
    where
        F: FnOnce(Option<&Value>) -> Value,
    {
        self.store.update_path(&self.path.join(key), f)
    }
}

impl PartialEq for StateNode {
    fn eq(&self, other: &Self) -> bool {
        self.store == other.store && self.path == other.path
    }
}

impl Debug for StateNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateNode")
            .field("path", &self.path.as_str())
            .finish()
    }
}
