//! Reactive State
//!
//! This module implements the reactive engine: a JSON state tree whose
//! writes re-render the document text nodes that reference it through
//! `{{dotted.path}}` template tags.
//!
//! # Concepts
//!
//! ## Store
//!
//! The [`Store`] owns the state tree, the path table and the binding
//! registry. Every write funnels through it.
//!
//! ## State Nodes
//!
//! A [`StateNode`] is an accessor for one path. Reading a child returns a
//! node for the child's full path; writing a child refreshes the bindings
//! related to that path. Because nodes carry their path explicitly, any node
//! at any depth is reactive, including objects assigned after construction.
//!
//! ## Bindings
//!
//! Binding a subtree scans its text nodes for tags, records one binding per
//! text node (indexed under every path its template mentions) and renders
//! the initial text. Bindings are grouped into a [`BindingScope`] that is
//! disposed when the content goes away.
//!
//! ## Paths
//!
//! Template paths are interned into [`PathId`] tokens once, when first seen.
//! Which paths count as related to a write is decided by the configured
//! [`InvalidationPolicy`].

mod binding;
mod invalidation;
mod node;
mod path;
mod store;
pub mod template;
mod value;

pub use binding::{Binding, BindingId, BindingRegistry, ScopeId};
pub use invalidation::InvalidationPolicy;
pub use node::StateNode;
pub use path::{PathId, PathTable, StatePath};
pub use store::{BindingScope, Store};
pub use value::{get_nested_value, render_value, set_nested_value};
