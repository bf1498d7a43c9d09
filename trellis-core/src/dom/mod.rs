//! Document Model
//!
//! A small in-memory stand-in for the browser DOM, exposing the operations
//! the framework relies on:
//!
//! - element lookup by `id` and by attribute
//! - `inner_html` replacement from markup
//! - text-node traversal in document order, text reads and writes
//! - per-element event handlers (the `onclick` style, one per event name)
//!
//! Node ids are arena indices that are never reused, so a binding that still
//! points at a removed text node simply stops having an effect.

mod document;
mod element;
pub mod html;
mod node;

pub use document::{Document, DomHandler};
pub use element::ElementRef;
pub use node::{NodeId, NodeKind};
