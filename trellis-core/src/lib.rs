//! Trellis Core
//!
//! This crate provides the core runtime for the Trellis single-page
//! application framework. It implements:
//!
//! - An event bus with named and wildcard subscriptions
//! - A reactive state tree bound to `{{path}}` text templates
//! - A component registry expanding `data-component` placeholders
//! - A hash router with lazy pages and a not-found fallback
//!
//! Rendering targets a small in-memory document model, so the whole
//! pipeline runs (and is tested) natively.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `bus`: Publish/subscribe between components
//! - `state`: State tree, template bindings and invalidation
//! - `component`: Component registry and placeholder rendering
//! - `router`: Hash routes, lazy loading and navigation
//! - `dom`: Document model and markup parsing
//! - `app`: The instance tying the pieces together
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use trellis_core::{App, AppConfig, PageDef, RouteTable};
//!
//! let app = App::new(AppConfig::default(), json!({"app": {"title": "Demo"}}));
//! let router = app.router(
//!     RouteTable::new().page("home", PageDef::new("<h1>{{app.title}}</h1>")),
//! );
//! router.start().await?;
//!
//! // Writes refresh every bound text node
//! app.store().set("app.title", "Renamed");
//! ```

pub mod app;
pub mod bus;
pub mod component;
pub mod config;
pub mod dom;
pub mod error;
pub mod location;
pub mod router;
pub mod state;

pub use app::App;
pub use bus::{Event, EventBus, ListenerId};
pub use component::{ComponentDef, ComponentRegistry};
pub use config::AppConfig;
pub use dom::{Document, ElementRef, NodeId};
pub use error::{Error, LoadError, Result};
pub use location::HashLocation;
pub use router::{NavigationOutcome, PageDef, PageModule, Route, RouteState, RouteTable, Router};
pub use state::{BindingScope, InvalidationPolicy, StateNode, StatePath, Store};
