//! Application Instance
//!
//! An [`App`] bundles the pieces one running application shares: the
//! document, the reactive store, the event bus, the component registry, the
//! hash location and the configuration. It is constructed once and handed to
//! the router; pages and components receive the store and bus through their
//! hooks. Nothing here is global, so independent apps can coexist.

use std::fmt::Debug;
use std::sync::Arc;

use serde_json::Value;

use crate::bus::EventBus;
use crate::component::ComponentRegistry;
use crate::config::AppConfig;
use crate::dom::{html, Document, NodeId};
use crate::location::HashLocation;
use crate::router::{RouteTable, Router};
use crate::state::Store;

/// One framework instance. Cloning shares everything.
#[derive(Clone)]
pub struct App {
    config: Arc<AppConfig>,
    document: Document,
    store: Store,
    bus: EventBus,
    components: ComponentRegistry,
    location: HashLocation,
}

impl App {
    /// Create an app over a fresh document holding only the mount element.
    pub fn new(config: AppConfig, state: Value) -> Self {
        let document = Document::from_html(&format!(
            r#"<div id="{}"></div>"#,
            html::escape_attribute(&config.mount_id)
        ));
        Self::with_document(config, document, state)
    }

    /// Create an app over an existing document.
    pub fn with_document(config: AppConfig, document: Document, state: Value) -> Self {
        let store = Store::with_policy(state, document.clone(), config.invalidation);
        let components = ComponentRegistry::with_attribute(&config.component_attribute);
        Self {
            config: Arc::new(config),
            document,
            store,
            bus: EventBus::new(),
            components,
            location: HashLocation::new(),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    pub fn location(&self) -> &HashLocation {
        &self.location
    }

    /// The mount element, if it is in the document.
    pub fn mount(&self) -> Option<NodeId> {
        self.document.get_element_by_id(&self.config.mount_id)
    }

    /// Build a router for this app.
    pub fn router(&self, routes: RouteTable) -> Arc<Router> {
        Arc::new(Router::new(self.clone(), routes))
    }
}

impl Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("config", &self.config)
            .field("store", &self.store)
            .field("bus", &self.bus)
            .field("components", &self.components)
            .field("location", &self.location)
            .finish()
    }
}
