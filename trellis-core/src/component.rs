//! Components
//!
//! A component is a named factory producing a template and an optional init
//! hook. Placeholders in the document name the component they expand into:
//!
//! ```html
//! <div data-component="Counter"></div>
//! ```
//!
//! Rendering a subtree expands every placeholder whose component is
//! registered: the placeholder's content is replaced by the template, the
//! new content is bound to the store, and the init hook runs with the store,
//! the bus and the placeholder element. Placeholders naming an unknown
//! component are left exactly as they are.

use std::fmt::Debug;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::bus::EventBus;
use crate::dom::{ElementRef, NodeId};
use crate::state::{BindingScope, Store};

/// A component's init hook: `(store, bus, root element)`.
pub type ComponentInit = Arc<dyn Fn(&Store, &EventBus, &ElementRef) + Send + Sync>;

/// A zero-argument factory producing a fresh component definition.
pub type ComponentFactory = Arc<dyn Fn() -> ComponentDef + Send + Sync>;

/// What a component factory returns.
#[derive(Clone)]
pub struct ComponentDef {
    pub template: String,
    pub init: Option<ComponentInit>,
}

impl ComponentDef {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            init: None,
        }
    }

    pub fn with_init<F>(mut self, init: F) -> Self
    where
        F: Fn(&Store, &EventBus, &ElementRef) + Send + Sync + 'static,
    {
        self.init = Some(Arc::new(init));
        self
    }
}

impl Debug for ComponentDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentDef")
            .field("template_len", &self.template.len())
            .field("has_init", &self.init.is_some())
            .finish()
    }
}

/// Name-to-factory registry. Cloning shares the registrations.
#[derive(Clone)]
pub struct ComponentRegistry {
    factories: Arc<DashMap<String, ComponentFactory>>,

    /// Attribute naming a placeholder's component.
    attribute: Arc<str>,
}

impl ComponentRegistry {
    /// A registry that looks for `data-component` placeholders.
    pub fn new() -> Self {
        Self::with_attribute("data-component")
    }

    pub fn with_attribute(attribute: &str) -> Self {
        Self {
            factories: Arc::new(DashMap::new()),
            attribute: Arc::from(attribute),
        }
    }

    /// The placeholder attribute this registry expands.
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Register a factory, silently replacing any previous one of that name.
    pub fn register<F>(&self, name: &str, factory: F)
    where
        F: Fn() -> ComponentDef + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Arc::new(factory));
    }

    pub fn has(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn unregister(&self, name: &str) -> bool {
        self.factories.remove(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Expand every registered placeholder under `root`.
    ///
    /// Returns a scope owning the bindings created inside the expanded
    /// components. The placeholder list is collected up front, so components
    /// appearing inside a freshly expanded template are not expanded in the
    /// same pass, and placeholders removed by an earlier expansion are
    /// skipped.
    pub fn render_components(&self, root: NodeId, store: &Store, bus: &EventBus) -> BindingScope {
        let document = store.document();
        let mut scope = BindingScope::empty(store);

        for element in document.elements_with_attribute(root, &self.attribute) {
            if !document.contains(element) {
                continue;
            }
            let Some(name) = document.attribute(element, &self.attribute) else {
                continue;
            };
            let factory = self
                .factories
                .get(name.as_str())
                .map(|entry| Arc::clone(entry.value()));
            let Some(factory) = factory else {
                debug!(component = %name, "no component registered, leaving placeholder");
                continue;
            };

            let def = factory();
            document.set_inner_html(element, &def.template);
            scope.absorb(store.bind_templates(element));
            debug!(component = %name, "rendered component");

            if let Some(init) = &def.init {
                init(store, bus, &ElementRef::new(document.clone(), element));
            }
        }

        scope
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("attribute", &self.attribute)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use serde_json::json;
    use std::sync::atomic::{AtomicI32, Ordering};

    fn setup(markup: &str) -> (Document, Store, EventBus, ComponentRegistry) {
        let doc = Document::from_html(markup);
        let store = Store::new(json!({"counter": {"value": 0, "label": "Clicks"}}), doc.clone());
        (doc, store, EventBus::new(), ComponentRegistry::new())
    }

    #[test]
    fn renders_template_and_binds_it() {
        let (doc, store, bus, registry) = setup(r#"<div id="c" data-component="Label"></div>"#);
        registry.register("Label", || ComponentDef::new("<h3>{{counter.label}}</h3>"));

        let scope = registry.render_components(doc.root(), &store, &bus);

        let c = doc.get_element_by_id("c").unwrap();
        assert_eq!(doc.text_content(c), "Clicks");
        assert_eq!(scope.len(), 1);

        store.set("counter.label", "Taps");
        assert_eq!(doc.text_content(c), "Taps");
    }

    #[test]
    fn unregistered_component_is_left_untouched() {
        let (doc, store, bus, registry) =
            setup(r#"<div id="c" data-component="Missing"><em>original</em></div>"#);

        let scope = registry.render_components(doc.root(), &store, &bus);

        let c = doc.get_element_by_id("c").unwrap();
        assert_eq!(doc.inner_html(c), "<em>original</em>");
        assert!(scope.is_empty());
    }

    #[test]
    fn init_receives_store_bus_and_element() {
        let (doc, store, bus, registry) = setup(r#"<div id="c" data-component="Counter"></div>"#);
        registry.register("Counter", || {
            ComponentDef::new(r#"<p>{{counter.value}}</p><button id="inc">+</button>"#).with_init(
                |store, bus, root| {
                    let store = store.clone();
                    let bus = bus.clone();
                    if let Some(button) = root.find_by_id("inc") {
                        button.on("click", move |_| {
                            let counter = store.node("counter");
                            counter.update("value", |v| {
                                json!(v.and_then(|v| v.as_i64()).unwrap_or(0) + 1)
                            });
                            bus.emit("counter:changed", counter.get("value").unwrap_or_default());
                        });
                    }
                },
            )
        });
        let events = Arc::new(AtomicI32::new(0));
        let events_clone = events.clone();
        bus.on("counter:changed", move |_| {
            events_clone.fetch_add(1, Ordering::SeqCst);
        });

        let _scope = registry.render_components(doc.root(), &store, &bus);
        let inc = doc.get_element_by_id("inc").unwrap();
        doc.dispatch(inc, "click");
        doc.dispatch(inc, "click");

        let c = doc.get_element_by_id("c").unwrap();
        assert_eq!(doc.text_content(c), "2+");
        assert_eq!(events.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn register_overwrites_and_has_reports_membership() {
        let registry = ComponentRegistry::new();
        assert!(!registry.has("A"));
        registry.register("A", || ComponentDef::new("one"));
        registry.register("A", || ComponentDef::new("two"));
        assert!(registry.has("A"));
        assert_eq!(registry.len(), 1);

        let (doc, store, bus, _) = setup(r#"<div id="a" data-component="A"></div>"#);
        let _scope = registry.render_components(doc.root(), &store, &bus);
        assert_eq!(doc.text_content(doc.get_element_by_id("a").unwrap()), "two");
    }

    #[test]
    fn nested_placeholders_inside_an_expanded_component_are_skipped() {
        let (doc, store, bus, registry) = setup(
            r#"<div id="outer" data-component="Outer"><div data-component="Inner">stale</div></div>"#,
        );
        let inner_renders = Arc::new(AtomicI32::new(0));
        let inner_clone = inner_renders.clone();
        registry.register("Outer", || ComponentDef::new("<span>outer</span>"));
        registry.register("Inner", move || {
            inner_clone.fetch_add(1, Ordering::SeqCst);
            ComponentDef::new("inner")
        });

        let _scope = registry.render_components(doc.root(), &store, &bus);

        assert_eq!(inner_renders.load(Ordering::SeqCst), 0);
        assert_eq!(doc.text_content(doc.root()), "outer");
    }

    #[test]
    fn custom_attribute_is_respected() {
        let (doc, store, bus, _) = setup(r#"<div id="c" data-widget="W"></div>"#);
        let registry = ComponentRegistry::with_attribute("data-widget");
        registry.register("W", || ComponentDef::new("widget"));

        let _scope = registry.render_components(doc.root(), &store, &bus);

        assert_eq!(doc.text_content(doc.get_element_by_id("c").unwrap()), "widget");
    }
}
