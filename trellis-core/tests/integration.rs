//! Integration Tests for the Application Pipeline
//!
//! These tests drive a full app the way a consumer would: routes render into
//! the mount, components expand and wire their buttons, state writes refresh
//! bound text and components talk over the bus.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};

use trellis_core::{
    App, AppConfig, ComponentDef, ComponentRegistry, InvalidationPolicy, NavigationOutcome,
    PageDef, PageModule, RouteState, RouteTable,
};

fn demo_state() -> Value {
    json!({
        "app": {"title": "Trellis Demo"},
        "counter": {"value": 0, "label": "Clicks"},
        "user": {"name": "Ada", "profile": {"theme": "dark"}},
        "user2": {"name": "Grace"}
    })
}

fn text_of(app: &App, id: &str) -> String {
    let node = app.document().get_element_by_id(id).unwrap();
    app.document().text_content(node)
}

fn register_demo_components(app: &App) {
    app.components().register("Counter", || {
        ComponentDef::new(
            r#"<h3>{{counter.label}}: <span id="count">{{counter.value}}</span></h3><button id="inc">+</button>"#,
        )
        .with_init(|store, bus, root| {
            let store = store.clone();
            let bus = bus.clone();
            if let Some(button) = root.find_by_id("inc") {
                button.on("click", move |_| {
                    let counter = store.node("counter");
                    counter.update("value", |v| json!(v.and_then(Value::as_i64).unwrap_or(0) + 1));
                    bus.emit("counter:changed", counter.get("value").unwrap_or_default());
                });
            }
        })
    });

    app.components().register("UserCard", || {
        ComponentDef::new(
            r#"<p id="name">{{user.name}}</p><p id="theme">{{user.profile.theme}}</p><button id="toggle">Toggle</button>"#,
        )
        .with_init(|store, bus, root| {
            let store = store.clone();
            let bus = bus.clone();
            if let Some(button) = root.find_by_id("toggle") {
                button.on("click", move |_| {
                    let profile = store.node("user").child("profile");
                    let next = match profile.get("theme").as_ref().and_then(Value::as_str) {
                        Some("dark") => "light",
                        _ => "dark",
                    };
                    profile.set("theme", next);
                    bus.emit("user:theme-changed", next);
                });
            }
        })
    });
}

fn demo_routes() -> RouteTable {
    RouteTable::new()
        .page(
            "home",
            PageDef::new(
                r#"<h1 id="title">{{app.title}}</h1><div data-component="Counter"></div>"#,
            ),
        )
        .lazy("profile", || async {
            Ok(PageModule::from(PageDef::new(
                r#"<h1 id="title">{{app.title}}</h1><div data-component="UserCard"></div><div data-component="Missing"><em id="fallback">kept</em></div>"#,
            )))
        })
}

/// Test that clicking the counter refreshes its text and leaves the title alone.
#[tokio::test]
async fn counter_click_updates_only_related_text() {
    let app = App::new(AppConfig::default(), demo_state());
    register_demo_components(&app);
    let router = app.router(demo_routes());

    let changes = Arc::new(Mutex::new(Vec::new()));
    let changes_clone = changes.clone();
    app.bus().on("counter:changed", move |event| {
        changes_clone.lock().push(event.detail.clone());
    });

    assert_eq!(router.start().await.unwrap(), NavigationOutcome::Rendered);
    assert_eq!(text_of(&app, "count"), "0");

    let inc = app.document().get_element_by_id("inc").unwrap();
    app.document().dispatch(inc, "click");
    app.document().dispatch(inc, "click");

    assert_eq!(text_of(&app, "count"), "2");
    assert_eq!(text_of(&app, "title"), "Trellis Demo");
    assert_eq!(*changes.lock(), vec![json!(1), json!(2)]);
}

/// Test that a lazy page expands its components and the wildcard sees events.
#[tokio::test]
async fn lazy_profile_page_toggles_theme() {
    let app = App::new(AppConfig::default(), demo_state());
    register_demo_components(&app);
    let router = app.router(demo_routes());

    let log = Arc::new(Mutex::new(Vec::new()));
    let log_clone = log.clone();
    app.bus().on_any(move |name, detail| {
        log_clone.lock().push(format!("{name} {detail}"));
    });

    router.navigate("#profile").await.unwrap();
    assert_eq!(router.state(), RouteState::Rendered);
    assert_eq!(text_of(&app, "theme"), "dark");
    assert_eq!(text_of(&app, "fallback"), "kept");

    let toggle = app.document().get_element_by_id("toggle").unwrap();
    app.document().dispatch(toggle, "click");

    assert_eq!(text_of(&app, "theme"), "light");
    assert_eq!(text_of(&app, "name"), "Ada");
    assert_eq!(*log.lock(), vec!["user:theme-changed \"light\"".to_string()]);
}

/// Test that navigating away drops the previous page's bindings.
#[tokio::test]
async fn navigation_replaces_page_bindings() {
    let app = App::new(AppConfig::default(), demo_state());
    register_demo_components(&app);
    let router = app.router(demo_routes());

    router.navigate("home").await.unwrap();
    let home_bindings = app.store().binding_count();
    assert!(home_bindings > 0);

    router.navigate("nowhere").await.unwrap();
    assert_eq!(router.state(), RouteState::NotFound);
    assert_eq!(app.store().binding_count(), 0);
    assert_eq!(app.store().set("counter.value", 5), 0);

    router.navigate("home").await.unwrap();
    assert_eq!(app.store().binding_count(), home_bindings);
    assert_eq!(text_of(&app, "count"), "5");
}

/// Test that binding the same subtree twice refreshes each node once per write.
#[test]
fn rebinding_is_idempotent() {
    let app = App::new(AppConfig::default(), demo_state());
    let mount = app.mount().unwrap();
    app.document()
        .set_inner_html(mount, "<p>{{counter.value}}</p><p>{{app.title}}</p>");

    let first = app.store().bind_templates(mount);
    let second = app.store().bind_templates(mount);

    assert_eq!(first.len(), 2);
    assert!(second.is_empty());
    assert_eq!(app.store().set("counter.value", 3), 1);
    assert_eq!(app.document().text_content(mount), "3Trellis Demo");
}

/// Test the legacy rule's first-segment false positive.
#[test]
fn legacy_policy_refreshes_prefix_siblings() {
    let app = App::new(AppConfig::default(), demo_state());
    let mount = app.mount().unwrap();
    app.document()
        .set_inner_html(mount, "<p>{{user.name}}</p><p>{{user2.name}}</p>");
    let _scope = app.store().bind_templates(mount);

    // "user2.name" string-starts with the first segment of "user.name".
    assert_eq!(app.store().set("user2.name", "Hopper"), 2);
    assert_eq!(app.document().text_content(mount), "AdaHopper");
}

/// Test that the lineage policy refreshes ancestors but not siblings.
#[test]
fn lineage_policy_from_config() {
    let config = AppConfig::from_json(r#"{"invalidation": "lineage"}"#).unwrap();
    assert_eq!(config.invalidation, InvalidationPolicy::Lineage);

    let app = App::new(config, demo_state());
    let mount = app.mount().unwrap();
    app.document().set_inner_html(
        mount,
        "<p>{{user}}</p><p>{{user.profile.theme}}</p><p>{{user2.name}}</p>",
    );
    let _scope = app.store().bind_templates(mount);

    assert_eq!(app.store().set("user.profile.theme", "light"), 2);
    assert_eq!(app.store().set("user2.name", "Hopper"), 1);
    assert_eq!(
        app.document().text_content(mount),
        "[object Object]lightHopper"
    );
}

/// Test that objects assigned after construction are reactive.
#[test]
fn late_assigned_objects_are_reactive() {
    let app = App::new(AppConfig::default(), json!({}));
    let mount = app.mount().unwrap();
    app.document()
        .set_inner_html(mount, "<p>{{session.user.name}}</p>");
    let _scope = app.store().bind_templates(mount);
    assert_eq!(app.document().text_content(mount), "");

    app.store().root().set("session", json!({"user": {"name": "Ada"}}));
    assert_eq!(app.document().text_content(mount), "Ada");

    app.store()
        .node("session")
        .child("user")
        .set("name", "Grace");
    assert_eq!(app.document().text_content(mount), "Grace");
}

/// Test that a page init hook can seed state after render.
#[tokio::test]
async fn page_init_receives_store_and_bus() {
    let app = App::new(AppConfig::default(), demo_state());
    let ready = Arc::new(Mutex::new(false));
    let ready_clone = ready.clone();
    app.bus().once("page:ready", move |_| *ready_clone.lock() = true);

    let router = app.router(RouteTable::new().page(
        "home",
        PageDef::new(r#"<h1 id="title">{{app.title}}</h1>"#).with_init(|store, bus| async move {
            store.set("app.title", "Welcome");
            bus.emit_empty("page:ready");
        }),
    ));

    router.start().await.unwrap();

    assert_eq!(text_of(&app, "title"), "Welcome");
    assert!(*ready.lock());
    assert_eq!(app.bus().listener_count("page:ready"), 0);
}

/// A lazy page whose init hook registers the component its template uses.
fn self_registering_page(
    components: ComponentRegistry,
    registrations: Arc<AtomicUsize>,
) -> PageDef {
    PageDef::new(r#"<div id="slot" data-component="Counter"><em>pending</em></div>"#).with_init(
        move |_store, _bus| {
            let components = components.clone();
            let registrations = registrations.clone();
            async move {
                if components.has("Counter") {
                    return;
                }
                tokio::task::yield_now().await;
                components.register("Counter", || {
                    ComponentDef::new(r#"<span id="count">{{counter.value}}</span>"#)
                });
                registrations.fetch_add(1, Ordering::SeqCst);
            }
        },
    )
}

/// Test that a page can register its components lazily, once, from init.
#[tokio::test]
async fn page_init_registers_components_once() {
    let app = App::new(AppConfig::default(), demo_state());
    let registrations = Arc::new(AtomicUsize::new(0));
    let components = app.components().clone();
    let registrations_clone = registrations.clone();
    let router = app.router(
        RouteTable::new()
            .lazy("home", move || {
                let page = self_registering_page(components.clone(), registrations_clone.clone());
                async move { Ok(PageModule::from(page)) }
            })
            .page("about", PageDef::new("<p>about</p>")),
    );

    // Components render before init runs, so the first visit keeps the placeholder.
    router.navigate("home").await.unwrap();
    assert!(app.components().has("Counter"));
    assert_eq!(text_of(&app, "slot"), "pending");

    router.navigate("about").await.unwrap();
    router.navigate("home").await.unwrap();

    assert_eq!(text_of(&app, "count"), "0");
    assert_eq!(registrations.load(Ordering::SeqCst), 1);

    app.store().set("counter.value", 4);
    assert_eq!(text_of(&app, "count"), "4");
}
