//! Hash Router
//!
//! The router maps the URL hash to a page and renders it into the mount
//! element.
//!
//! # Navigation
//!
//! 1. The hash (without `#`, the default route when empty) names a route.
//! 2. Unknown route: the mount shows the not-found markup. This ends the
//!    navigation but not the router.
//! 3. Known route: the previous page's bindings are disposed and the mount
//!    shows the loading markup. A lazy route's loader is awaited and its
//!    `default` page is used.
//! 4. The page template replaces the mount content, the mount is bound to
//!    the store, components are expanded, and the page's init hook is
//!    awaited with the store and the bus.
//!
//! # States
//!
//! `Idle -> Loading -> Rendered`, and `Loading -> NotFound` for unknown
//! routes. A failed lazy load stays in `Loading` with the loading markup
//! visible.
//!
//! # Overlapping Navigations
//!
//! Every navigation takes a new generation number. When a lazy load
//! resolves after a newer navigation has started, its result is discarded
//! instead of overwriting the newer page.

use std::fmt::Debug;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::future::{self, BoxFuture, FutureExt};
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::app::App;
use crate::bus::EventBus;
use crate::dom::NodeId;
use crate::error::{Error, LoadError, Result};
use crate::state::{BindingScope, Store};

/// A page's init hook. It may be asynchronous.
pub type PageInit = Arc<dyn Fn(Store, EventBus) -> BoxFuture<'static, ()> + Send + Sync>;

/// A lazy route's loader.
pub type PageLoader =
    Arc<dyn Fn() -> BoxFuture<'static, std::result::Result<PageModule, LoadError>> + Send + Sync>;

/// A page: template plus optional init hook.
#[derive(Clone)]
pub struct PageDef {
    pub template: String,
    pub init: Option<PageInit>,
}

impl PageDef {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            init: None,
        }
    }

    /// Attach an asynchronous init hook.
    pub fn with_init<F, Fut>(mut self, init: F) -> Self
    where
        F: Fn(Store, EventBus) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let init: PageInit = Arc::new(move |store: Store, bus: EventBus| init(store, bus).boxed());
        self.init = Some(init);
        self
    }

    /// Attach a synchronous init hook.
    pub fn with_sync_init<F>(mut self, init: F) -> Self
    where
        F: Fn(&Store, &EventBus) + Send + Sync + 'static,
    {
        let init: PageInit = Arc::new(move |store: Store, bus: EventBus| {
            init(&store, &bus);
            future::ready(()).boxed()
        });
        self.init = Some(init);
        self
    }
}

impl Debug for PageDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageDef")
            .field("template_len", &self.template.len())
            .field("has_init", &self.init.is_some())
            .finish()
    }
}

/// What a lazy loader resolves to: a module whose default export is the page.
#[derive(Debug, Clone)]
pub struct PageModule {
    pub default: PageDef,
}

impl From<PageDef> for PageModule {
    fn from(page: PageDef) -> Self {
        Self { default: page }
    }
}

/// A route table entry.
#[derive(Clone)]
pub enum Route {
    /// A page available up front.
    Page(PageDef),

    /// A page fetched on first navigation.
    Lazy(PageLoader),
}

impl Route {
    pub fn lazy<F, Fut>(loader: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<PageModule, LoadError>> + Send + 'static,
    {
        let loader: PageLoader = Arc::new(move || loader().boxed());
        Self::Lazy(loader)
    }
}

impl Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Page(page) => f.debug_tuple("Page").field(page).finish(),
            Self::Lazy(_) => f.write_str("Lazy"),
        }
    }
}

/// Route name to route.
#[derive(Clone, Debug, Default)]
pub struct RouteTable {
    routes: IndexMap<String, Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, name: &str, page: PageDef) -> Self {
        self.insert(name, Route::Page(page));
        self
    }

    pub fn lazy<F, Fut>(mut self, name: &str, loader: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<PageModule, LoadError>> + Send + 'static,
    {
        self.insert(name, Route::lazy(loader));
        self
    }

    pub fn insert(&mut self, name: &str, route: Route) {
        self.routes.insert(name.to_string(), route);
    }

    pub fn get(&self, name: &str) -> Option<&Route> {
        self.routes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.routes.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Where the router is in its navigation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteState {
    Idle,
    Loading,
    Rendered,
    NotFound,
}

/// How one navigation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationOutcome {
    Rendered,
    NotFound,
    /// A newer navigation started while this one was loading.
    Superseded,
}

#[derive(Debug)]
struct RouterStatus {
    state: RouteState,

    /// Route of the latest navigation that changed the mount.
    route: Option<String>,
}

/// Renders routes into the app's mount element.
pub struct Router {
    app: App,
    routes: RouteTable,

    /// Bumped at the start of every navigation.
    generation: AtomicU64,
    status: RwLock<RouterStatus>,
    /// Bindings of the page currently mounted.
    active: Mutex<Option<BindingScope>>,
}

impl Router {
    pub fn new(app: App, routes: RouteTable) -> Self {
        Self {
            app,
            routes,
            generation: AtomicU64::new(0),
            status: RwLock::new(RouterStatus {
                state: RouteState::Idle,
                route: None,
            }),
            active: Mutex::new(None),
        }
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn state(&self) -> RouteState {
        self.status.read().state
    }

    /// Name of the route of the latest navigation that changed the mount.
    pub fn current_route(&self) -> Option<String> {
        self.status.read().route.clone()
    }

    /// Number of navigations started so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Resolve a hash to a route name.
    pub fn route_name<'h>(&'h self, hash: &'h str) -> &'h str {
        let hash = hash.strip_prefix('#').unwrap_or(hash);
        if hash.is_empty() {
            self.app.config().default_route.as_str()
        } else {
            hash
        }
    }

    /// Render the route for the location's current hash.
    pub async fn start(&self) -> Result<NavigationOutcome> {
        let hash = self.app.location().hash();
        self.navigate(&hash).await
    }

    /// Render the route for `hash`.
    ///
    /// This is what a hashchange runs. It does not modify the location; to
    /// change the URL, set the hash on the app's location and let
    /// [`listen`](Self::listen) pick it up.
    pub async fn navigate(&self, hash: &str) -> Result<NavigationOutcome> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let name = self.route_name(hash).to_string();
        let config = self.app.config();
        let document = self.app.document();
        let mount = self.mount()?;

        let Some(route) = self.routes.get(&name).cloned() else {
            debug!(route = %name, "no such route");
            self.teardown();
            document.set_inner_html(mount, &config.not_found_html);
            self.set_status(RouteState::NotFound, name);
            return Ok(NavigationOutcome::NotFound);
        };

        debug!(route = %name, generation, "navigating");
        self.teardown();
        document.set_inner_html(mount, &config.loading_html);
        self.set_status(RouteState::Loading, name.clone());

        let page = match route {
            Route::Page(page) => page,
            Route::Lazy(loader) => {
                let loaded = loader().await;
                if self.is_stale(generation) {
                    debug!(route = %name, generation, "discarding superseded load");
                    return Ok(NavigationOutcome::Superseded);
                }
                match loaded {
                    Ok(module) => module.default,
                    Err(source) => {
                        warn!(route = %name, error = %source, "route failed to load");
                        return Err(Error::RouteLoad {
                            route: name,
                            source,
                        });
                    }
                }
            }
        };

        // The mount may have been removed while the loader ran
        let mount = self.mount()?;
        self.render(mount, &page);
        self.set_status(RouteState::Rendered, name);

        if let Some(init) = page.init {
            init(self.app.store().clone(), self.app.bus().clone()).await;
        }
        Ok(NavigationOutcome::Rendered)
    }

    /// Follow the app's location, navigating on every hash change.
    ///
    /// Each change runs as its own task, so a slow lazy load does not hold
    /// up later navigations. Abort the returned handle to stop listening.
    pub fn listen(self: &Arc<Self>) -> JoinHandle<()> {
        let router = Arc::clone(self);
        let mut changes = self.app.location().subscribe();
        tokio::spawn(async move {
            loop {
                let hash = match changes.recv().await {
                    Ok(hash) => hash,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "hashchange listener lagged, jumping to current hash");
                        router.app.location().hash()
                    }
                    Err(RecvError::Closed) => break,
                };
                let router = Arc::clone(&router);
                tokio::spawn(async move {
                    if let Err(err) = router.navigate(&hash).await {
                        warn!(error = %err, "navigation failed");
                    }
                });
            }
        })
    }

    fn mount(&self) -> Result<NodeId> {
        self.app.mount().ok_or_else(|| {
            let id = self.app.config().mount_id.clone();
            warn!(mount = %id, "mount element missing");
            Error::MountNotFound(id)
        })
    }

    fn render(&self, mount: NodeId, page: &PageDef) {
        let store = self.app.store();
        self.app.document().set_inner_html(mount, &page.template);
        let mut scope = store.bind_templates(mount);
        scope.absorb(
            self.app
                .components()
                .render_components(mount, store, self.app.bus()),
        );
        if let Some(previous) = self.active.lock().replace(scope) {
            previous.dispose();
        }
    }

    fn teardown(&self) {
        let previous = self.active.lock().take();
        if let Some(scope) = previous {
            scope.dispose();
        }
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != generation
    }

    fn set_status(&self, state: RouteState, route: String) {
        let mut status = self.status.write();
        status.state = state;
        status.route = Some(route);
    }
}

impl Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes.len())
            .field("state", &self.state())
            .field("current_route", &self.current_route())
            .field("generation", &self.generation())
            .finish()
    }
}
