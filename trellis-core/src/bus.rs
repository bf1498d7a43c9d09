//! Event Bus
//!
//! Named publish/subscribe with a wildcard channel.
//!
//! # Delivery
//!
//! `emit` is synchronous: every subscriber of the exact name runs, in
//! registration order, followed by every wildcard subscriber, before `emit`
//! returns. Handler lists are copied out of the lock before delivery, so a
//! handler may subscribe, unsubscribe or emit again while it runs.
//!
//! Named delivery follows DOM dispatch rules. A subscriber added during a
//! dispatch is not called by that dispatch, and a subscriber removed during
//! a dispatch is not called if it has not run yet. Wildcard delivery works
//! on a plain snapshot.
//!
//! There is no isolation between handlers. A handler that panics unwinds
//! through `emit` and the handlers after it are not called.
//!
//! # Identity
//!
//! Every subscription returns a [`ListenerId`], and that id is what `off`
//! and `off_any` remove. This includes `once` subscriptions, which can be
//! cancelled before they fire.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::trace;

/// Unique identifier for a bus subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

/// An emitted event, as seen by named subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub name: String,
    pub detail: Value,
}

type Handler = Box<dyn Fn(&Event) + Send + Sync>;
type WildcardHandler = Arc<dyn Fn(&str, &Value) + Send + Sync>;

/// One named subscription.
struct Listener {
    id: ListenerId,
    /// Set by `off` so an in-flight dispatch skips this listener.
    removed: AtomicBool,
    handler: Handler,
}

impl Listener {
    fn new(id: ListenerId, handler: Handler) -> Arc<Self> {
        Arc::new(Self {
            id,
            removed: AtomicBool::new(false),
            handler,
        })
    }
}

#[derive(Default)]
struct BusInner {
    /// Named subscriptions, in registration order per event name.
    listeners: RwLock<HashMap<String, Vec<Arc<Listener>>>>,

    /// Subscriptions to every event.
    wildcard: RwLock<Vec<(ListenerId, WildcardHandler)>>,
}

/// A shared event bus. Cloning shares the subscriptions.
///
/// # Example
///
/// ```rust,ignore
/// let bus = EventBus::new();
/// let id = bus.on("counter:changed", |event| println!("{}", event.detail));
/// bus.emit("counter:changed", json!({"value": 1}));
/// bus.off("counter:changed", id);
/// ```
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to one event name.
    pub fn on<F>(&self, event: &str, handler: F) -> ListenerId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = ListenerId::new();
        self.inner
            .listeners
            .write()
            .entry(event.to_string())
            .or_default()
            .push(Listener::new(id, Box::new(handler)));
        id
    }

    /// Remove a subscription made with [`on`](Self::on) or [`once`](Self::once).
    ///
    /// Returns whether a subscription was removed.
    pub fn off(&self, event: &str, id: ListenerId) -> bool {
        let mut listeners = self.inner.listeners.write();
        let Some(handlers) = listeners.get_mut(event) else {
            return false;
        };
        let Some(index) = handlers.iter().position(|listener| listener.id == id) else {
            return false;
        };
        handlers.remove(index).removed.store(true, Ordering::SeqCst);
        if handlers.is_empty() {
            listeners.remove(event);
        }
        true
    }

    /// Subscribe for a single delivery.
    pub fn once<F>(&self, event: &str, handler: F) -> ListenerId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let fired = AtomicBool::new(false);
        let bus = self.downgrade();
        let name = event.to_string();
        let id = ListenerId::new();
        let wrapper: Handler = Box::new(move |event: &Event| {
            if fired.swap(true, Ordering::SeqCst) {
                return;
            }
            if let Some(bus) = bus.upgrade() {
                bus.off(&name, id);
            }
            handler(event);
        });
        self.inner
            .listeners
            .write()
            .entry(event.to_string())
            .or_default()
            .push(Listener::new(id, wrapper));
        id
    }

    /// Deliver an event to its named subscribers, then to wildcard subscribers.
    pub fn emit<V: Into<Value>>(&self, event: &str, detail: V) {
        let event = Event {
            name: event.to_string(),
            detail: detail.into(),
        };

        let handlers: Vec<Arc<Listener>> = self
            .inner
            .listeners
            .read()
            .get(&event.name)
            .cloned()
            .unwrap_or_default();
        let wildcard: Vec<WildcardHandler> = self
            .inner
            .wildcard
            .read()
            .iter()
            .map(|(_, h)| Arc::clone(h))
            .collect();

        trace!(
            event = %event.name,
            named = handlers.len(),
            wildcard = wildcard.len(),
            "emit"
        );

        for listener in handlers {
            // Removed by an earlier handler of this dispatch.
            if listener.removed.load(Ordering::SeqCst) {
                continue;
            }
            (listener.handler)(&event);
        }
        for handler in wildcard {
            handler(&event.name, &event.detail);
        }
    }

    /// Emit with a `null` detail.
    pub fn emit_empty(&self, event: &str) {
        self.emit(event, Value::Null);
    }

    /// Subscribe to every event. The handler receives `(name, detail)`.
    pub fn on_any<F>(&self, handler: F) -> ListenerId
    where
        F: Fn(&str, &Value) + Send + Sync + 'static,
    {
        let id = ListenerId::new();
        self.inner.wildcard.write().push((id, Arc::new(handler)));
        id
    }

    /// Remove a wildcard subscription.
    pub fn off_any(&self, id: ListenerId) -> bool {
        let mut wildcard = self.inner.wildcard.write();
        let before = wildcard.len();
        wildcard.retain(|(existing, _)| *existing != id);
        wildcard.len() != before
    }

    /// Number of named subscribers for an event.
    pub fn listener_count(&self, event: &str) -> usize {
        self.inner
            .listeners
            .read()
            .get(event)
            .map(Vec::len)
            .unwrap_or(0)
    }

    pub fn wildcard_count(&self) -> usize {
        self.inner.wildcard.read().len()
    }

    /// Drop every subscription.
    pub fn clear(&self) {
        for listener in self.inner.listeners.write().drain().flat_map(|(_, l)| l) {
            listener.removed.store(true, Ordering::SeqCst);
        }
        self.inner.wildcard.write().clear();
    }

    fn downgrade(&self) -> WeakEventBus {
        WeakEventBus {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

impl Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let named: usize = self.inner.listeners.read().values().map(Vec::len).sum();
        f.debug_struct("EventBus")
            .field("named", &named)
            .field("wildcard", &self.wildcard_count())
            .finish()
    }
}

/// A non-owning bus handle, so `once` wrappers do not keep the bus alive.
struct WeakEventBus {
    inner: std::sync::Weak<BusInner>,
}

impl WeakEventBus {
    fn upgrade(&self) -> Option<EventBus> {
        self.inner.upgrade().map(|inner| EventBus { inner })
    }
}
