//! Hash Location
//!
//! The URL hash fragment is the router's only input. [`HashLocation`] holds
//! the current fragment and broadcasts a `hashchange` notification whenever
//! it actually changes, the way a browser only fires `hashchange` when the
//! fragment differs.

use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::trace;

/// Capacity of the hashchange channel. Slow listeners that fall further
/// behind skip to the current hash.
const CHANNEL_CAPACITY: usize = 64;

/// A shared, observable URL hash.
#[derive(Clone)]
pub struct HashLocation {
    /// Current fragment, without `#`.
    hash: Arc<RwLock<String>>,

    /// Fires with the new fragment on every change.
    changes: broadcast::Sender<String>,
}

impl HashLocation {
    /// A location with an empty hash.
    pub fn new() -> Self {
        Self::with_hash("")
    }

    pub fn with_hash(hash: &str) -> Self {
        let (changes, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            hash: Arc::new(RwLock::new(normalize(hash).to_string())),
            changes,
        }
    }

    /// The current fragment, without the leading `#`.
    pub fn hash(&self) -> String {
        self.hash.read().clone()
    }

    /// Set the fragment. A leading `#` is accepted and stripped.
    ///
    /// Returns `true` and notifies subscribers if the fragment changed.
    pub fn set_hash(&self, hash: &str) -> bool {
        let hash = normalize(hash);
        {
            let mut current = self.hash.write();
            if *current == hash {
                return false;
            }
            current.clear();
            current.push_str(hash);
        }
        trace!(hash, "hashchange");
        // No receivers is fine: nobody is listening yet.
        let _ = self.changes.send(hash.to_string());
        true
    }

    /// Receive every subsequent hash change.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.changes.subscribe()
    }
}

impl Default for HashLocation {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for HashLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashLocation")
            .field("hash", &self.hash())
            .finish()
    }
}

fn normalize(hash: &str) -> &str {
    hash.strip_prefix('#').unwrap_or(hash)
}
