//! Secondary caches holding lists that belong to a parent record.
//!
//! An entry is created by its first fetch, replaced wholesale by every refetch and
//! dropped when its parent is cleared. Mutations that change the underlying data
//! either replace the list with the server's answer or remove the entry so the
//! next read refetches it.

use crate::{
    api::Outcome,
    cache::{
        events::{CacheCounters, CacheEvent, CacheScope, CacheStats, EventPublisher},
        ledger::{InflightLedger, LoadTracker, Ticket},
        FetchMode,
    },
};
use ahash::RandomState;
use dashmap::DashMap;
use std::{fmt, future::Future, sync::Arc};
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

/// A cache whose entries are keyed by the id of another record.
///
/// Entity caches call these hooks from `clear`, so dropping a record also drops
/// everything derived from it.
pub trait DerivedCollection: Send + Sync {
    fn name(&self) -> &'static str;

    /// Removes every entry belonging to `parent`. Returns the number removed.
    fn clear_parent(&self, parent: &str) -> usize;

    fn clear_all(&self);
}

/// Key of a derived entry: a parent id, optionally narrowed by a second id.
///
/// Renders as `parent` or `parent-child`, e.g. `event42-user7` for one user's
/// submission to an event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionKey {
    parent: String,
    child: Option<String>,
}

impl CollectionKey {
    #[must_use]
    pub fn parent(parent: impl Into<String>) -> Self {
        Self { parent: parent.into(), child: None }
    }

    #[must_use]
    pub fn pair(parent: impl Into<String>, child: impl Into<String>) -> Self {
        Self { parent: parent.into(), child: Some(child.into()) }
    }

    #[must_use]
    pub fn parent_id(&self) -> &str {
        &self.parent
    }

    #[must_use]
    pub fn child_id(&self) -> Option<&str> {
        self.child.as_deref()
    }
}

impl fmt::Display for CollectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.child {
            Some(child) => write!(f, "{}-{child}", self.parent),
            None => f.write_str(&self.parent),
        }
    }
}

struct DerivedEntry<T> {
    parent: String,
    items: Arc<Vec<T>>,
}

pub struct DerivedCache<T> {
    name: &'static str,
    entries: DashMap<String, DerivedEntry<T>, RandomState>,
    ledger: InflightLedger,
    loads: LoadTracker,
    events: EventPublisher,
    counters: CacheCounters,
}

impl<T> DerivedCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: DashMap::with_hasher(RandomState::new()),
            ledger: InflightLedger::new(),
            loads: LoadTracker::new(),
            events: EventPublisher::new(CacheScope::Collection(name)),
            counters: CacheCounters::default(),
        }
    }

    #[must_use]
    pub fn get(&self, key: &CollectionKey) -> Option<Arc<Vec<T>>> {
        self.entries.get(&key.to_string()).map(|entry| Arc::clone(&entry.items))
    }

    #[must_use]
    pub fn has(&self, key: &CollectionKey) -> bool {
        self.entries.contains_key(&key.to_string())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stores `items` as the full collection for `key`.
    pub fn replace(&self, key: &CollectionKey, items: Vec<T>) -> Arc<Vec<T>> {
        let rendered = key.to_string();
        let items = Arc::new(items);
        self.entries.insert(
            rendered.clone(),
            DerivedEntry { parent: key.parent.clone(), items: Arc::clone(&items) },
        );
        self.events.inserted(&rendered);
        items
    }

    /// Applies `f` to a copy of the cached collection and stores the result.
    ///
    /// Readers holding the previous `Arc` keep seeing the old list. Returns `None`
    /// when nothing is cached for `key`.
    pub fn update(&self, key: &CollectionKey, f: impl FnOnce(&mut Vec<T>)) -> Option<Arc<Vec<T>>> {
        let rendered = key.to_string();
        let updated = {
            let mut entry = self.entries.get_mut(&rendered)?;
            let mut items = entry.items.as_ref().clone();
            f(&mut items);
            entry.items = Arc::new(items);
            Arc::clone(&entry.items)
        };
        self.events.inserted(&rendered);
        Some(updated)
    }

    /// Drops the entry for `key`. A load of `key` already in flight will not
    /// store its result.
    pub fn remove(&self, key: &CollectionKey) -> bool {
        let rendered = key.to_string();
        self.loads.invalidate_key(&rendered);
        let removed = self.entries.remove(&rendered).is_some();
        if removed {
            self.events.removed(&rendered);
        }
        removed
    }

    /// Returns the collection for `key`, loading it when needed.
    ///
    /// Follows the same coalescing rules as entity fetches: concurrent cached
    /// fetches share one `load`, forced fetches queue behind it. A failed load
    /// leaves the previous collection, if any, in place. A load overtaken by
    /// `remove`, `clear_parent` or `clear_all` is discarded.
    pub async fn fetch<F, Fut>(&self, key: &CollectionKey, mode: FetchMode, load: F) -> Option<Arc<Vec<T>>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Outcome<Vec<T>>>,
    {
        let rendered = key.to_string();
        let _guard = match mode {
            FetchMode::Cached => {
                if !self.ledger.is_pending(&rendered) {
                    if let Some(hit) = self.get(key) {
                        self.counters.hit();
                        return Some(hit);
                    }
                }
                match self.ledger.begin(&rendered) {
                    Ticket::Follower(pending) => {
                        self.counters.coalesced();
                        pending.settled().await;
                        return self.get(key);
                    }
                    Ticket::Leader(guard) => {
                        if let Some(hit) = self.get(key) {
                            self.counters.hit();
                            return Some(hit);
                        }
                        self.counters.miss();
                        guard
                    }
                }
            }
            FetchMode::Forced => self.ledger.acquire(&rendered).await,
        };

        let token = self.loads.start(&rendered, key.parent_id());
        self.counters.network_fetch();
        match load().await {
            Outcome::Success(items) => {
                let stored = token.commit(|| {
                    trace!(collection = self.name, key = %rendered, "replacing derived collection");
                    self.replace(key, items.unwrap_or_default())
                });
                if stored.is_none() {
                    debug!(collection = self.name, key = %rendered, "entry removed during load, discarding");
                }
                stored.or_else(|| self.get(key))
            }
            failed => {
                warn!(
                    collection = self.name,
                    key = %rendered,
                    message = failed.message().unwrap_or_default(),
                    "derived fetch failed"
                );
                self.get(key)
            }
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot(self.len())
    }
}

impl<T> DerivedCollection for DerivedCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn clear_parent(&self, parent: &str) -> usize {
        self.loads.invalidate_parent(parent);
        let keys: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.parent == parent)
            .map(|entry| entry.key().clone())
            .collect();
        for key in &keys {
            if self.entries.remove(key).is_some() {
                self.events.removed(key);
            }
        }
        keys.len()
    }

    fn clear_all(&self) {
        self.loads.invalidate_all();
        self.entries.clear();
        self.events.cleared();
    }
}
