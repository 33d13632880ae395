//! Change notifications and counters shared by every cache.

use crate::types::EntityKind;
use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};
use tokio::sync::broadcast;

/// Buffered notifications per cache before slow subscribers start lagging.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Which cache emitted an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheScope {
    Entity(EntityKind),
    Collection(&'static str),
}

impl fmt::Display for CacheScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity(kind) => write!(f, "{kind}"),
            Self::Collection(name) => f.write_str(name),
        }
    }
}

/// Emitted after the cache has changed, for UI bindings to re-render from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    Inserted { scope: CacheScope, key: String },
    Evicted { scope: CacheScope, key: String },
    Removed { scope: CacheScope, key: String },
    Cleared { scope: CacheScope },
}

impl CacheEvent {
    #[must_use]
    pub fn scope(&self) -> CacheScope {
        match self {
            Self::Inserted { scope, .. } |
            Self::Evicted { scope, .. } |
            Self::Removed { scope, .. } |
            Self::Cleared { scope } => *scope,
        }
    }

    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Inserted { key, .. } | Self::Evicted { key, .. } | Self::Removed { key, .. } => {
                Some(key)
            }
            Self::Cleared { .. } => None,
        }
    }
}

/// Broadcast publisher for one cache.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    scope: CacheScope,
    sender: broadcast::Sender<CacheEvent>,
}

impl EventPublisher {
    #[must_use]
    pub fn new(scope: CacheScope) -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { scope, sender }
    }

    #[must_use]
    pub fn scope(&self) -> CacheScope {
        self.scope
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.sender.subscribe()
    }

    // Sending with no subscribers is not an error for a cache.
    pub(crate) fn inserted(&self, key: &str) {
        let _ = self.sender.send(CacheEvent::Inserted { scope: self.scope, key: key.to_string() });
    }

    pub(crate) fn evicted(&self, key: &str) {
        let _ = self.sender.send(CacheEvent::Evicted { scope: self.scope, key: key.to_string() });
    }

    pub(crate) fn removed(&self, key: &str) {
        let _ = self.sender.send(CacheEvent::Removed { scope: self.scope, key: key.to_string() });
    }

    pub(crate) fn cleared(&self) {
        let _ = self.sender.send(CacheEvent::Cleared { scope: self.scope });
    }
}

/// Point-in-time snapshot of a cache's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    /// Network requests actually issued by fetches.
    pub network_fetches: u64,
    /// Fetches that waited on another caller's request instead of issuing their own.
    pub coalesced: u64,
    pub evictions: u64,
}

#[derive(Debug, Default)]
pub(crate) struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    network_fetches: AtomicU64,
    coalesced: AtomicU64,
    evictions: AtomicU64,
}

impl CacheCounters {
    pub(crate) fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn network_fetch(&self) {
        self.network_fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn coalesced(&self) {
        self.coalesced.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, entries: usize) -> CacheStats {
        CacheStats {
            entries,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            network_fetches: self.network_fetches.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}
