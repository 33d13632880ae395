//! In-memory caches for server-owned records.
//!
//! # Architecture
//!
//! - **Entity caches** (`entity_cache`): one bounded id→record map per entity kind
//! - **In-flight ledger** (`ledger`): coalesces concurrent fetches of the same key
//! - **Derived collections** (`derived`): lists keyed by a parent id (attendees,
//!   friends, notifications, submissions)
//! - **Blob caches** (`blob`): downloaded images exposed as revocable object URLs
//! - **Events** (`events`): change notifications and counters shared by all of them
//!
//! Every cache reads and writes through the same [`RequestExecutor`](crate::api::RequestExecutor)
//! and reports changes on its own broadcast channel.

pub mod blob;
pub mod derived;
pub mod entity_cache;
pub mod events;
pub mod ledger;

pub use blob::{BlobCache, BlobRegistry, BlobSet, ObjectUrl};
pub use derived::{CollectionKey, DerivedCache, DerivedCollection};
pub use entity_cache::EntityCache;
pub use events::{CacheEvent, CacheScope, CacheStats, EVENT_CHANNEL_CAPACITY};
pub use ledger::{FetchGuard, InflightLedger, LoadToken, LoadTracker, PendingFetch, Ticket};

use serde::{Deserialize, Serialize};

/// Which entry leaves a full cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    /// Oldest insertion first. Reads never refresh an entry's position.
    #[default]
    Fifo,
    /// Least recently read or written first.
    Lru,
}

/// Whether a fetch may be answered from the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchMode {
    /// Serve a cached value when present; otherwise join or start a fetch.
    #[default]
    Cached,
    /// Always hit the network, queued behind any fetch already in flight.
    Forced,
}

impl FetchMode {
    #[must_use]
    pub fn from_force(force: bool) -> Self {
        if force {
            Self::Forced
        } else {
            Self::Cached
        }
    }
}
