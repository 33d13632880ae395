//! Downloaded images exposed as revocable object URLs.
//!
//! Every URL minted by [`BlobRegistry::create`] holds its bytes until
//! [`BlobRegistry::revoke`]. A [`BlobCache`] owns the URLs of its entries and
//! revokes them when an entry is replaced or cleared. A download that finishes
//! for an entry cleared while it was in flight mints nothing.

use crate::{
    api::{Blob, Outcome, RequestExecutor},
    cache::{
        derived::DerivedCollection,
        events::{CacheCounters, CacheEvent, CacheScope, CacheStats, EventPublisher},
        ledger::{InflightLedger, LoadTracker, Ticket},
        FetchMode,
    },
};
use ahash::RandomState;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    future::Future,
    sync::Arc,
};
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};
use uuid::Uuid;

const OBJECT_URL_PREFIX: &str = "blob:agora/";

/// Handle to bytes held by a [`BlobRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectUrl(String);

impl ObjectUrl {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Process-wide table of live object URLs.
#[derive(Default)]
pub struct BlobRegistry {
    live: DashMap<ObjectUrl, Blob, RandomState>,
}

impl BlobRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, blob: Blob) -> ObjectUrl {
        let url = ObjectUrl(format!("{OBJECT_URL_PREFIX}{}", Uuid::new_v4()));
        self.live.insert(url.clone(), blob);
        url
    }

    #[must_use]
    pub fn resolve(&self, url: &ObjectUrl) -> Option<Blob> {
        self.live.get(url).map(|blob| blob.value().clone())
    }

    /// Frees the bytes behind `url`. Returns `false` if it was already revoked.
    pub fn revoke(&self, url: &ObjectUrl) -> bool {
        self.live.remove(url).is_some()
    }

    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

/// Object URLs for one cached image, by requested pixel size.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlobSet {
    urls: BTreeMap<u32, ObjectUrl>,
}

impl BlobSet {
    #[must_use]
    pub fn url(&self, size: u32) -> Option<&ObjectUrl> {
        self.urls.get(&size)
    }

    /// Largest available variant.
    #[must_use]
    pub fn largest(&self) -> Option<&ObjectUrl> {
        self.urls.values().next_back()
    }

    pub fn urls(&self) -> impl Iterator<Item = &ObjectUrl> {
        self.urls.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// Downloads every `(size, url)` variant, failing on the first error.
///
/// Nothing is minted here, so a partial failure leaves nothing to revoke.
pub async fn download_variants(
    executor: &RequestExecutor,
    token: Option<&str>,
    variants: &[(u32, String)],
    expected_content_type: &str,
) -> Outcome<Vec<(u32, Blob)>> {
    let mut blobs = Vec::with_capacity(variants.len());
    for (size, url) in variants {
        match executor.execute_binary(url, token, Some(expected_content_type)).await {
            Outcome::Success(Some(blob)) => blobs.push((*size, blob)),
            failed => return failed.discard(),
        }
    }
    Outcome::Success(Some(blobs))
}

pub struct BlobCache {
    name: &'static str,
    registry: Arc<BlobRegistry>,
    entries: Mutex<HashMap<String, BlobSet>>,
    ledger: InflightLedger,
    loads: LoadTracker,
    events: EventPublisher,
    counters: CacheCounters,
}

impl BlobCache {
    #[must_use]
    pub fn new(name: &'static str, registry: Arc<BlobRegistry>) -> Self {
        Self {
            name,
            registry,
            entries: Mutex::new(HashMap::new()),
            ledger: InflightLedger::new(),
            loads: LoadTracker::new(),
            events: EventPublisher::new(CacheScope::Collection(name)),
            counters: CacheCounters::default(),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<BlobSet> {
        self.entries.lock().get(key).cloned()
    }

    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<BlobRegistry> {
        &self.registry
    }

    /// Mints URLs for `blobs` and stores them under `key`, revoking the URLs of
    /// the entry they replace.
    pub fn store(&self, key: &str, blobs: Vec<(u32, Blob)>) -> BlobSet {
        let set = self.mint(blobs);
        let previous = self.entries.lock().insert(key.to_string(), set.clone());
        if let Some(previous) = previous {
            self.revoke_set(&previous);
        }
        self.events.inserted(key);
        set
    }

    fn mint(&self, blobs: Vec<(u32, Blob)>) -> BlobSet {
        BlobSet {
            urls: blobs.into_iter().map(|(size, blob)| (size, self.registry.create(blob))).collect(),
        }
    }

    fn revoke_set(&self, set: &BlobSet) {
        for url in set.urls() {
            self.registry.revoke(url);
        }
        trace!(collection = self.name, revoked = set.len(), "revoked object urls");
    }

    /// Drops the entry for `key` and revokes its URLs.
    pub fn clear(&self, key: &str) -> bool {
        self.loads.invalidate_key(key);
        let removed = self.entries.lock().remove(key);
        match removed {
            Some(set) => {
                self.revoke_set(&set);
                self.events.removed(key);
                true
            }
            None => false,
        }
    }

    /// Returns the URLs for `key`, downloading when needed.
    ///
    /// `load` must not mint URLs itself; the cache mints them only once it knows
    /// the entry is still wanted.
    pub async fn fetch<F, Fut>(&self, key: &str, mode: FetchMode, load: F) -> Option<BlobSet>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Outcome<Vec<(u32, Blob)>>>,
    {
        if key.is_empty() {
            return None;
        }

        let _guard = match mode {
            FetchMode::Cached => {
                if !self.ledger.is_pending(key) {
                    if let Some(hit) = self.get(key) {
                        self.counters.hit();
                        return Some(hit);
                    }
                }
                match self.ledger.begin(key) {
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
            FetchMode::Forced => self.ledger.acquire(key).await,
        };

        let token = self.loads.start(key, key);
        self.counters.network_fetch();
        let blobs = match load().await {
            Outcome::Success(blobs) => blobs.unwrap_or_default(),
            failed => {
                warn!(
                    collection = self.name,
                    key,
                    message = failed.message().unwrap_or_default(),
                    "blob download failed"
                );
                return self.get(key);
            }
        };

        let stored = token.commit(|| {
            let set = self.mint(blobs);
            let replaced = self.entries.lock().insert(key.to_string(), set.clone());
            (set, replaced)
        });

        match stored {
            None => {
                debug!(collection = self.name, key, "entry cleared during download, discarding");
                self.get(key)
            }
            Some((set, replaced)) => {
                if let Some(replaced) = replaced {
                    self.revoke_set(&replaced);
                }
                self.events.inserted(key);
                Some(set)
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

impl DerivedCollection for BlobCache {
    fn name(&self) -> &'static str {
        self.name
    }

    fn clear_parent(&self, parent: &str) -> usize {
        usize::from(self.clear(parent))
    }

    fn clear_all(&self) {
        self.loads.invalidate_all();
        let drained: Vec<BlobSet> = self.entries.lock().drain().map(|(_, set)| set).collect();
        for set in &drained {
            self.revoke_set(set);
        }
        self.events.cleared();
    }
}
