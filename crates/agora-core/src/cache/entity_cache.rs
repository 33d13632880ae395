//! Bounded id→record cache for one entity kind.
//!
//! # Fetch protocol
//!
//! A cached fetch returns the stored record unless a fetch for the same id is in
//! flight, in which case it waits for that fetch and reads whatever it stored. A
//! forced fetch always issues its own request, but only after any in-flight fetch
//! for the id has settled, so the last request started is the last one written.
//!
//! Failed fetches never touch the stored record: a stale value stays readable.
//!
//! # Eviction
//!
//! Capacity is enforced before each new key is inserted. Under
//! [`EvictionPolicy::Fifo`] the oldest insertion leaves first and neither reads nor
//! overwrites move an entry; under [`EvictionPolicy::Lru`] both do.

use crate::{
    api::{fetch_all, json_body, Failure, ListQuery, Outcome, RequestExecutor, RequestOptions},
    cache::{
        derived::DerivedCollection,
        events::{CacheCounters, CacheEvent, CacheScope, CacheStats, EventPublisher},
        ledger::{FetchGuard, InflightLedger, Ticket},
        EvictionPolicy, FetchMode,
    },
    session::TokenProvider,
    types::{Entity, EntityKind},
};
use lru::LruCache;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

pub struct EntityCache<T: Entity> {
    // Unbounded; capacity is enforced by `evict_oldest_if_needed` so the
    // eviction is observable.
    entries: Mutex<LruCache<String, Arc<T>>>,
    capacity: usize,
    policy: EvictionPolicy,
    ledger: InflightLedger,
    executor: Arc<RequestExecutor>,
    session: Arc<dyn TokenProvider>,
    dependents: RwLock<Vec<Arc<dyn DerivedCollection>>>,
    events: EventPublisher,
    counters: CacheCounters,
}

impl<T: Entity> EntityCache<T> {
    #[must_use]
    pub fn new(
        executor: Arc<RequestExecutor>,
        session: Arc<dyn TokenProvider>,
        capacity: usize,
        policy: EvictionPolicy,
    ) -> Self {
        Self {
            entries: Mutex::new(LruCache::unbounded()),
            capacity: capacity.max(1),
            policy,
            ledger: InflightLedger::new(),
            executor,
            session,
            dependents: RwLock::new(Vec::new()),
            events: EventPublisher::new(CacheScope::Entity(T::KIND)),
            counters: CacheCounters::default(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> EntityKind {
        T::KIND
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Cached ids, next to be evicted first.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.entries.lock().iter().rev().map(|(key, _)| key.clone()).collect()
    }

    /// Returns the stored record without touching the network.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<T>> {
        let mut entries = self.entries.lock();
        match self.policy {
            EvictionPolicy::Fifo => entries.peek(id).cloned(),
            EvictionPolicy::Lru => entries.get(id).cloned(),
        }
    }

    #[must_use]
    pub fn has(&self, id: &str) -> bool {
        self.entries.lock().contains(id)
    }

    /// Stores a record under its own id, replacing any previous value.
    pub fn set(&self, entity: T) -> Arc<T> {
        self.store(Arc::new(entity))
    }

    /// Seeds the cache from a list response, applying eviction per record.
    pub fn set_many<I>(&self, entities: I) -> Vec<Arc<T>>
    where
        I: IntoIterator<Item = T>,
    {
        entities.into_iter().map(|entity| self.set(entity)).collect()
    }

    /// Replaces a stored record in place with `f` applied to a copy of it.
    ///
    /// Returns the new value, or `None` when `id` is not cached.
    pub fn modify(&self, id: &str, f: impl FnOnce(&mut T)) -> Option<Arc<T>> {
        let updated = {
            let mut entries = self.entries.lock();
            let slot = entries.peek_mut(id)?;
            let mut next = (**slot).clone();
            f(&mut next);
            *slot = Arc::new(next);
            Arc::clone(slot)
        };
        self.events.inserted(id);
        Some(updated)
    }

    fn store(&self, value: Arc<T>) -> Arc<T> {
        let key = value.id().to_string();
        let evicted = {
            let mut entries = self.entries.lock();
            if let Some(slot) = entries.peek_mut(&key) {
                *slot = Arc::clone(&value);
                if self.policy == EvictionPolicy::Lru {
                    entries.promote(&key);
                }
                None
            } else {
                let evicted = Self::evict_locked(&mut entries, self.capacity);
                entries.put(key.clone(), Arc::clone(&value));
                evicted
            }
        };

        if let Some(evicted) = evicted {
            self.record_eviction(&evicted);
        }
        trace!(kind = %T::KIND, id = %key, "cached entity");
        self.events.inserted(&key);
        value
    }

    fn evict_locked(entries: &mut LruCache<String, Arc<T>>, capacity: usize) -> Option<String> {
        if entries.len() >= capacity {
            entries.pop_lru().map(|(key, _)| key)
        } else {
            None
        }
    }

    fn record_eviction(&self, key: &str) {
        self.counters.eviction();
        debug!(kind = %T::KIND, id = %key, capacity = self.capacity, "evicted entity");
        self.events.evicted(key);
    }

    /// Frees one slot if the cache is at capacity. Returns the evicted id.
    pub fn evict_oldest_if_needed(&self) -> Option<String> {
        let evicted = Self::evict_locked(&mut self.entries.lock(), self.capacity);
        if let Some(key) = &evicted {
            self.record_eviction(key);
        }
        evicted
    }

    /// Removes one record and every derived entry keyed by it, or everything.
    pub fn clear(&self, id: Option<&str>) {
        let dependents = self.dependents.read().clone();
        match id {
            Some(id) => {
                if self.entries.lock().pop(id).is_some() {
                    self.events.removed(id);
                }
                for dependent in &dependents {
                    let removed = dependent.clear_parent(id);
                    if removed > 0 {
                        trace!(kind = %T::KIND, id, collection = dependent.name(), removed, "cleared derived entries");
                    }
                }
            }
            None => {
                self.entries.lock().clear();
                self.events.cleared();
                for dependent in &dependents {
                    dependent.clear_all();
                }
                debug!(kind = %T::KIND, "cleared entity cache");
            }
        }
    }

    /// Makes `collection` follow this cache's `clear` calls.
    pub fn register_dependent(&self, collection: Arc<dyn DerivedCollection>) {
        self.dependents.write().push(collection);
    }

    /// Returns the record for `id`, fetching it when needed.
    ///
    /// Never fails: an empty id, a failed request or an unusable response all
    /// resolve to whatever the cache holds afterwards, which may be `None`.
    pub async fn fetch(&self, id: &str, mode: FetchMode) -> Option<Arc<T>> {
        if id.is_empty() {
            return None;
        }

        let guard = match mode {
            FetchMode::Cached => {
                if !self.ledger.is_pending(id) {
                    if let Some(hit) = self.get(id) {
                        self.counters.hit();
                        trace!(kind = %T::KIND, id, "cache hit");
                        return Some(hit);
                    }
                }

                match self.ledger.begin(id) {
                    Ticket::Follower(pending) => {
                        self.counters.coalesced();
                        trace!(kind = %T::KIND, id, "joining in-flight fetch");
                        pending.settled().await;
                        return self.get(id);
                    }
                    Ticket::Leader(guard) => {
                        // A fetch may have settled between the check above and `begin`.
                        if let Some(hit) = self.get(id) {
                            self.counters.hit();
                            return Some(hit);
                        }
                        self.counters.miss();
                        guard
                    }
                }
            }
            FetchMode::Forced => {
                if self.ledger.is_pending(id) {
                    self.counters.coalesced();
                    trace!(kind = %T::KIND, id, "forced fetch queued behind in-flight fetch");
                }
                self.ledger.acquire(id).await
            }
        };

        self.load(id, guard).await
    }

    async fn load(&self, id: &str, _guard: FetchGuard) -> Option<Arc<T>> {
        self.counters.network_fetch();
        let url = self.executor.api_url(&["v2", T::KIND.resource(), id]);
        let token = self.session.token();

        match self.executor.execute::<T>(None, &url, token.as_deref(), RequestOptions::get()).await {
            Outcome::Success(Some(entity)) => Some(self.store(Arc::new(entity))),
            Outcome::Success(None) => self.get(id),
            failed => {
                warn!(
                    kind = %T::KIND,
                    id,
                    message = failed.message().unwrap_or_default(),
                    "fetch failed, keeping cached value"
                );
                self.get(id)
            }
        }
    }

    /// Walks the list endpoint and seeds the cache with every record returned.
    pub async fn list(&self, query: &ListQuery) -> Outcome<Vec<Arc<T>>> {
        let token = self.session.token();
        fetch_all::<T>(&self.executor, None, &["v2", T::KIND.resource()], token.as_deref(), query)
            .await
            .map(|items| self.set_many(items))
    }

    /// Fetches `count` random records and seeds the cache with them.
    pub async fn random(&self, count: usize) -> Outcome<Vec<Arc<T>>> {
        let url = self
            .executor
            .api_url_with_query(&["v2", T::KIND.resource(), "random"], &[("count", count.to_string())]);
        let token = self.session.token();
        self.executor
            .execute::<Vec<T>>(None, &url, token.as_deref(), RequestOptions::get())
            .await
            .map(|items| self.set_many(items))
    }

    /// Creates a record and caches the server's copy.
    pub async fn create<B>(&self, body: &B) -> Outcome<Arc<T>>
    where
        B: Serialize + ?Sized,
    {
        let body = match json_body(body) {
            Ok(body) => body,
            Err(failure) => return failure.into(),
        };
        let url = self.executor.api_url(&["v2", T::KIND.resource()]);
        let token = self.session.token();
        self.write(&url, token.as_deref(), RequestOptions::post(Some(body))).await
    }

    /// Patches a record and replaces the cached value with the server's copy.
    ///
    /// Waits for any in-flight fetch of `id` first so a slower read cannot
    /// overwrite the update.
    pub async fn update<B>(&self, id: &str, patch: &B) -> Outcome<Arc<T>>
    where
        B: Serialize + ?Sized,
    {
        if id.is_empty() {
            return Failure::missing_id(T::KIND.as_str()).into();
        }
        let body = match json_body(patch) {
            Ok(body) => body,
            Err(failure) => return failure.into(),
        };
        let _guard = self.ledger.acquire(id).await;
        let url = self.executor.api_url(&["v2", T::KIND.resource(), id]);
        let token = self.session.token();
        self.write(&url, token.as_deref(), RequestOptions::patch(Some(body))).await
    }

    /// Deletes a record, then drops it and its derived entries from the cache.
    pub async fn delete(&self, id: &str) -> Outcome<()> {
        if id.is_empty() {
            return Failure::missing_id(T::KIND.as_str()).into();
        }
        let _guard = self.ledger.acquire(id).await;
        let url = self.executor.api_url(&["v2", T::KIND.resource(), id]);
        let token = self.session.token();
        let outcome = self
            .executor
            .execute::<serde_json::Value>(None, &url, token.as_deref(), RequestOptions::delete())
            .await;

        if outcome.is_success() {
            self.clear(Some(id));
        }
        outcome.discard()
    }

    async fn write(&self, url: &str, token: Option<&str>, options: RequestOptions) -> Outcome<Arc<T>> {
        self.executor.execute::<T>(None, url, token, options).await.map(|entity| self.set(entity))
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot(self.len())
    }

    #[must_use]
    pub fn ledger(&self) -> &InflightLedger {
        &self.ledger
    }

    pub(crate) fn executor(&self) -> &Arc<RequestExecutor> {
        &self.executor
    }

    pub(crate) fn session(&self) -> &Arc<dyn TokenProvider> {
        &self.session
    }
}
