//! In-flight request ledger: at most one network fetch per key at any instant.
//!
//! # Protocol
//!
//! ```text
//!            begin(key)
//!                │
//!       ┌────────┴─────────┐
//!       │ entry for key?   │  (DashMap shard lock held only here)
//!       └────────┬─────────┘
//!          no    │    yes
//!     ┌──────────┴──────────┐
//!     ▼                     ▼
//!  Leader(FetchGuard)    Follower(PendingFetch)
//!  performs the fetch,   awaits settled(), then
//!  writes the cache,     reads the cache (or, when
//!  drops the guard       forced, calls begin again)
//!     │
//!     ▼
//!  Drop: remove entry, then publish settled = true
//! ```
//!
//! The entry is removed before followers are woken, so a follower that retries
//! `begin` either becomes the next leader or follows a newer fetch. It never
//! races the one that just finished.

use ahash::RandomState;
use dashmap::{mapref::entry::Entry, DashMap};
use parking_lot::Mutex;
use std::{collections::HashMap, sync::Arc};
use tokio::{sync::watch, time::Instant};

/// Tracks one in-flight fetch and wakes everyone waiting on it when it settles.
pub struct InflightFetch {
    settled: watch::Sender<bool>,
    pub started_at: Instant,
}

impl InflightFetch {
    fn new() -> Self {
        let (settled, _) = watch::channel(false);
        Self { settled, started_at: Instant::now() }
    }
}

/// Result of [`InflightLedger::begin`].
pub enum Ticket {
    /// No fetch was pending; the caller owns the key until the guard drops.
    Leader(FetchGuard),
    /// Another caller's fetch is pending.
    Follower(PendingFetch),
}

/// Handle for awaiting another caller's fetch.
pub struct PendingFetch {
    settled: watch::Receiver<bool>,
}

impl PendingFetch {
    /// Resolves once the pending fetch has settled, successfully or not.
    pub async fn settled(mut self) {
        // A closed channel means the leader is gone, which is also settled.
        let _ = self.settled.wait_for(|settled| *settled).await;
    }
}

/// RAII guard for a leader's fetch. Dropping it clears the ledger entry and wakes
/// followers, on success, failure, and cancellation alike.
pub struct FetchGuard {
    ledger: InflightLedger,
    key: String,
    fetch: Arc<InflightFetch>,
}

impl FetchGuard {
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for FetchGuard {
    fn drop(&mut self) {
        self.ledger.inflight.remove_if(&self.key, |_, fetch| Arc::ptr_eq(fetch, &self.fetch));
        self.fetch.settled.send_replace(true);
        tracing::trace!(
            key = %self.key,
            elapsed_ms = u64::try_from(self.fetch.started_at.elapsed().as_millis()).unwrap_or(u64::MAX),
            "fetch settled"
        );
    }
}

/// Map from key to the fetch currently in flight for it.
///
/// Cloning is O(1); clones share the same entries.
#[derive(Clone, Default)]
pub struct InflightLedger {
    inflight: Arc<DashMap<String, Arc<InflightFetch>, RandomState>>,
}

impl InflightLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fetch for `key`, or joins the one already pending.
    ///
    /// The check and the registration happen under one shard lock, so two callers
    /// can never both become leader for the same key. No lock is held on return.
    #[must_use]
    pub fn begin(&self, key: &str) -> Ticket {
        match self.inflight.entry(key.to_string()) {
            Entry::Occupied(entry) => {
                Ticket::Follower(PendingFetch { settled: entry.get().settled.subscribe() })
            }
            Entry::Vacant(entry) => {
                let fetch = Arc::new(InflightFetch::new());
                entry.insert(Arc::clone(&fetch));
                Ticket::Leader(FetchGuard { ledger: self.clone(), key: key.to_string(), fetch })
            }
        }
    }

    /// Returns a handle on the fetch pending for `key`, if any.
    #[must_use]
    pub fn pending(&self, key: &str) -> Option<PendingFetch> {
        self.inflight
            .get(key)
            .map(|fetch| PendingFetch { settled: fetch.settled.subscribe() })
    }

    /// Waits for `key` to have no fetch in flight and claims it.
    pub async fn acquire(&self, key: &str) -> FetchGuard {
        loop {
            match self.begin(key) {
                Ticket::Leader(guard) => return guard,
                Ticket::Follower(pending) => pending.settled().await,
            }
        }
    }

    #[must_use]
    pub fn is_pending(&self, key: &str) -> bool {
        self.inflight.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inflight.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inflight.is_empty()
    }
}

struct LoadMark {
    parent: String,
    invalidated: bool,
}

/// Loads currently running for a cache, and whether each has been overtaken by a
/// removal.
///
/// A mark exists only between [`LoadTracker::start`] and the end of the load, so
/// the map never outgrows the number of fetches in flight.
#[derive(Default)]
pub struct LoadTracker {
    loads: Mutex<HashMap<String, LoadMark>>,
}

impl LoadTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a load of `key` as started. Call while holding the key's [`FetchGuard`].
    #[must_use]
    pub fn start(&self, key: &str, parent: &str) -> LoadToken<'_> {
        self.loads
            .lock()
            .insert(key.to_string(), LoadMark { parent: parent.to_string(), invalidated: false });
        LoadToken { tracker: self, key: key.to_string() }
    }

    /// Invalidates the load of `key`, if one is running.
    pub fn invalidate_key(&self, key: &str) {
        if let Some(mark) = self.loads.lock().get_mut(key) {
            mark.invalidated = true;
        }
    }

    /// Invalidates every running load whose key belongs to `parent`.
    pub fn invalidate_parent(&self, parent: &str) {
        for mark in self.loads.lock().values_mut().filter(|mark| mark.parent == parent) {
            mark.invalidated = true;
        }
    }

    pub fn invalidate_all(&self) {
        for mark in self.loads.lock().values_mut() {
            mark.invalidated = true;
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.loads.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.loads.lock().is_empty()
    }
}

/// One running load. Dropping it without committing discards the mark.
pub struct LoadToken<'a> {
    tracker: &'a LoadTracker,
    key: String,
}

impl LoadToken<'_> {
    /// Runs `write` unless the load was invalidated since it started.
    ///
    /// The check and `write` happen under the tracker lock, so an invalidation
    /// either lands first and suppresses the write, or lands after it and the
    /// caller's removal sees the written value.
    pub fn commit<R>(self, write: impl FnOnce() -> R) -> Option<R> {
        let mut loads = self.tracker.loads.lock();
        let invalidated = loads.remove(&self.key).map_or(true, |mark| mark.invalidated);
        if invalidated {
            None
        } else {
            Some(write())
        }
    }
}

impl Drop for LoadToken<'_> {
    fn drop(&mut self) {
        self.tracker.loads.lock().remove(&self.key);
    }
}
