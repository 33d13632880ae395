//! # Agora Core
//!
//! Client-side data layer for the Agora platform: typed access to the REST API,
//! bounded per-kind entity caches, and coalescing of concurrent fetches.
//!
//! - **[`api`]**: the request executor that turns every HTTP exchange into a tagged
//!   [`Outcome`](api::Outcome), plus the reqwest transport and page walking.
//!
//! - **[`cache`]**: entity caches, derived collections, blob caches and the in-flight
//!   ledger that lets concurrent callers share one network request.
//!
//! - **[`stores`]**: per-kind stores (events, users, friends, notifications,
//!   avatars) and the cloud proxy client.
//!
//! - **[`session`]**: the session token and its cookie.
//!
//! - **[`config`]**: file and environment configuration.
//!
//! - **[`runtime`]**: builds an [`AgoraContext`](runtime::AgoraContext) from a config.
//!
//! ## Fetch Flow
//!
//! ```text
//! fetch(id, mode)
//!       │
//!       ▼
//! ┌─────────────┐
//! │ Cache Check │ ─── Hit (Cached mode) ──► Record
//! └──────┬──────┘
//!        │ Miss / Forced
//!        ▼
//! ┌─────────────────┐
//! │ In-flight Ledger│ ─── Follower ──► wait for leader ──► re-read cache
//! └────────┬────────┘
//!          │ Leader
//!          ▼
//! ┌─────────────────┐
//! │ RequestExecutor │ ─── Soft/Hard error ──► cache untouched
//! └────────┬────────┘
//!          │ Success
//!          ▼
//! ┌─────────────────┐
//! │  Cache Insert   │ ─── full? evict oldest
//! └────────┬────────┘
//!          │
//!          ▼
//!   settle followers
//! ```

pub mod api;
pub mod cache;
pub mod config;
pub mod runtime;
pub mod session;
pub mod stores;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use runtime::{AgoraContext, AgoraContextBuilder, RuntimeError};
