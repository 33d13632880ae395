//! Users and the signed-in user.

use crate::{
    api::{json_body, FailureKind, Outcome, RequestOptions},
    cache::{EntityCache, FetchMode, InflightLedger, Ticket},
    types::User,
};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

const CURRENT: &str = "current";

pub struct UserStore {
    users: Arc<EntityCache<User>>,
    current_id: RwLock<Option<String>>,
    // Separate from the entity ledger: "current" is not a user id.
    current_fetch: InflightLedger,
}

impl UserStore {
    #[must_use]
    pub fn new(users: Arc<EntityCache<User>>) -> Self {
        Self { users, current_id: RwLock::new(None), current_fetch: InflightLedger::new() }
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<EntityCache<User>> {
        &self.users
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<User>> {
        self.users.get(id)
    }

    pub async fn fetch(&self, id: &str, mode: FetchMode) -> Option<Arc<User>> {
        self.users.fetch(id, mode).await
    }

    /// Id of the signed-in user, once [`current`](Self::current) has resolved it.
    #[must_use]
    pub fn current_id(&self) -> Option<String> {
        self.current_id.read().clone()
    }

    /// The signed-in user, cached under their own id.
    ///
    /// Without a session token this resolves to `None` without a request. A 401
    /// clears the token so later calls stop sending it.
    pub async fn current(&self, mode: FetchMode) -> Option<Arc<User>> {
        self.users.session().token()?;

        let cached = || self.current_id().and_then(|id| self.users.get(&id));
        let _guard = match mode {
            FetchMode::Cached => {
                if !self.current_fetch.is_pending(CURRENT) {
                    if let Some(user) = cached() {
                        return Some(user);
                    }
                }
                match self.current_fetch.begin(CURRENT) {
                    Ticket::Follower(pending) => {
                        pending.settled().await;
                        return cached();
                    }
                    Ticket::Leader(guard) => guard,
                }
            }
            FetchMode::Forced => self.current_fetch.acquire(CURRENT).await,
        };

        let executor = self.users.executor();
        let url = executor.api_url(&["v2", "users", CURRENT]);
        let token = self.users.session().token();
        match executor.execute::<User>(None, &url, token.as_deref(), RequestOptions::get()).await {
            Outcome::Success(Some(user)) => {
                *self.current_id.write() = Some(user.id.clone());
                Some(self.users.set(user))
            }
            Outcome::HardError(failure) if failure.kind == FailureKind::Unauthorized => {
                info!("session rejected, clearing token");
                self.users.session().set_token(None);
                self.forget_current();
                None
            }
            failed => {
                warn!(message = failed.message().unwrap_or_default(), "current user fetch failed");
                cached()
            }
        }
    }

    /// Patches the signed-in user and caches the server's copy.
    pub async fn update_current<B>(&self, patch: &B) -> Outcome<Arc<User>>
    where
        B: Serialize + ?Sized,
    {
        let body = match json_body(patch) {
            Ok(body) => body,
            Err(failure) => return failure.into(),
        };
        let _guard = self.current_fetch.acquire(CURRENT).await;
        let executor = self.users.executor();
        let url = executor.api_url(&["v2", "users", CURRENT]);
        let token = self.users.session().token();
        executor
            .execute::<User>(None, &url, token.as_deref(), RequestOptions::patch(Some(body)))
            .await
            .map(|user| {
                *self.current_id.write() = Some(user.id.clone());
                self.users.set(user)
            })
    }

    /// Forgets which user is signed in. Cached user records stay.
    pub fn forget_current(&self) {
        self.current_id.write().take();
    }
}
