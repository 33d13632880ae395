//! The signed-in user's notifications.

use crate::{
    api::{fetch_all, ListQuery, Outcome, RequestOptions},
    cache::{CollectionKey, DerivedCache, EntityCache, FetchMode},
    stores::user::UserStore,
    types::Notification,
};
use serde_json::{json, Value};
use std::sync::Arc;

pub struct NotificationStore {
    users: Arc<UserStore>,
    notifications: Arc<EntityCache<Notification>>,
    inbox: Arc<DerivedCache<Notification>>,
}

impl NotificationStore {
    #[must_use]
    pub fn new(users: Arc<UserStore>, notifications: Arc<EntityCache<Notification>>) -> Self {
        let inbox = Arc::new(DerivedCache::new("notifications"));
        users.cache().register_dependent(inbox.clone());
        Self { users, notifications, inbox }
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<EntityCache<Notification>> {
        &self.notifications
    }

    fn inbox_key(&self) -> Option<CollectionKey> {
        self.users.current_id().map(CollectionKey::parent)
    }

    #[must_use]
    pub fn cached(&self) -> Option<Arc<Vec<Notification>>> {
        self.inbox.get(&self.inbox_key()?)
    }

    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.cached().map_or(0, |items| items.iter().filter(|n| !n.read).count())
    }

    /// Every notification of the signed-in user. `None` when signed out.
    pub async fn list(&self, mode: FetchMode) -> Option<Arc<Vec<Notification>>> {
        let me = self.users.current(FetchMode::Cached).await?;
        let notifications = &self.notifications;
        let token = notifications.session().token();
        let token = token.as_deref();
        let query = &ListQuery::all();
        self.inbox
            .fetch(&CollectionKey::parent(me.id.as_str()), mode, move || async move {
                fetch_all::<Notification>(
                    notifications.executor(),
                    None,
                    &["v2", "users", "current", "notifications"],
                    token,
                    query,
                )
                .await
                .map(|items| {
                    notifications.set_many(items.iter().cloned());
                    items
                })
            })
            .await
    }

    /// Marks one notification read and swaps the server's copy into the inbox.
    pub async fn mark_read(&self, id: &str) -> Outcome<Arc<Notification>> {
        let outcome = self.notifications.update(id, &json!({ "read": true })).await;
        if let (Some(updated), Some(key)) = (outcome.as_data(), self.inbox_key()) {
            self.inbox.update(&key, |items| {
                if let Some(item) = items.iter_mut().find(|n| n.id == updated.id) {
                    *item = (**updated).clone();
                }
            });
        }
        outcome
    }

    pub async fn mark_all_read(&self) -> Outcome<()> {
        let executor = self.notifications.executor();
        let url = executor.api_url(&["v2", "users", "current", "notifications", "read"]);
        let token = self.notifications.session().token();
        let outcome = executor
            .execute::<Value>(None, &url, token.as_deref(), RequestOptions::post(None))
            .await
            .discard();
        if !outcome.is_success() {
            return outcome;
        }

        if let Some(key) = self.inbox_key() {
            self.inbox.update(&key, |items| {
                for item in items.iter_mut() {
                    item.read = true;
                }
            });
        }
        for id in self.notifications.keys() {
            self.notifications.modify(&id, |n| n.read = true);
        }
        outcome
    }

    pub async fn delete(&self, id: &str) -> Outcome<()> {
        let outcome = self.notifications.delete(id).await;
        if outcome.is_success() {
            if let Some(key) = self.inbox_key() {
                self.inbox.update(&key, |items| items.retain(|n| n.id != id));
            }
        }
        outcome
    }
}
