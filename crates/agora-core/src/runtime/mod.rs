//! Wiring for a client session.
//!
//! [`AgoraContextBuilder`] validates an [`AppConfig`], creates the shared
//! [`RequestExecutor`] and [`SessionStore`], and builds one store per entity kind
//! with its derived collections registered. The resulting [`AgoraContext`] is cheap
//! to clone and can be handed to every task that needs cached data.

pub mod builder;

pub use builder::{AgoraContextBuilder, RuntimeError};

use crate::{
    api::RequestExecutor,
    cache::BlobRegistry,
    config::AppConfig,
    session::{SessionStore, TokenProvider},
    stores::{
        ActivityStore, ArticleStore, AvatarStore, CloudClient, EventStore, FriendsStore,
        NotificationStore, PromptStore, UserStore,
    },
};
use std::sync::Arc;
use tracing::info;

/// Every store of one client session, sharing an executor and a token.
#[derive(Clone)]
pub struct AgoraContext {
    pub(crate) config: AppConfig,
    pub(crate) executor: Arc<RequestExecutor>,
    pub(crate) session: Arc<SessionStore>,
    pub(crate) registry: Arc<BlobRegistry>,
    pub(crate) activities: Arc<ActivityStore>,
    pub(crate) articles: Arc<ArticleStore>,
    pub(crate) prompts: Arc<PromptStore>,
    pub(crate) events: Arc<EventStore>,
    pub(crate) users: Arc<UserStore>,
    pub(crate) friends: Arc<FriendsStore>,
    pub(crate) notifications: Arc<NotificationStore>,
    pub(crate) avatars: Arc<AvatarStore>,
    pub(crate) cloud: Arc<CloudClient>,
}

impl AgoraContext {
    #[must_use]
    pub fn builder() -> AgoraContextBuilder {
        AgoraContextBuilder::new()
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn executor(&self) -> &Arc<RequestExecutor> {
        &self.executor
    }

    #[must_use]
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    #[must_use]
    pub fn blob_registry(&self) -> &Arc<BlobRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn activities(&self) -> &Arc<ActivityStore> {
        &self.activities
    }

    #[must_use]
    pub fn articles(&self) -> &Arc<ArticleStore> {
        &self.articles
    }

    #[must_use]
    pub fn prompts(&self) -> &Arc<PromptStore> {
        &self.prompts
    }

    #[must_use]
    pub fn events(&self) -> &Arc<EventStore> {
        &self.events
    }

    #[must_use]
    pub fn users(&self) -> &Arc<UserStore> {
        &self.users
    }

    #[must_use]
    pub fn friends(&self) -> &Arc<FriendsStore> {
        &self.friends
    }

    #[must_use]
    pub fn notifications(&self) -> &Arc<NotificationStore> {
        &self.notifications
    }

    #[must_use]
    pub fn avatars(&self) -> &Arc<AvatarStore> {
        &self.avatars
    }

    #[must_use]
    pub fn cloud(&self) -> &Arc<CloudClient> {
        &self.cloud
    }

    /// Empties every cache and revokes every object URL.
    pub fn clear_all(&self) {
        self.activities.clear(None);
        self.articles.clear(None);
        self.prompts.clear(None);
        self.events.clear(None);
        self.notifications.cache().clear(None);
        self.users.cache().clear(None);
        self.avatars.clear_all();
        self.cloud.clear();
    }

    /// Drops the session token and everything cached on behalf of it.
    pub fn sign_out(&self) {
        self.session.set_token(None);
        self.users.forget_current();
        self.clear_all();
        info!(live_object_urls = self.registry.live_count(), "Signed out");
    }
}
