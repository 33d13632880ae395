//! Friend lists and circles, derived per user.

use crate::{
    api::{fetch_all, Failure, ListQuery, Outcome, RequestOptions},
    cache::{CollectionKey, DerivedCache, FetchMode},
    stores::user::UserStore,
    types::User,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

pub struct FriendsStore {
    users: Arc<UserStore>,
    friends: Arc<DerivedCache<User>>,
    circle: Arc<DerivedCache<User>>,
}

impl FriendsStore {
    #[must_use]
    pub fn new(users: Arc<UserStore>) -> Self {
        let friends = Arc::new(DerivedCache::new("friends"));
        let circle = Arc::new(DerivedCache::new("circle"));
        users.cache().register_dependent(friends.clone());
        users.cache().register_dependent(circle.clone());
        Self { users, friends, circle }
    }

    #[must_use]
    pub fn cached_friends(&self, user_id: &str) -> Option<Arc<Vec<User>>> {
        self.friends.get(&CollectionKey::parent(user_id))
    }

    #[must_use]
    pub fn cached_circle(&self, user_id: &str) -> Option<Arc<Vec<User>>> {
        self.circle.get(&CollectionKey::parent(user_id))
    }

    pub async fn friends(&self, user_id: &str, mode: FetchMode) -> Option<Arc<Vec<User>>> {
        self.load(&self.friends, user_id, "friends", mode).await
    }

    /// The user's close circle, a subset of their friends.
    pub async fn circle(&self, user_id: &str, mode: FetchMode) -> Option<Arc<Vec<User>>> {
        self.load(&self.circle, user_id, "circle", mode).await
    }

    async fn load(
        &self,
        collection: &DerivedCache<User>,
        user_id: &str,
        segment: &str,
        mode: FetchMode,
    ) -> Option<Arc<Vec<User>>> {
        if user_id.is_empty() {
            return None;
        }
        let users = self.users.cache();
        let token = users.session().token();
        let token = token.as_deref();
        let segments = ["v2", "users", user_id, segment];
        let segments = &segments;
        let query = &ListQuery::all();
        collection
            .fetch(&CollectionKey::parent(user_id), mode, move || async move {
                // Seed the user cache so profile reads hit it.
                fetch_all::<User>(users.executor(), None, segments, token, query)
                    .await
                    .map(|list| {
                        users.set_many(list.iter().cloned());
                        list
                    })
            })
            .await
    }

    pub async fn add_friend(&self, friend_id: &str) -> Outcome<()> {
        self.change_friendship(friend_id, RequestOptions::put(None)).await
    }

    pub async fn remove_friend(&self, friend_id: &str) -> Outcome<()> {
        self.change_friendship(friend_id, RequestOptions::delete()).await
    }

    async fn change_friendship(&self, friend_id: &str, options: RequestOptions) -> Outcome<()> {
        if friend_id.is_empty() {
            return Failure::missing_id("friend").into();
        }
        let users = self.users.cache();
        let url = users.executor().api_url(&["v2", "users", "current", "friends", friend_id]);
        let token = users.session().token();
        let outcome =
            users.executor().execute::<Value>(None, &url, token.as_deref(), options).await.discard();
        if !outcome.is_success() {
            return outcome;
        }

        if let Some(me) = self.users.current_id() {
            self.friends.remove(&CollectionKey::parent(me.as_str()));
            self.circle.remove(&CollectionKey::parent(me.as_str()));
        }
        self.friends.remove(&CollectionKey::parent(friend_id));
        debug!(friend_id, "friendship changed, dropped cached lists");
        outcome
    }
}
