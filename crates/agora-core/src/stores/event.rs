//! Events with their attendees, per-user submissions and thumbnails.

use crate::{
    api::{fetch_all, json_body, Failure, ListQuery, Outcome, RequestExecutor, RequestOptions},
    cache::{
        blob::download_variants, BlobCache, BlobRegistry, BlobSet, CollectionKey, DerivedCache,
        DerivedCollection, EntityCache, EvictionPolicy, FetchMode,
    },
    session::TokenProvider,
    types::{Event, Submission, User},
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Pixel size requested for event thumbnails.
pub const THUMBNAIL_SIZE: u32 = 128;

const THUMBNAIL_CONTENT_TYPE: &str = "image/webp";

pub struct EventStore {
    events: Arc<EntityCache<Event>>,
    attendees: Arc<DerivedCache<User>>,
    submissions: Arc<DerivedCache<Submission>>,
    thumbnails: Arc<BlobCache>,
}

impl EventStore {
    #[must_use]
    pub fn new(
        executor: Arc<RequestExecutor>,
        session: Arc<dyn TokenProvider>,
        registry: Arc<BlobRegistry>,
        capacity: usize,
        policy: EvictionPolicy,
    ) -> Self {
        let events = Arc::new(EntityCache::new(executor, session, capacity, policy));
        let attendees = Arc::new(DerivedCache::new("attendees"));
        let submissions = Arc::new(DerivedCache::new("submissions"));
        let thumbnails = Arc::new(BlobCache::new("thumbnails", registry));

        events.register_dependent(attendees.clone());
        events.register_dependent(submissions.clone());
        events.register_dependent(thumbnails.clone());

        Self { events, attendees, submissions, thumbnails }
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<EntityCache<Event>> {
        &self.events
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<Event>> {
        self.events.get(id)
    }

    pub async fn fetch(&self, id: &str, mode: FetchMode) -> Option<Arc<Event>> {
        self.events.fetch(id, mode).await
    }

    fn token(&self) -> Option<String> {
        self.events.session().token()
    }

    fn executor(&self) -> &RequestExecutor {
        self.events.executor()
    }

    #[must_use]
    pub fn cached_attendees(&self, event_id: &str) -> Option<Arc<Vec<User>>> {
        self.attendees.get(&CollectionKey::parent(event_id))
    }

    /// Users signed up for an event.
    pub async fn attendees(&self, event_id: &str, mode: FetchMode) -> Option<Arc<Vec<User>>> {
        if event_id.is_empty() {
            return None;
        }
        let token = self.token();
        let token = token.as_deref();
        let segments = ["v2", "events", event_id, "attendees"];
        let segments = &segments;
        let query = &ListQuery::all();
        let executor = self.executor();
        self.attendees
            .fetch(&CollectionKey::parent(event_id), mode, move || {
                fetch_all::<User>(executor, None, segments, token, query)
            })
            .await
    }

    /// Signs the current user up for an event.
    pub async fn sign_up(&self, event_id: &str) -> Outcome<()> {
        self.change_attendance(event_id, RequestOptions::post(None), 1).await
    }

    pub async fn leave(&self, event_id: &str) -> Outcome<()> {
        self.change_attendance(event_id, RequestOptions::delete(), -1).await
    }

    async fn change_attendance(&self, event_id: &str, options: RequestOptions, delta: i64) -> Outcome<()> {
        if event_id.is_empty() {
            return Failure::missing_id("event").into();
        }
        let url = self.executor().api_url(&["v2", "events", event_id, "attendees"]);
        let token = self.token();
        let outcome =
            self.executor().execute::<Value>(None, &url, token.as_deref(), options).await.discard();
        if !outcome.is_success() {
            return outcome;
        }

        self.events.modify(event_id, |event| {
            event.attendee_count = event.attendee_count.saturating_add_signed(delta);
        });
        self.attendees.remove(&CollectionKey::parent(event_id));
        debug!(event_id, delta, "attendance changed, reconciling event");
        self.events.fetch(event_id, FetchMode::Forced).await;
        outcome
    }

    #[must_use]
    pub fn cached_submissions(&self, event_id: &str, user_id: &str) -> Option<Arc<Vec<Submission>>> {
        self.submissions.get(&CollectionKey::pair(event_id, user_id))
    }

    /// One user's submissions to an event.
    pub async fn submissions(
        &self,
        event_id: &str,
        user_id: &str,
        mode: FetchMode,
    ) -> Option<Arc<Vec<Submission>>> {
        if event_id.is_empty() || user_id.is_empty() {
            return None;
        }
        let url = self.executor().api_url(&["v2", "events", event_id, "submissions", user_id]);
        let token = self.token();
        let token = token.as_deref();
        let url = url.as_str();
        let executor = self.executor();
        self.submissions
            .fetch(&CollectionKey::pair(event_id, user_id), mode, move || {
                executor.execute::<Vec<Submission>>(None, url, token, RequestOptions::get())
            })
            .await
    }

    /// Submits to an event and upserts the server's copy into the submitter's entry.
    ///
    /// When the server's copy names no submitter, every cached submission list
    /// of the event is dropped instead.
    pub async fn submit<B>(&self, event_id: &str, body: &B) -> Outcome<Submission>
    where
        B: Serialize + ?Sized,
    {
        if event_id.is_empty() {
            return Failure::missing_id("event").into();
        }
        let body = match json_body(body) {
            Ok(body) => body,
            Err(failure) => return failure.into(),
        };
        let url = self.executor().api_url(&["v2", "events", event_id, "submissions"]);
        let token = self.token();
        let outcome = self
            .executor()
            .execute::<Submission>(None, &url, token.as_deref(), RequestOptions::post(Some(body)))
            .await;

        match outcome.as_data() {
            Some(submission) if submission.user_id.is_empty() => {
                debug!(event_id, submission = %submission.id, "submission names no submitter, dropping cached lists");
                self.submissions.clear_parent(event_id);
            }
            Some(submission) => self.upsert_submission(event_id, submission),
            None => {}
        }
        outcome
    }

    fn upsert_submission(&self, event_id: &str, submission: &Submission) {
        let key = CollectionKey::pair(event_id, submission.user_id.as_str());
        let upserted = self.submissions.update(&key, |items| {
            match items.iter_mut().find(|s| s.id == submission.id) {
                Some(existing) => *existing = submission.clone(),
                None => items.push(submission.clone()),
            }
        });
        if upserted.is_none() {
            self.submissions.replace(&key, vec![submission.clone()]);
        }
    }

    #[must_use]
    pub fn cached_thumbnail(&self, event_id: &str) -> Option<BlobSet> {
        self.thumbnails.get(event_id)
    }

    /// WebP thumbnail for an event, as an object URL.
    pub async fn thumbnail(&self, event_id: &str, mode: FetchMode) -> Option<BlobSet> {
        let url = self.executor().api_url_with_query(
            &["v2", "events", event_id, "thumbnail"],
            &[("size", THUMBNAIL_SIZE.to_string())],
        );
        let token = self.token();
        let token = token.as_deref();
        let variants = [(THUMBNAIL_SIZE, url)];
        let variants = &variants;
        let executor = self.executor();
        self.thumbnails
            .fetch(event_id, mode, move || {
                download_variants(executor, token, variants, THUMBNAIL_CONTENT_TYPE)
            })
            .await
    }

    /// Deletes an event along with its attendees, submissions and thumbnail.
    pub async fn delete(&self, id: &str) -> Outcome<()> {
        self.events.delete(id).await
    }

    /// Drops one event and everything derived from it, or the whole store.
    pub fn clear(&self, id: Option<&str>) {
        self.events.clear(id);
    }
}
