//! Calls to the cloud service behind the local `/api` proxy.
//!
//! The proxy attaches its own service key; these helpers only forward the user's
//! session token. Lookups that are stable for a session are kept in named executor
//! slots.

use crate::{
    api::{json_body, Outcome, RequestExecutor, RequestOptions},
    session::TokenProvider,
    types::Activity,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// A geocoder match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub struct CloudClient {
    executor: Arc<RequestExecutor>,
    session: Arc<dyn TokenProvider>,
}

impl CloudClient {
    #[must_use]
    pub fn new(executor: Arc<RequestExecutor>, session: Arc<dyn TokenProvider>) -> Self {
        Self { executor, session }
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        slot: Option<&str>,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Outcome<T> {
        let url = self.executor.proxy_url(segments, query);
        let token = self.session.token();
        self.executor.execute(slot, &url, token.as_deref(), RequestOptions::get()).await
    }

    /// Activities recommended for the signed-in user.
    pub async fn recommend_activities(&self, count: usize) -> Outcome<Vec<Activity>> {
        let slot = format!("cloud:recommend:activities:{count}");
        self.get(Some(&slot), &["api", "recommend", "activities"], &[("count", count.to_string())])
            .await
    }

    pub async fn geocode(&self, query: &str) -> Outcome<Vec<Place>> {
        let slot = format!("cloud:geocode:{query}");
        self.get(Some(&slot), &["api", "geocode"], &[("q", query.to_string())]).await
    }

    /// Free-text search across content kinds. Never cached.
    pub async fn search(&self, query: &str) -> Outcome<Value> {
        self.get(None, &["api", "search"], &[("q", query.to_string())]).await
    }

    /// Scores a completed quiz.
    pub async fn score_quiz<B>(&self, answers: &B) -> Outcome<Value>
    where
        B: Serialize + ?Sized,
    {
        let body = match json_body(answers) {
            Ok(body) => body,
            Err(failure) => return failure.into(),
        };
        let url = self.executor.proxy_url(&["api", "quiz", "score"], &[]);
        let token = self.session.token();
        self.executor.execute(None, &url, token.as_deref(), RequestOptions::post(Some(body))).await
    }

    /// Forgets every cached cloud lookup.
    pub fn clear(&self) -> usize {
        self.executor.clear_slots("cloud:")
    }
}
