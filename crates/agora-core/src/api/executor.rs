//! Request execution: one HTTP call normalized into an [`Outcome`].
//!
//! The executor never returns `Err` and never panics on bad input. Every failure
//! path, from an unreachable host to a 2xx body shaped like an error, comes back
//! as an [`Outcome`] variant and is logged here.
//!
//! Optional named cache slots give read-through/write-through caching for
//! endpoints that have no entity cache of their own (cloud proxy lookups, list
//! pages). Binary downloads never touch the slots.

use crate::{
    api::{Failure, HttpRequest, HttpResponse, Method, Outcome, Transport},
    config::ApiConfig,
    types::ErrorPayload,
};
use ahash::RandomState;
use bytes::Bytes;
use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, trace, warn};
use url::Url;

/// Method and body of a request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<Value>,
}

impl RequestOptions {
    #[must_use]
    pub fn get() -> Self {
        Self { method: Method::Get, body: None }
    }

    #[must_use]
    pub fn post(body: Option<Value>) -> Self {
        Self { method: Method::Post, body }
    }

    #[must_use]
    pub fn patch(body: Option<Value>) -> Self {
        Self { method: Method::Patch, body }
    }

    #[must_use]
    pub fn put(body: Option<Value>) -> Self {
        Self { method: Method::Put, body }
    }

    #[must_use]
    pub fn delete() -> Self {
        Self { method: Method::Delete, body: None }
    }
}

/// Raw payload of a binary download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Serializes a request body, classifying failure as a bad request.
///
/// # Errors
///
/// Returns a [`Failure`] when `body` cannot be represented as JSON.
pub fn json_body<B: Serialize + ?Sized>(body: &B) -> Result<Value, Failure> {
    serde_json::to_value(body).map_err(|e| {
        let mut failure = Failure::of(crate::api::FailureKind::BadRequest);
        failure.payload = Some(ErrorPayload::new(e.to_string()));
        failure
    })
}

pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    api_base: Url,
    proxy_base: Url,
    slots: DashMap<String, Value, RandomState>,
}

impl RequestExecutor {
    /// Creates an executor for the configured API and proxy bases.
    ///
    /// # Errors
    ///
    /// Returns [`url::ParseError`] if either base URL is invalid or cannot carry a path.
    pub fn new(transport: Arc<dyn Transport>, config: &ApiConfig) -> Result<Self, url::ParseError> {
        let api_base = Self::parse_base(&config.base_url)?;
        let proxy_base = Self::parse_base(&config.proxy_base_url)?;
        Ok(Self { transport, api_base, proxy_base, slots: DashMap::with_hasher(RandomState::new()) })
    }

    fn parse_base(raw: &str) -> Result<Url, url::ParseError> {
        let url = Url::parse(raw)?;
        if url.cannot_be_a_base() {
            return Err(url::ParseError::RelativeUrlWithCannotBeABaseBase);
        }
        Ok(url)
    }

    fn join(base: &Url, segments: &[&str], query: &[(&str, String)]) -> String {
        let mut url = base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        url.into()
    }

    /// Builds a public API URL from percent-encoded path segments.
    #[must_use]
    pub fn api_url(&self, segments: &[&str]) -> String {
        Self::join(&self.api_base, segments, &[])
    }

    #[must_use]
    pub fn api_url_with_query(&self, segments: &[&str], query: &[(&str, String)]) -> String {
        Self::join(&self.api_base, segments, query)
    }

    /// Builds a URL on the local proxy (`/api/...`).
    #[must_use]
    pub fn proxy_url(&self, segments: &[&str], query: &[(&str, String)]) -> String {
        Self::join(&self.proxy_base, segments, query)
    }

    /// Resolves a possibly relative resource URL (e.g. an avatar path) against the API base.
    #[must_use]
    pub fn resolve(&self, url: &str) -> String {
        self.api_base.join(url).map_or_else(|_| url.to_string(), Into::into)
    }

    /// Performs a JSON request.
    ///
    /// With a `cache_key`, a non-empty value already held in that slot is returned
    /// without a network call, and a successful non-empty response is written to it.
    pub async fn execute<T>(
        &self,
        cache_key: Option<&str>,
        url: &str,
        token: Option<&str>,
        options: RequestOptions,
    ) -> Outcome<T>
    where
        T: DeserializeOwned,
    {
        if let Some(key) = cache_key {
            if let Some(hit) = self.read_slot::<T>(key) {
                trace!(cache_key = key, "request served from cache slot");
                return Outcome::Success(Some(hit));
            }
        }

        let method = options.method;
        let request =
            HttpRequest::new(method, url).with_token(token).with_body(options.body);
        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(method = method.as_str(), url = %url, error = %e, "api request failed");
                return Outcome::HardError(Failure::from_transport(&e));
            }
        };

        if !response.is_success() {
            let failure = Failure::from_status(response.status, Self::error_payload(&response));
            warn!(
                method = method.as_str(),
                url = %url,
                status = response.status,
                kind = failure.kind.as_str(),
                "api request failed"
            );
            return Outcome::HardError(failure);
        }

        if response.is_empty() {
            if method.is_write() {
                return Outcome::Success(None);
            }
            warn!(url = %url, "api read returned an empty body");
            return Outcome::HardError(Failure::not_found());
        }

        let value: Value = match serde_json::from_slice(&response.body) {
            Ok(value) => value,
            Err(e) => {
                warn!(method = method.as_str(), url = %url, error = %e, "unparseable api response");
                return Outcome::HardError(Failure::invalid_response(e.to_string()));
            }
        };

        if let Some(payload) = ErrorPayload::detect(&value) {
            warn!(method = method.as_str(), url = %url, message = %payload.message, "api soft failure");
            return Outcome::SoftError(payload);
        }

        if value.is_null() && method.is_write() {
            return Outcome::Success(None);
        }

        let cacheable = cache_key.filter(|_| !is_empty_value(&value)).map(|key| (key, value.clone()));
        match serde_json::from_value::<T>(value) {
            Ok(data) => {
                if let Some((key, value)) = cacheable {
                    debug!(cache_key = key, "writing response to cache slot");
                    self.slots.insert(key.to_string(), value);
                }
                Outcome::Success(Some(data))
            }
            Err(e) => {
                warn!(method = method.as_str(), url = %url, error = %e, "unexpected api response shape");
                Outcome::HardError(Failure::invalid_response(e.to_string()))
            }
        }
    }

    /// Downloads binary content (images, generated media). Never cached.
    ///
    /// `expected_content_type` is matched as a prefix of the response's content type,
    /// so `"image/"` accepts any image and `"image/webp"` only WebP.
    pub async fn execute_binary(
        &self,
        url: &str,
        token: Option<&str>,
        expected_content_type: Option<&str>,
    ) -> Outcome<Blob> {
        let request = HttpRequest::new(Method::Get, url).with_token(token);
        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %url, error = %e, "binary download failed");
                return Outcome::HardError(Failure::from_transport(&e));
            }
        };

        if !response.is_success() {
            let failure = Failure::from_status(response.status, Self::error_payload(&response));
            warn!(url = %url, status = response.status, kind = failure.kind.as_str(), "binary download failed");
            return Outcome::HardError(failure);
        }

        if response.body.is_empty() {
            warn!(url = %url, "binary download returned an empty body");
            return Outcome::HardError(Failure::not_found());
        }

        if let Some(expected) = expected_content_type {
            let actual = response.content_type.as_deref().unwrap_or_default();
            if !actual.trim_start().starts_with(expected) {
                warn!(url = %url, expected, actual, "unexpected content type");
                return Outcome::HardError(Failure::invalid_response(format!(
                    "expected content type {expected}, got {actual}"
                )));
            }
        }

        Outcome::Success(Some(Blob { content_type: response.content_type, bytes: response.body }))
    }

    fn error_payload(response: &HttpResponse) -> Option<ErrorPayload> {
        serde_json::from_slice::<ErrorPayload>(&response.body).ok()
    }

    fn read_slot<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.slots.get(key).map(|entry| entry.value().clone())?;
        if is_empty_value(&value) {
            return None;
        }
        match serde_json::from_value(value) {
            Ok(hit) => Some(hit),
            Err(e) => {
                debug!(cache_key = key, error = %e, "dropping incompatible cache slot");
                self.slots.remove(key);
                None
            }
        }
    }

    /// Returns the raw value held in a named slot.
    #[must_use]
    pub fn slot(&self, key: &str) -> Option<Value> {
        self.slots.get(key).map(|entry| entry.value().clone())
    }

    pub fn set_slot<V: Serialize>(&self, key: &str, value: &V) {
        if let Ok(value) = serde_json::to_value(value) {
            self.slots.insert(key.to_string(), value);
        }
    }

    pub fn clear_slot(&self, key: &str) -> bool {
        self.slots.remove(key).is_some()
    }

    /// Removes every slot whose key starts with `prefix`. Returns the number removed.
    pub fn clear_slots(&self, prefix: &str) -> usize {
        let before = self.slots.len();
        self.slots.retain(|key, _| !key.starts_with(prefix));
        before.saturating_sub(self.slots.len())
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        Value::String(s) => s.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
