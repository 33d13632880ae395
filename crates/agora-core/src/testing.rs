//! Scripted transport and fixtures shared by unit tests.

use crate::{
    api::{HttpRequest, HttpResponse, Method, RequestExecutor, Transport, TransportError},
    config::ApiConfig,
};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::Value;
use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

pub(crate) const API_BASE: &str = "http://api.test";
pub(crate) const PROXY_BASE: &str = "http://proxy.test";

/// In-memory transport answering from per-route response queues.
///
/// The last response queued for a route is repeated once the queue drains.
/// Unscripted routes fail with a connection error.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<HttpResponse>>>,
    requests: Mutex<Vec<HttpRequest>>,
    delay: Duration,
    route_delays: Mutex<HashMap<(Method, String), Duration>>,
    calls: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Holds every response for `delay` so concurrent callers overlap.
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Holds responses on one route for `delay`, overriding the transport-wide delay.
    pub(crate) fn delay_route(&self, method: Method, url: &str, delay: Duration) {
        self.route_delays.lock().insert((method, url.to_string()), delay);
    }

    pub(crate) fn respond(&self, method: Method, url: &str, response: HttpResponse) {
        self.routes.lock().entry((method, url.to_string())).or_default().push_back(response);
    }

    pub(crate) fn respond_json(&self, method: Method, url: &str, status: u16, body: Value) {
        self.respond(
            method,
            url,
            HttpResponse {
                status,
                content_type: Some("application/json".to_string()),
                body: Bytes::from(body.to_string()),
            },
        );
    }

    pub(crate) fn respond_empty(&self, method: Method, url: &str, status: u16) {
        self.respond(method, url, HttpResponse { status, content_type: None, body: Bytes::new() });
    }

    pub(crate) fn respond_bytes(
        &self,
        method: Method,
        url: &str,
        status: u16,
        content_type: &str,
        body: Vec<u8>,
    ) {
        self.respond(
            method,
            url,
            HttpResponse {
                status,
                content_type: Some(content_type.to_string()),
                body: Bytes::from(body),
            },
        );
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn calls_to(&self, method: Method, url: &str) -> usize {
        self.requests.lock().iter().filter(|r| r.method == method && r.url == url).count()
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// Highest number of requests observed in flight at once.
    pub(crate) fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    fn next_response(&self, method: Method, url: &str) -> Option<HttpResponse> {
        let mut routes = self.routes.lock();
        let queue = routes.get_mut(&(method, url.to_string()))?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        let delay = self
            .route_delays
            .lock()
            .get(&(request.method, request.url.clone()))
            .copied()
            .unwrap_or(self.delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let response = self.next_response(request.method, &request.url);
        self.active.fetch_sub(1, Ordering::SeqCst);
        response.ok_or_else(|| TransportError::ConnectionFailed("unscripted route".to_string()))
    }
}

pub(crate) fn test_api_config() -> ApiConfig {
    ApiConfig {
        base_url: API_BASE.to_string(),
        proxy_base_url: PROXY_BASE.to_string(),
        ..ApiConfig::default()
    }
}

/// Wraps `transport` in an executor pointed at the test bases.
pub(crate) fn executor_with(
    transport: ScriptedTransport,
) -> (Arc<ScriptedTransport>, Arc<RequestExecutor>) {
    let transport = Arc::new(transport);
    let executor = RequestExecutor::new(transport.clone(), &test_api_config())
        .expect("test bases are valid URLs");
    (transport, Arc::new(executor))
}
