//! mockito server standing in for both the REST API and the cloud proxy.

use agora_core::{
    config::{ApiConfig, AppConfig},
    AgoraContext,
};
use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::Value;

/// Builder for mock Agora API responses.
///
/// The same server answers `/v2/...` and `/api/...`, so one base URL serves as
/// both the API and the proxy origin.
pub struct ApiMockBuilder {
    server: ServerGuard,
    mocks: Vec<Mock>,
}

impl ApiMockBuilder {
    pub async fn new() -> Self {
        Self { server: Server::new_async().await, mocks: Vec::new() }
    }

    #[must_use]
    pub fn url(&self) -> String {
        self.server.url()
    }

    /// Configuration pointing the API and the proxy at this server.
    #[must_use]
    pub fn config(&self) -> AppConfig {
        AppConfig {
            api: ApiConfig {
                base_url: self.url(),
                proxy_base_url: self.url(),
                timeout_seconds: 5,
            },
            ..Default::default()
        }
    }

    /// Builds a context over the real HTTP client.
    ///
    /// # Panics
    ///
    /// Panics if the context cannot be built.
    #[must_use]
    pub fn context(&self, token: Option<&str>) -> AgoraContext {
        let mut builder = AgoraContext::builder().with_config(self.config());
        if let Some(token) = token {
            builder = builder.with_token(token);
        }
        builder.build().expect("context should build against the mock server")
    }

    /// Matches `path` with or without a query string.
    fn path(path: &str) -> Matcher {
        Matcher::Regex(format!(r"^{}(\?.*)?$", regex_escape(path)))
    }

    /// Mocks a JSON response expected exactly `hits` times.
    pub async fn mock_json_times(
        &mut self,
        method: &str,
        path: &str,
        status: usize,
        body: &Value,
        hits: usize,
    ) -> &mut Self {
        let mock = self
            .server
            .mock(method, Self::path(path))
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .expect(hits)
            .create_async()
            .await;

        self.mocks.push(mock);
        self
    }

    /// Mocks a JSON response expected exactly once.
    pub async fn mock_json(
        &mut self,
        method: &str,
        path: &str,
        status: usize,
        body: &Value,
    ) -> &mut Self {
        self.mock_json_times(method, path, status, body, 1).await
    }

    /// Mocks a response with no body, as returned by most write endpoints.
    pub async fn mock_empty(&mut self, method: &str, path: &str, status: usize) -> &mut Self {
        let mock = self
            .server
            .mock(method, Self::path(path))
            .with_status(status)
            .expect(1)
            .create_async()
            .await;

        self.mocks.push(mock);
        self
    }

    /// Mocks one page of a list endpoint, matched on the `page` query parameter.
    pub async fn mock_page(&mut self, path: &str, page: usize, items: &[Value]) -> &mut Self {
        let body = serde_json::json!({ "items": items, "total": items.len() });
        let mock = self
            .server
            .mock("GET", Self::path(path))
            .match_query(Matcher::UrlEncoded("page".to_string(), page.to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .expect(1)
            .create_async()
            .await;

        self.mocks.push(mock);
        self
    }

    /// Mocks a failing page of a list endpoint.
    pub async fn mock_page_status(&mut self, path: &str, page: usize, status: usize) -> &mut Self {
        let mock = self
            .server
            .mock("GET", Self::path(path))
            .match_query(Matcher::UrlEncoded("page".to_string(), page.to_string()))
            .with_status(status)
            .expect(1)
            .create_async()
            .await;

        self.mocks.push(mock);
        self
    }

    /// Mocks a JSON response that only matches the given bearer token.
    pub async fn mock_authorized(
        &mut self,
        method: &str,
        path: &str,
        token: &str,
        body: &Value,
    ) -> &mut Self {
        let mock = self
            .server
            .mock(method, Self::path(path))
            .match_header("authorization", format!("Bearer {token}").as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .expect(1)
            .create_async()
            .await;

        self.mocks.push(mock);
        self
    }

    /// Mocks a JSON write whose request body must contain `fragment`.
    pub async fn mock_write(
        &mut self,
        method: &str,
        path: &str,
        fragment: Value,
        response: &Value,
    ) -> &mut Self {
        let mock = self
            .server
            .mock(method, Self::path(path))
            .match_body(Matcher::PartialJson(fragment))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(response.to_string())
            .expect(1)
            .create_async()
            .await;

        self.mocks.push(mock);
        self
    }

    /// Mocks a binary download.
    pub async fn mock_bytes(
        &mut self,
        path: &str,
        size: u32,
        content_type: &str,
        bytes: &[u8],
    ) -> &mut Self {
        let mock = self
            .server
            .mock("GET", Self::path(path))
            .match_query(Matcher::UrlEncoded("size".to_string(), size.to_string()))
            .with_status(200)
            .with_header("content-type", content_type)
            .with_body(bytes)
            .expect(1)
            .create_async()
            .await;

        self.mocks.push(mock);
        self
    }

    /// Asserts every registered mock was hit the expected number of times.
    pub async fn assert_all(&self) {
        for mock in &self.mocks {
            mock.assert_async().await;
        }
    }
}

fn regex_escape(path: &str) -> String {
    path.chars()
        .fold(String::with_capacity(path.len()), |mut escaped, c| {
            if "\\.+*?()|[]{}^$".contains(c) {
                escaped.push('\\');
            }
            escaped.push(c);
            escaped
        })
}
