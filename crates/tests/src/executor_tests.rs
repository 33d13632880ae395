//! Outcome classification over the real HTTP client.

use crate::mock_infrastructure::{activity_json, ApiMockBuilder};
use agora_core::{
    api::{FailureKind, HttpClient, Outcome, RequestExecutor, RequestOptions},
    types::Activity,
};
use serde_json::{json, Value};
use std::sync::Arc;

fn executor(mock: &ApiMockBuilder) -> RequestExecutor {
    let transport = Arc::new(HttpClient::new().expect("http client"));
    RequestExecutor::new(transport, &mock.config().api).expect("executor")
}

#[tokio::test]
async fn test_success_deserializes_record() {
    let mut mock = ApiMockBuilder::new().await;
    mock.mock_json("GET", "/v2/activities/a1", 200, &activity_json("a1")).await;
    let executor = executor(&mock);

    let url = executor.api_url(&["v2", "activities", "a1"]);
    let outcome: Outcome<Activity> = executor.execute(None, &url, None, RequestOptions::get()).await;

    let activity = outcome.data().expect("activity");
    assert_eq!(activity.name, "Activity a1");
    assert!(activity.extra.contains_key("types"));
    mock.assert_all().await;
}

#[tokio::test]
async fn test_status_codes_map_to_failure_kinds() {
    let mut mock = ApiMockBuilder::new().await;
    let cases = [
        ("/v2/a", 404, FailureKind::NotFound),
        ("/v2/b", 401, FailureKind::Unauthorized),
        ("/v2/c", 403, FailureKind::Forbidden),
        ("/v2/d", 429, FailureKind::RateLimited),
        ("/v2/e", 503, FailureKind::Failed),
    ];
    for (path, status, _) in &cases {
        mock.mock_empty("GET", path, *status).await;
    }
    let executor = executor(&mock);

    for (path, _, kind) in cases {
        let url = executor.resolve(path);
        let outcome: Outcome<Value> = executor.execute(None, &url, None, RequestOptions::get()).await;
        assert_eq!(outcome.failure().map(|f| f.kind), Some(kind), "{path}");
    }
    mock.assert_all().await;
}

#[tokio::test]
async fn test_bad_request_surfaces_server_message() {
    let mut mock = ApiMockBuilder::new().await;
    mock.mock_json("POST", "/v2/events", 400, &json!({ "code": 400, "message": "Name is required" }))
        .await;
    let executor = executor(&mock);

    let url = executor.api_url(&["v2", "events"]);
    let outcome: Outcome<Value> =
        executor.execute(None, &url, Some("tok"), RequestOptions::post(Some(json!({})))).await;

    assert_eq!(outcome.failure().map(|f| f.kind), Some(FailureKind::BadRequest));
    assert_eq!(outcome.message(), Some("Name is required"));
}

#[tokio::test]
async fn test_error_shaped_body_is_soft_error() {
    let mut mock = ApiMockBuilder::new().await;
    mock.mock_json("GET", "/v2/prompts/p1", 200, &json!({ "message": "Prompt is archived" })).await;
    let executor = executor(&mock);

    let url = executor.api_url(&["v2", "prompts", "p1"]);
    let outcome: Outcome<Value> = executor.execute(None, &url, None, RequestOptions::get()).await;

    assert!(matches!(outcome, Outcome::SoftError(_)));
    assert_eq!(outcome.message(), Some("Prompt is archived"));
}

#[tokio::test]
async fn test_empty_write_response_is_success() {
    let mut mock = ApiMockBuilder::new().await;
    mock.mock_empty("DELETE", "/v2/activities/a1", 204).await;
    let executor = executor(&mock);

    let url = executor.api_url(&["v2", "activities", "a1"]);
    let outcome: Outcome<Value> =
        executor.execute(None, &url, Some("tok"), RequestOptions::delete()).await;

    assert!(matches!(outcome, Outcome::Success(None)));
}

#[tokio::test]
async fn test_cache_slot_skips_second_request() {
    let mut mock = ApiMockBuilder::new().await;
    mock.mock_json("GET", "/api/geocode", 200, &json!([{ "name": "Oslo" }])).await;
    let executor = executor(&mock);

    let url = executor.proxy_url(&["api", "geocode"], &[("q", "Oslo".to_string())]);
    for _ in 0..3 {
        let outcome: Outcome<Value> =
            executor.execute(Some("geo:oslo"), &url, None, RequestOptions::get()).await;
        assert!(outcome.is_success());
    }

    assert!(executor.slot("geo:oslo").is_some());
    mock.assert_all().await;
}

#[tokio::test]
async fn test_bearer_token_is_sent() {
    let mut mock = ApiMockBuilder::new().await;
    mock.mock_authorized("GET", "/v2/users/current", "secret", &json!({ "id": "u1" })).await;
    let executor = executor(&mock);

    let url = executor.api_url(&["v2", "users", "current"]);
    let outcome: Outcome<Value> =
        executor.execute(None, &url, Some("secret"), RequestOptions::get()).await;

    assert!(outcome.is_success());
    mock.assert_all().await;
}

#[tokio::test]
async fn test_unreachable_server_is_hard_failure() {
    let transport = Arc::new(HttpClient::new().expect("http client"));
    let config = agora_core::config::ApiConfig {
        base_url: "http://127.0.0.1:9".to_string(),
        proxy_base_url: "http://127.0.0.1:9".to_string(),
        timeout_seconds: 2,
    };
    let executor = RequestExecutor::new(transport, &config).expect("executor");

    let url = executor.api_url(&["v2", "events", "e1"]);
    let outcome: Outcome<Value> = executor.execute(None, &url, None, RequestOptions::get()).await;

    assert_eq!(outcome.failure().map(|f| f.kind), Some(FailureKind::Failed));
}
