//! Concurrent callers sharing one request over the real transport.

use crate::mock_infrastructure::{event_json, user_json, ApiMockBuilder};
use agora_core::cache::FetchMode;
use futures::future::join_all;

#[tokio::test]
async fn test_concurrent_fetches_share_one_request() {
    let mut mock = ApiMockBuilder::new().await;
    mock.mock_json("GET", "/v2/events/e1", 200, &event_json("e1", 4)).await;
    let context = mock.context(None);
    let events = context.events();

    let results = join_all((0..10).map(|_| events.fetch("e1", FetchMode::Cached))).await;

    assert!(results.iter().all(|event| event.as_ref().is_some_and(|e| e.attendee_count == 4)));
    assert!(!events.cache().ledger().is_pending("e1"));
    mock.assert_all().await;
}

#[tokio::test]
async fn test_concurrent_failures_resolve_identically() {
    let mut mock = ApiMockBuilder::new().await;
    mock.mock_empty("GET", "/v2/events/gone", 404).await;
    let context = mock.context(None);
    let events = context.events();

    let results = join_all((0..5).map(|_| events.fetch("gone", FetchMode::Cached))).await;

    assert!(results.iter().all(Option::is_none));
    assert!(events.cache().ledger().is_empty());
    mock.assert_all().await;
}

#[tokio::test]
async fn test_forced_fetch_waits_then_refetches() {
    let mut mock = ApiMockBuilder::new().await;
    mock.mock_json_times("GET", "/v2/events/e1", 200, &event_json("e1", 1), 2).await;
    let context = mock.context(None);
    let events = context.events();

    let (cached, forced) =
        tokio::join!(events.fetch("e1", FetchMode::Cached), events.fetch("e1", FetchMode::Forced));

    assert!(cached.is_some());
    assert!(forced.is_some());
    mock.assert_all().await;
}

#[tokio::test]
async fn test_concurrent_current_user_lookups_coalesce() {
    let mut mock = ApiMockBuilder::new().await;
    mock.mock_authorized("GET", "/v2/users/current", "tok", &user_json("u1")).await;
    let context = mock.context(Some("tok"));
    let users = context.users();

    let results = join_all((0..6).map(|_| users.current(FetchMode::Cached))).await;

    assert!(results.iter().all(|user| user.as_ref().is_some_and(|u| u.id == "u1")));
    assert_eq!(users.current_id().as_deref(), Some("u1"));
    assert!(users.cache().has("u1"));
    mock.assert_all().await;
}

#[tokio::test]
async fn test_concurrent_avatar_downloads_mint_one_set() {
    let mut mock = ApiMockBuilder::new().await;
    mock.mock_bytes("/v2/users/u1/avatar", 32, "image/png", &[1, 2]).await;
    mock.mock_bytes("/v2/users/u1/avatar", 128, "image/png", &[3, 4]).await;
    let context = mock.context(Some("tok"));
    let avatars = context.avatars();

    let results =
        join_all((0..4).map(|_| avatars.fetch("/v2/users/u1/avatar", FetchMode::Cached))).await;

    let first = results[0].clone().expect("avatar");
    assert!(results.iter().all(|set| set.as_ref() == Some(&first)));
    assert_eq!(context.blob_registry().live_count(), 2);
    mock.assert_all().await;
}
