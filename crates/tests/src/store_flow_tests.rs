//! Store mutations and their cache side effects, end to end.

use crate::mock_infrastructure::{event_json, notification_json, user_json, ApiMockBuilder};
use agora_core::{
    cache::FetchMode,
    session::TokenProvider,
    types::Event,
};
use serde_json::json;

fn event(id: &str, attendee_count: u64) -> Event {
    serde_json::from_value(event_json(id, attendee_count)).expect("event fixture")
}

#[tokio::test]
async fn test_sign_up_reconciles_event_and_drops_attendees() {
    let mut mock = ApiMockBuilder::new().await;
    mock.mock_page("/v2/events/e1/attendees", 1, &[user_json("u2")]).await;
    mock.mock_empty("POST", "/v2/events/e1/attendees", 204).await;
    mock.mock_json("GET", "/v2/events/e1", 200, &event_json("e1", 8)).await;
    let context = mock.context(Some("tok"));
    let events = context.events();
    events.cache().set(event("e1", 3));

    let attendees = events.attendees("e1", FetchMode::Cached).await.expect("attendees");
    assert_eq!(attendees.len(), 1);
    assert!(context.users().cache().has("u2"));

    assert!(events.sign_up("e1").await.is_success());

    assert!(events.cached_attendees("e1").is_none());
    assert_eq!(events.get("e1").map(|e| e.attendee_count), Some(8));
    mock.assert_all().await;
}

#[tokio::test]
async fn test_rejected_sign_up_leaves_cache_alone() {
    let mut mock = ApiMockBuilder::new().await;
    mock.mock_json("POST", "/v2/events/e1/attendees", 400, &json!({ "message": "Event is full" }))
        .await;
    let context = mock.context(Some("tok"));
    let events = context.events();
    events.cache().set(event("e1", 3));

    let outcome = events.sign_up("e1").await;

    assert_eq!(outcome.message(), Some("Event is full"));
    assert_eq!(events.get("e1").map(|e| e.attendee_count), Some(3));
    mock.assert_all().await;
}

#[tokio::test]
async fn test_submit_upserts_into_submitter_entry() {
    let mut mock = ApiMockBuilder::new().await;
    mock.mock_write(
        "POST",
        "/v2/events/e1/submissions",
        json!({ "content": { "photo": "p.jpg" } }),
        &json!({ "id": "s1", "eventId": "e1", "userId": "u1", "content": { "photo": "p.jpg" } }),
    )
    .await;
    let context = mock.context(Some("tok"));
    let events = context.events();

    let submission = events
        .submit("e1", &json!({ "content": { "photo": "p.jpg" } }))
        .await
        .data()
        .expect("submission");

    assert_eq!(submission.id, "s1");
    let cached = events.cached_submissions("e1", "u1").expect("cached submissions");
    assert_eq!(cached.len(), 1);
    mock.assert_all().await;
}

#[tokio::test]
async fn test_delete_event_revokes_thumbnail() {
    let mut mock = ApiMockBuilder::new().await;
    mock.mock_bytes("/v2/events/e1/thumbnail", 128, "image/webp", &[9, 9, 9]).await;
    mock.mock_empty("DELETE", "/v2/events/e1", 204).await;
    let context = mock.context(Some("tok"));
    let events = context.events();
    events.cache().set(event("e1", 0));

    let thumbnail = events.thumbnail("e1", FetchMode::Cached).await.expect("thumbnail");
    let url = thumbnail.largest().expect("url").clone();
    assert!(context.blob_registry().resolve(&url).is_some());

    assert!(events.delete("e1").await.is_success());

    assert!(events.get("e1").is_none());
    assert!(events.cached_thumbnail("e1").is_none());
    assert!(context.blob_registry().resolve(&url).is_none());
    mock.assert_all().await;
}

#[tokio::test]
async fn test_friendship_change_drops_both_lists() {
    let mut mock = ApiMockBuilder::new().await;
    mock.mock_authorized("GET", "/v2/users/current", "tok", &user_json("u1")).await;
    mock.mock_page("/v2/users/u1/friends", 1, &[user_json("u3")]).await;
    mock.mock_empty("PUT", "/v2/users/current/friends/u2", 204).await;
    let context = mock.context(Some("tok"));

    context.users().current(FetchMode::Cached).await.expect("current user");
    context.friends().friends("u1", FetchMode::Cached).await.expect("friends");
    assert!(context.friends().cached_friends("u1").is_some());

    assert!(context.friends().add_friend("u2").await.is_success());

    assert!(context.friends().cached_friends("u1").is_none());
    mock.assert_all().await;
}

#[tokio::test]
async fn test_notifications_mark_all_read() {
    let mut mock = ApiMockBuilder::new().await;
    mock.mock_authorized("GET", "/v2/users/current", "tok", &user_json("u1")).await;
    mock.mock_page(
        "/v2/users/current/notifications",
        1,
        &[notification_json("n1", false), notification_json("n2", false), notification_json("n3", true)],
    )
    .await;
    mock.mock_empty("POST", "/v2/users/current/notifications/read", 204).await;
    let context = mock.context(Some("tok"));
    let notifications = context.notifications();

    let inbox = notifications.list(FetchMode::Cached).await.expect("inbox");
    assert_eq!(inbox.len(), 3);
    assert_eq!(notifications.unread_count(), 2);

    assert!(notifications.mark_all_read().await.is_success());

    assert_eq!(notifications.unread_count(), 0);
    assert!(notifications.cache().get("n1").is_some_and(|n| n.read));
    mock.assert_all().await;
}

#[tokio::test]
async fn test_rejected_session_clears_token() {
    let mut mock = ApiMockBuilder::new().await;
    mock.mock_empty("GET", "/v2/users/current", 401).await;
    let context = mock.context(Some("expired"));

    assert!(context.users().current(FetchMode::Cached).await.is_none());

    assert!(context.session().token().is_none());
    assert!(context.notifications().list(FetchMode::Cached).await.is_none());
    mock.assert_all().await;
}

#[tokio::test]
async fn test_cloud_lookups_use_proxy_and_slots() {
    let mut mock = ApiMockBuilder::new().await;
    mock.mock_json(
        "GET",
        "/api/geocode",
        200,
        &json!([{ "name": "Oslo", "latitude": 59.91, "longitude": 10.75 }]),
    )
    .await;
    let context = mock.context(Some("tok"));

    let first = context.cloud().geocode("Oslo").await.data().expect("places");
    let second = context.cloud().geocode("Oslo").await.data().expect("places");

    assert_eq!(first, second);
    assert_eq!(first[0].name, "Oslo");
    mock.assert_all().await;
}
