//! Page walking against list endpoints.

use crate::mock_infrastructure::{activities, ApiMockBuilder};
use agora_core::{
    api::{FailureKind, ListQuery, PAGE_SIZE},
    cache::FetchMode,
};

#[tokio::test]
async fn test_walks_until_short_page() {
    let mut mock = ApiMockBuilder::new().await;
    mock.mock_page("/v2/activities", 1, &activities("a", PAGE_SIZE)).await;
    mock.mock_page("/v2/activities", 2, &activities("b", 30)).await;
    let context = mock.context(None);

    let listed = context.activities().list(&ListQuery::all()).await.data().expect("list");

    assert_eq!(listed.len(), PAGE_SIZE + 30);
    assert_eq!(listed[0].id, "a0");
    assert_eq!(listed[PAGE_SIZE].id, "b0");
    mock.assert_all().await;
}

#[tokio::test]
async fn test_limit_stops_walk_and_truncates() {
    let mut mock = ApiMockBuilder::new().await;
    mock.mock_page("/v2/activities", 1, &activities("a", PAGE_SIZE)).await;
    let context = mock.context(None);

    let listed = context
        .activities()
        .list(&ListQuery::all().with_limit(40))
        .await
        .data()
        .expect("list");

    assert_eq!(listed.len(), 40);
    mock.assert_all().await;
}

#[tokio::test]
async fn test_failed_page_aborts_walk() {
    let mut mock = ApiMockBuilder::new().await;
    mock.mock_page("/v2/activities", 1, &activities("a", PAGE_SIZE)).await;
    mock.mock_page_status("/v2/activities", 2, 429).await;
    let context = mock.context(None);

    let outcome = context.activities().list(&ListQuery::all()).await;

    assert_eq!(outcome.failure().map(|f| f.kind), Some(FailureKind::RateLimited));
}

#[tokio::test]
async fn test_listed_records_seed_entity_cache() {
    let mut mock = ApiMockBuilder::new().await;
    mock.mock_page("/v2/activities", 1, &activities("a", 3)).await;
    let context = mock.context(None);

    context.activities().list(&ListQuery::all()).await.data().expect("list");

    // served from the cache; the server would reject a second request
    let cached = context.activities().fetch("a2", FetchMode::Cached).await.expect("cached");
    assert_eq!(cached.name, "Activity a2");
    mock.assert_all().await;
}
