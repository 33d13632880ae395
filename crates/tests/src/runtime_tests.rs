//! Building a context from configuration and tearing it down on sign-out.

use crate::mock_infrastructure::{activity_json, user_json, ApiMockBuilder};
use agora_core::{
    cache::{EvictionPolicy, FetchMode},
    config::AppConfig,
    AgoraContext, RuntimeError,
};

#[test]
fn test_builder_rejects_invalid_base_url() {
    let mut config = AppConfig::default();
    config.api.base_url = "not a url".to_string();

    let result = AgoraContext::builder().with_config(config).build();

    assert!(matches!(result, Err(RuntimeError::ConfigValidation(_))));
}

#[test]
fn test_builder_rejects_cross_site_cookie_without_secure() {
    let mut config = AppConfig::default();
    config.session.same_site = agora_core::config::SameSite::None;
    config.session.secure = false;

    let result = AgoraContext::builder().with_config(config).build();

    assert!(matches!(result, Err(RuntimeError::ConfigValidation(_))));
}

#[tokio::test]
async fn test_capacity_from_config_bounds_cache() {
    let mut mock = ApiMockBuilder::new().await;
    for id in ["a1", "a2", "a3"] {
        mock.mock_json("GET", &format!("/v2/activities/{id}"), 200, &activity_json(id)).await;
    }
    let mut config = mock.config();
    config.cache.activity_capacity = 2;
    config.cache.eviction = EvictionPolicy::Fifo;
    let context = AgoraContext::builder().with_config(config).build().expect("context");

    for id in ["a1", "a2", "a3"] {
        context.activities().fetch(id, FetchMode::Cached).await.expect("activity");
    }

    assert_eq!(context.activities().keys(), vec!["a2".to_string(), "a3".to_string()]);
    mock.assert_all().await;
}

#[tokio::test]
async fn test_sign_out_forgets_session_state() {
    let mut mock = ApiMockBuilder::new().await;
    mock.mock_authorized("GET", "/v2/users/current", "tok", &user_json("u1")).await;
    mock.mock_bytes("/v2/users/u1/avatar", 32, "image/png", &[1]).await;
    mock.mock_bytes("/v2/users/u1/avatar", 128, "image/png", &[2]).await;
    let context = mock.context(Some("tok"));

    let me = context.users().current(FetchMode::Cached).await.expect("current user");
    context.avatars().for_user(&me, FetchMode::Cached).await.expect("avatar");
    assert_eq!(context.blob_registry().live_count(), 2);

    context.sign_out();

    assert!(!context.session().is_authenticated());
    assert!(context.users().cache().is_empty());
    assert_eq!(context.blob_registry().live_count(), 0);
    mock.assert_all().await;
}
