//! Builder wiring the executor, session and every store from one configuration.

use crate::{
    api::{HttpClient, HttpClientConfig, RequestExecutor, Transport, TransportError},
    cache::{BlobRegistry, EntityCache},
    config::{AppConfig, CacheConfig},
    session::{SessionStore, TokenProvider},
    stores::{AvatarStore, CloudClient, EventStore, FriendsStore, NotificationStore, UserStore},
    types::{Activity, Article, Entity, EntityKind, Notification, Prompt, User},
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use super::AgoraContext;

/// Errors that can occur while building an [`AgoraContext`].
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ConfigValidation(String),

    /// The HTTP client could not be created
    #[error("Failed to initialize HTTP client: {0}")]
    Transport(#[from] TransportError),

    /// An API base URL could not be parsed
    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
}

/// Builder for an [`AgoraContext`].
///
/// # Examples
///
/// ```no_run
/// # use agora_core::{config::AppConfig, runtime::AgoraContextBuilder};
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let context = AgoraContextBuilder::new()
///     .with_config(AppConfig::load()?)
///     .with_token("session-token")
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct AgoraContextBuilder {
    config: Option<AppConfig>,
    transport: Option<Arc<dyn Transport>>,
    token: Option<String>,
}

impl AgoraContextBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Replaces the reqwest-backed client, e.g. with an in-memory transport.
    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Seeds the session, e.g. with a token read from the session cookie.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Builds every store and links the derived collections to their parents.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] if the configuration is missing or invalid, or the
    /// HTTP client cannot be created.
    pub fn build(self) -> Result<AgoraContext, RuntimeError> {
        let config = self.config.ok_or_else(|| {
            RuntimeError::ConfigValidation("No configuration provided".to_string())
        })?;
        config.validate().map_err(RuntimeError::ConfigValidation)?;

        info!(
            api = %config.api.base_url,
            proxy = %config.api.proxy_base_url,
            eviction = ?config.cache.eviction,
            custom_transport = self.transport.is_some(),
            "Initializing Agora context"
        );

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => {
                let http = HttpClientConfig {
                    request_timeout_seconds: config.api.timeout_seconds,
                    ..config.http.clone()
                };
                Arc::new(HttpClient::with_config(http)?)
            }
        };
        let executor = Arc::new(RequestExecutor::new(transport, &config.api)?);
        debug!("Request executor initialized");

        let session = Arc::new(SessionStore::new(&config.session));
        if let Some(token) = self.token {
            session.set_token(Some(token));
        }
        let provider: Arc<dyn TokenProvider> = session.clone();
        let registry = Arc::new(BlobRegistry::new());

        let entity_cache = EntityCacheFactory { executor: &executor, session: &provider, config: &config.cache };
        let activities = entity_cache.build::<Activity>();
        let articles = entity_cache.build::<Article>();
        let prompts = entity_cache.build::<Prompt>();
        let users = Arc::new(UserStore::new(entity_cache.build::<User>()));
        let notifications =
            Arc::new(NotificationStore::new(users.clone(), entity_cache.build::<Notification>()));
        let events = Arc::new(EventStore::new(
            executor.clone(),
            provider.clone(),
            registry.clone(),
            config.cache.capacity_for(EntityKind::Event),
            config.cache.eviction,
        ));
        debug!(capacity = events.cache().capacity(), "Event store initialized");

        let friends = Arc::new(FriendsStore::new(users.clone()));
        let avatars =
            Arc::new(AvatarStore::new(executor.clone(), provider.clone(), registry.clone()));
        let cloud = Arc::new(CloudClient::new(executor.clone(), provider));

        info!("Agora context initialization complete");

        Ok(AgoraContext {
            config,
            executor,
            session,
            registry,
            activities,
            articles,
            prompts,
            events,
            users,
            friends,
            notifications,
            avatars,
            cloud,
        })
    }
}

struct EntityCacheFactory<'a> {
    executor: &'a Arc<RequestExecutor>,
    session: &'a Arc<dyn TokenProvider>,
    config: &'a CacheConfig,
}

impl EntityCacheFactory<'_> {
    fn build<T: Entity>(&self) -> Arc<EntityCache<T>> {
        let capacity = self.config.capacity_for(T::KIND);
        debug!(kind = %T::KIND, capacity, "Entity cache initialized");
        Arc::new(EntityCache::new(
            self.executor.clone(),
            self.session.clone(),
            capacity,
            self.config.eviction,
        ))
    }
}
