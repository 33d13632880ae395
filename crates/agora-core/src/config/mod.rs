//! Application configuration with layered loading.
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded in this order (later overrides earlier):
//!
//! 1. **Compiled defaults**: Hardcoded in struct `Default` implementations
//! 2. **Config file**: TOML file specified by `AGORA_CONFIG` env var
//! 3. **Environment variables**: `AGORA__*` env vars override specific fields
//!
//! # Configuration Sections
//!
//! - [`ApiConfig`]: public REST API and local proxy base URLs
//! - [`HttpClientConfig`]: concurrency and timeouts for the HTTP client
//! - [`CacheConfig`]: per-kind capacities and the eviction policy
//! - [`SessionConfig`]: session cookie attributes
//! - [`LoggingConfig`]: Log level and format
//!
//! # Example
//!
//! ```toml
//! [api]
//! base_url = "https://api.agora.example"
//! proxy_base_url = "https://agora.example"
//!
//! [cache]
//! eviction = "lru"
//! user_capacity = 50
//! ```

use crate::{api::HttpClientConfig, cache::EvictionPolicy, types::EntityKind};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

/// Upstream endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Public REST API base. Versioned paths (`/v2/...`) are appended to it.
    pub base_url: String,

    /// Origin serving the server-side proxy routes (`/api/...`).
    pub proxy_base_url: String,

    /// Request timeout in seconds. Defaults to `30`.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.earth-app.com".to_string(),
            proxy_base_url: "http://127.0.0.1:3000".to_string(),
            timeout_seconds: 30,
        }
    }
}

/// Entity cache sizing and eviction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub activity_capacity: usize,
    pub article_capacity: usize,
    pub event_capacity: usize,
    pub prompt_capacity: usize,
    pub user_capacity: usize,
    pub notification_capacity: usize,

    /// `fifo` evicts the oldest insertion; `lru` also refreshes entries on read.
    pub eviction: EvictionPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            activity_capacity: 200,
            article_capacity: 200,
            event_capacity: 200,
            prompt_capacity: 200,
            user_capacity: 100,
            notification_capacity: 200,
            eviction: EvictionPolicy::Fifo,
        }
    }
}

impl CacheConfig {
    /// Returns the configured capacity for `kind`.
    #[must_use]
    pub fn capacity_for(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Activity => self.activity_capacity,
            EntityKind::Article => self.article_capacity,
            EntityKind::Event => self.event_capacity,
            EntityKind::Prompt => self.prompt_capacity,
            EntityKind::User => self.user_capacity,
            EntityKind::Notification => self.notification_capacity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    Strict,
    None,
}

impl SameSite {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "Strict",
            Self::None => "None",
        }
    }
}

/// Attributes of the cookie that persists the session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub cookie_name: String,

    /// Cookie lifetime in seconds. Defaults to 14 days.
    pub max_age_seconds: u64,

    pub secure: bool,

    /// `none` is required when the client is embedded cross-origin.
    pub same_site: SameSite,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "session_token".to_string(),
            max_age_seconds: 14 * 24 * 60 * 60,
            secure: true,
            same_site: SameSite::Strict,
        }
    }
}

/// Application logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "trace", "debug", "info", "warn", "error"). Defaults to `"info"`.
    pub level: String,

    /// Output format: `"json"` or `"pretty"`. Defaults to `"pretty"`.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "pretty".to_string() }
    }
}

/// Root application configuration containing all subsystem settings.
///
/// Loaded with the `AGORA` prefix for environment overrides using `__` as a separator,
/// e.g. `AGORA__API__BASE_URL=https://staging.example`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub http: HttpClientConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Loads configuration from a TOML file with environment variable overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, parsed, or deserialized.
    pub fn from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config_builder = Config::builder()
            .set_default("api.base_url", defaults.api.base_url)?
            .set_default("api.proxy_base_url", defaults.api.proxy_base_url)?
            .set_default("api.timeout_seconds", defaults.api.timeout_seconds)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name(&config_path.as_ref().to_string_lossy()).required(false))
            .add_source(Environment::with_prefix("AGORA").separator("__"))
            .build()?;

        config_builder.try_deserialize()
    }

    /// Loads configuration from `config/config.toml` with fallback to defaults.
    ///
    /// The config file path can be overridden using the `AGORA_CONFIG` environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration cannot be loaded or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("AGORA_CONFIG").unwrap_or_else(|_| "config/config.toml".to_string());
        Self::from_file(&config_path)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_seconds)
    }

    /// Validates the configuration for correctness and consistency.
    ///
    /// # Errors
    ///
    /// Returns a descriptive error string if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        for (name, url) in
            [("api.base_url", &self.api.base_url), ("api.proxy_base_url", &self.api.proxy_base_url)]
        {
            if url.is_empty() {
                return Err(format!("Empty URL for {name}"));
            }
            match url::Url::parse(url) {
                Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
                _ => return Err(format!("Invalid URL for {name}: {url}")),
            }
        }

        if self.api.timeout_seconds == 0 {
            return Err("API timeout must be greater than 0".to_string());
        }

        if self.http.concurrent_limit == 0 {
            return Err("HTTP concurrent limit must be greater than 0".to_string());
        }

        for kind in [
            EntityKind::Activity,
            EntityKind::Article,
            EntityKind::Event,
            EntityKind::Prompt,
            EntityKind::User,
            EntityKind::Notification,
        ] {
            if self.cache.capacity_for(kind) == 0 {
                return Err(format!("Cache capacity for {kind} must be greater than 0"));
            }
        }

        if self.session.cookie_name.is_empty() {
            return Err("Session cookie name cannot be empty".to_string());
        }

        if self.session.same_site == SameSite::None && !self.session.secure {
            return Err("SameSite=None session cookies must be secure".to_string());
        }

        if !["json", "pretty"].contains(&self.logging.format.as_str()) {
            return Err("Logging format must be 'json' or 'pretty'".to_string());
        }

        Ok(())
    }
}
