//! Bearer token storage and the cookie that persists it.

use crate::config::SessionConfig;
use arc_swap::ArcSwapOption;
use std::sync::Arc;
use tracing::debug;

/// Supplies the bearer token attached to API requests.
///
/// Token acquisition and refresh live outside the data layer; stores only read the
/// current value and clear it when the server rejects it.
pub trait TokenProvider: Send + Sync {
    fn token(&self) -> Option<String>;

    fn set_token(&self, token: Option<String>);
}

/// In-memory token holder. Reads are lock-free.
#[derive(Debug, Default)]
pub struct SessionStore {
    token: ArcSwapOption<String>,
    cookie: SessionCookie,
}

impl SessionStore {
    #[must_use]
    pub fn new(config: &SessionConfig) -> Self {
        Self { token: ArcSwapOption::empty(), cookie: SessionCookie::new(config.clone()) }
    }

    #[must_use]
    pub fn with_token(self, token: impl Into<String>) -> Self {
        self.token.store(Some(Arc::new(token.into())));
        self
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token.load().is_some()
    }

    /// `Set-Cookie` header value reflecting the current token.
    #[must_use]
    pub fn cookie_header(&self) -> String {
        match self.token.load_full() {
            Some(token) => self.cookie.set_header(&token),
            None => self.cookie.clear_header(),
        }
    }
}

impl TokenProvider for SessionStore {
    fn token(&self) -> Option<String> {
        self.token.load_full().map(|token| token.as_ref().clone())
    }

    fn set_token(&self, token: Option<String>) {
        debug!(present = token.is_some(), "session token updated");
        self.token.store(token.map(Arc::new));
    }
}

/// Renders the session cookie.
///
/// Client code reads the token back, so the cookie is never `HttpOnly`.
#[derive(Debug, Clone, Default)]
pub struct SessionCookie {
    config: SessionConfig,
}

impl SessionCookie {
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn set_header(&self, token: &str) -> String {
        self.render(token, self.config.max_age_seconds)
    }

    #[must_use]
    pub fn clear_header(&self) -> String {
        self.render("", 0)
    }

    fn render(&self, value: &str, max_age: u64) -> String {
        let mut header =
            format!("{}={value}; Max-Age={max_age}; Path=/", self.config.cookie_name);
        if self.config.secure {
            header.push_str("; Secure");
        }
        header.push_str("; SameSite=");
        header.push_str(self.config.same_site.as_str());
        header
    }

    /// Extracts the session token from a `Cookie` request header.
    #[must_use]
    pub fn parse(&self, cookie_header: &str) -> Option<String> {
        cookie_header.split(';').find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == self.config.cookie_name && !value.is_empty()).then(|| value.to_string())
        })
    }
}
