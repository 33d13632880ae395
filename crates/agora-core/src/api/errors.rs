use crate::types::ErrorPayload;
use thiserror::Error;

/// Errors raised below the HTTP status layer: the request never produced a response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportError {
    /// Request exceeded the configured timeout duration.
    #[error("Request timeout")]
    Timeout,

    /// Failed to reach the API host.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Maximum concurrent requests limit has been reached.
    #[error("Concurrency limit reached: {0}")]
    ConcurrencyLimit(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    Build(String),
}

/// Classification of a failed request.
///
/// Each class maps to a distinct user-facing message. No class is retried
/// automatically; callers decide whether to try again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// 404: the resource does not exist.
    NotFound,
    /// 400: the server rejected the input. Its message is surfaced verbatim.
    BadRequest,
    /// 429: the caller should back off.
    RateLimited,
    /// 401: the session token is missing or expired.
    Unauthorized,
    /// 403: the session is valid but lacks permission.
    Forbidden,
    /// Transport failures, 5xx and anything unclassified.
    Failed,
}

impl FailureKind {
    /// Classifies an HTTP status code.
    #[must_use]
    pub fn from_status(status: u16) -> Self {
        match status {
            404 => Self::NotFound,
            400 => Self::BadRequest,
            429 => Self::RateLimited,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            _ => Self::Failed,
        }
    }

    /// Returns the human-readable message shown for this class.
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            Self::NotFound => "The requested resource could not be found.",
            Self::BadRequest => "The request was invalid.",
            Self::RateLimited => "Too many requests. Please try again later.",
            Self::Unauthorized => "You need to sign in to do that.",
            Self::Forbidden => "You do not have permission to do that.",
            Self::Failed => "Something went wrong. Please try again.",
        }
    }

    /// Returns a static string representation for log fields.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::BadRequest => "bad_request",
            Self::RateLimited => "rate_limited",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::Failed => "failed",
        }
    }

    #[must_use]
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::Forbidden)
    }
}

/// A hard failure: transport error, non-2xx status, or an unusable 2xx body.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct Failure {
    pub kind: FailureKind,
    /// HTTP status when a response was received.
    pub status: Option<u16>,
    pub message: String,
    /// Structured error body, when the server sent one.
    pub payload: Option<ErrorPayload>,
}

impl Failure {
    /// Builds a failure from a non-2xx response.
    ///
    /// Bad requests surface the server's own message when it provided one; every
    /// other class uses its fixed message.
    #[must_use]
    pub fn from_status(status: u16, payload: Option<ErrorPayload>) -> Self {
        let kind = FailureKind::from_status(status);
        let message = match (&kind, &payload) {
            (FailureKind::BadRequest, Some(p)) if !p.message.is_empty() => p.message.clone(),
            _ => kind.message().to_string(),
        };
        Self { kind, status: Some(status), message, payload }
    }

    #[must_use]
    pub fn from_transport(error: &TransportError) -> Self {
        tracing::trace!(error = %error, "classifying transport failure");
        Self::of(FailureKind::Failed)
    }

    /// A read that came back with no body.
    #[must_use]
    pub fn not_found() -> Self {
        Self::of(FailureKind::NotFound)
    }

    /// A 2xx body that could not be interpreted.
    #[must_use]
    pub fn invalid_response(detail: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Failed,
            status: None,
            message: FailureKind::Failed.message().to_string(),
            payload: Some(ErrorPayload::new(detail)),
        }
    }

    /// A mutation addressed to an empty id, rejected before any request is sent.
    #[must_use]
    pub fn missing_id(what: &str) -> Self {
        let mut failure = Self::of(FailureKind::BadRequest);
        failure.payload = Some(ErrorPayload::new(format!("{what} id is required")));
        failure
    }

    #[must_use]
    pub fn of(kind: FailureKind) -> Self {
        Self { kind, status: None, message: kind.message().to_string(), payload: None }
    }
}
