//! Tagged results returned by every network operation.

use crate::{api::Failure, types::ErrorPayload};
use serde::Serialize;

/// Result of a single API operation.
///
/// Both failure variants carry enough to render a message; only `Success` data may
/// be treated as the happy-path type.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// 2xx with a usable body. `None` for writes that returned no body.
    Success(Option<T>),
    /// 2xx whose body encodes an application error.
    SoftError(ErrorPayload),
    /// Transport failure, non-2xx status, or unusable body.
    HardError(Failure),
}

impl<T> Outcome<T> {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns the data on success, discarding failures.
    #[must_use]
    pub fn data(self) -> Option<T> {
        match self {
            Self::Success(data) => data,
            Self::SoftError(_) | Self::HardError(_) => None,
        }
    }

    #[must_use]
    pub fn as_data(&self) -> Option<&T> {
        match self {
            Self::Success(data) => data.as_ref(),
            Self::SoftError(_) | Self::HardError(_) => None,
        }
    }

    #[must_use]
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Self::HardError(failure) => Some(failure),
            Self::Success(_) | Self::SoftError(_) => None,
        }
    }

    /// User-facing message for either failure variant.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::SoftError(payload) => Some(&payload.message),
            Self::HardError(failure) => Some(&failure.message),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Success(data) => Outcome::Success(data.map(f)),
            Self::SoftError(payload) => Outcome::SoftError(payload),
            Self::HardError(failure) => Outcome::HardError(failure),
        }
    }

    /// Re-types a failure. Successes become `Success(None)`.
    #[must_use]
    pub fn discard<U>(self) -> Outcome<U> {
        match self {
            Self::Success(_) => Outcome::Success(None),
            Self::SoftError(payload) => Outcome::SoftError(payload),
            Self::HardError(failure) => Outcome::HardError(failure),
        }
    }

    #[must_use]
    pub fn into_envelope(self) -> Envelope<T> {
        match self {
            Self::Success(data) => {
                Envelope { success: true, data: data.map(EnvelopeData::Value), message: None }
            }
            Self::SoftError(payload) => Envelope {
                success: false,
                message: Some(payload.message.clone()),
                data: Some(EnvelopeData::Error(payload)),
            },
            Self::HardError(failure) => Envelope {
                success: false,
                message: Some(failure.message),
                data: failure.payload.map(EnvelopeData::Error),
            },
        }
    }
}

impl<T> From<Failure> for Outcome<T> {
    fn from(failure: Failure) -> Self {
        Self::HardError(failure)
    }
}

/// Serializable `{ success, data?, message? }` view of an [`Outcome`] for UI code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<EnvelopeData<T>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EnvelopeData<T> {
    Value(T),
    Error(ErrorPayload),
}
