use serde::de::{DeserializeOwned, Error as _};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{ProviderError, ProviderErrorKind, ProviderId, ValidationError};

/// Uniform result of every provider capability call.
///
/// Exactly one of `data` and `error` is present, matching `success`. The
/// internal representation makes the other combinations unrepresentable, and
/// deserialization rejects them.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope<T> {
    outcome: Outcome<T>,
}

#[derive(Debug, Clone, PartialEq)]
enum Outcome<T> {
    Success(T),
    Failure(EnvelopeError),
}

impl<T> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            outcome: Outcome::Success(data),
        }
    }

    pub fn failure(error: EnvelopeError) -> Self {
        Self {
            outcome: Outcome::Failure(error),
        }
    }

    pub const fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success(_))
    }

    /// Payload of a successful call; `None` on failure.
    pub fn data(&self) -> Option<&T> {
        match &self.outcome {
            Outcome::Success(data) => Some(data),
            Outcome::Failure(_) => None,
        }
    }

    /// Error of a failed call; `None` on success.
    pub fn error(&self) -> Option<&EnvelopeError> {
        match &self.outcome {
            Outcome::Success(_) => None,
            Outcome::Failure(error) => Some(error),
        }
    }

    pub fn into_result(self) -> Result<T, EnvelopeError> {
        match self.outcome {
            Outcome::Success(data) => Ok(data),
            Outcome::Failure(error) => Err(error),
        }
    }

    pub fn into_data(self) -> Option<T> {
        self.into_result().ok()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        match self.outcome {
            Outcome::Success(data) => Envelope::success(f(data)),
            Outcome::Failure(error) => Envelope::failure(error),
        }
    }
}

impl<T> From<Result<T, EnvelopeError>> for Envelope<T> {
    fn from(value: Result<T, EnvelopeError>) -> Self {
        match value {
            Ok(data) => Self::success(data),
            Err(error) => Self::failure(error),
        }
    }
}

impl<T: Serialize> Serialize for Envelope<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Envelope", 3)?;
        state.serialize_field("success", &self.is_success())?;
        state.serialize_field("data", &self.data())?;
        state.serialize_field("error", &self.error())?;
        state.end()
    }
}

#[derive(Deserialize)]
struct RawEnvelope {
    success: bool,
    #[serde(default)]
    data: serde_json::Value,
    #[serde(default)]
    error: Option<EnvelopeError>,
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Envelope<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawEnvelope::deserialize(deserializer)?;
        match (raw.success, raw.error) {
            (true, None) => T::deserialize(raw.data)
                .map(Self::success)
                .map_err(D::Error::custom),
            (false, Some(error)) if raw.data.is_null() => Ok(Self::failure(error)),
            _ => Err(D::Error::custom(ValidationError::InconsistentEnvelope)),
        }
    }
}

/// Structured error carried by a failed envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeError {
    pub kind: ProviderErrorKind,
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub retryable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ProviderId>,
}

impl EnvelopeError {
    pub fn from_provider_error(error: &ProviderError, source: Option<ProviderId>) -> Self {
        Self {
            kind: error.kind(),
            code: error.code().to_owned(),
            message: error.message().to_owned(),
            retryable: error.retryable(),
            source,
        }
    }
}

impl From<ProviderError> for EnvelopeError {
    fn from(error: ProviderError) -> Self {
        Self::from_provider_error(&error, None)
    }
}
