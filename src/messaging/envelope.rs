//! # Domain Event Envelope
//!
//! Uniform wrapper for domain events placed on the bus. The envelope carries
//! the aggregate identity that drives ordered routing, so an envelope is
//! validated before it is ever serialized: an invalid envelope never reaches
//! the wire.
//!
//! The payload is opaque to this layer but must itself be a JSON document; it
//! is embedded verbatim in the envelope's `payload` field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use super::errors::MessagingError;
use super::transport::Publisher;
use crate::validation::{validate_aggregate_id, IdentityError};

/// Envelope validation and codec errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EnvelopeError {
    #[error("{field} is required")]
    MissingField { field: &'static str },

    #[error("event_version must be positive, got {version}")]
    InvalidVersion { version: i64 },

    #[error("invalid aggregate_id: {0}")]
    InvalidAggregateId(#[from] IdentityError),

    #[error("failed to serialize envelope: {message}")]
    Serialization { message: String },

    #[error("failed to unmarshal envelope: {message}")]
    Deserialization { message: String },

    #[error("failed to publish envelope: {0}")]
    Transport(#[from] MessagingError),
}

impl EnvelopeError {
    /// Name of the envelope field that failed validation, if any
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::MissingField { field } => Some(*field),
            Self::InvalidVersion { .. } => Some("event_version"),
            Self::InvalidAggregateId(_) => Some("aggregate_id"),
            _ => None,
        }
    }
}

/// Domain event envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub event_id: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub event_version: i64,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(with = "raw_json")]
    pub payload: Vec<u8>,
}

impl Envelope {
    /// Create an envelope with a caller-supplied event id
    pub fn new(
        event_id: impl Into<String>,
        aggregate_id: impl Into<String>,
        event_type: impl Into<String>,
        event_version: i64,
        payload: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            aggregate_id: aggregate_id.into(),
            event_type: event_type.into(),
            event_version,
            timestamp: Utc::now(),
            trace_id: None,
            correlation_id: None,
            tenant_id: None,
            payload: payload.into(),
        }
    }

    /// Create an envelope whose event id is derived from its identity fields
    pub fn with_auto_id(
        aggregate_id: impl Into<String>,
        event_type: impl Into<String>,
        event_version: i64,
        payload: impl Into<Vec<u8>>,
    ) -> Self {
        let mut envelope = Self::new(String::new(), aggregate_id, event_type, event_version, payload);
        envelope.event_id = derive_event_id(
            &envelope.aggregate_id,
            &envelope.event_type,
            envelope.event_version,
            envelope.timestamp,
        );
        envelope
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn with_tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Validate required fields and the aggregate identity grammar
    pub fn validate(&self) -> Result<(), EnvelopeError> {
        if self.event_id.trim().is_empty() {
            return Err(EnvelopeError::MissingField { field: "event_id" });
        }
        if self.aggregate_id.trim().is_empty() {
            return Err(EnvelopeError::MissingField {
                field: "aggregate_id",
            });
        }
        if self.event_type.trim().is_empty() {
            return Err(EnvelopeError::MissingField { field: "event_type" });
        }
        if self.event_version <= 0 {
            return Err(EnvelopeError::InvalidVersion {
                version: self.event_version,
            });
        }
        if self.payload.is_empty() {
            return Err(EnvelopeError::MissingField { field: "payload" });
        }

        validate_aggregate_id(&self.aggregate_id)?;
        Ok(())
    }

    /// Validate, then serialize to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, EnvelopeError> {
        self.validate()?;
        serde_json::to_vec(self).map_err(|e| EnvelopeError::Serialization {
            message: e.to_string(),
        })
    }

    /// Deserialize from JSON bytes, rejecting envelopes that fail validation
    pub fn from_bytes(data: &[u8]) -> Result<Self, EnvelopeError> {
        let envelope: Envelope =
            serde_json::from_slice(data).map_err(|e| EnvelopeError::Deserialization {
                message: e.to_string(),
            })?;
        envelope.validate()?;
        Ok(envelope)
    }
}

/// Derive an event id from the envelope identity plus a time-ordered UUIDv7
pub fn derive_event_id(
    aggregate_id: &str,
    event_type: &str,
    event_version: i64,
    timestamp: DateTime<Utc>,
) -> String {
    let sequence = Uuid::now_v7().simple();
    let nanos = timestamp
        .timestamp_nanos_opt()
        .unwrap_or_else(|| timestamp.timestamp_micros() * 1_000);
    format!("{aggregate_id}:{event_type}:v{event_version}:{nanos}-{sequence}")
}

/// Validate and publish an envelope; invalid envelopes are never sent
pub async fn publish_envelope(
    publisher: &dyn Publisher,
    topic: &str,
    envelope: &Envelope,
) -> Result<(), EnvelopeError> {
    let bytes = envelope.to_bytes()?;
    publisher.publish(topic, &bytes).await?;

    debug!(
        topic = %topic,
        event_id = %envelope.event_id,
        aggregate_id = %envelope.aggregate_id,
        event_type = %envelope.event_type,
        "📤 Envelope published"
    );
    Ok(())
}

/// Embed payload bytes verbatim as a raw JSON document
mod raw_json {
    use serde::de::Error as _;
    use serde::ser::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::value::RawValue;

    pub fn serialize<S>(payload: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let text = std::str::from_utf8(payload)
            .map_err(|e| S::Error::custom(format!("payload is not valid UTF-8: {e}")))?;
        let raw: &RawValue = serde_json::from_str(text)
            .map_err(|e| S::Error::custom(format!("payload is not valid JSON: {e}")))?;
        raw.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Box::<RawValue>::deserialize(deserializer)?;
        if raw.get() == "null" {
            return Ok(Vec::new());
        }
        Ok(raw.get().as_bytes().to_vec())
    }
}
