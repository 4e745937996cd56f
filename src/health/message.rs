//! # Heartbeat Records
//!
//! The wire record exchanged between heartbeat publishers and monitors,
//! together with its builder and parser.
//!
//! ```json
//! {"messageId":"hc-1700000000000000000-9f86d081884c7d65",
//!  "timestamp":"2024-01-01T00:00:00Z","source":"orders-service",
//!  "eventBusType":"kafka","version":"2.0.0","metadata":{"checkType":"periodic"}}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::constants::{defaults, HEARTBEAT_SCHEMA_VERSION};

pub const METADATA_CHECK_TYPE: &str = "checkType";
pub const METADATA_INSTANCE_ID: &str = "instanceId";
pub const METADATA_ENVIRONMENT: &str = "environment";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HeartbeatError {
    #[error("{field} is required")]
    MissingField { field: &'static str },

    #[error("heartbeat is too old: {age_ms}ms")]
    TooOld { age_ms: i64 },

    #[error("heartbeat timestamp is {skew_ms}ms in the future")]
    FromFuture { skew_ms: i64 },

    #[error("failed to serialize heartbeat: {message}")]
    Serialization { message: String },

    #[error("failed to unmarshal heartbeat: {message}")]
    Deserialization { message: String },
}

/// One heartbeat emission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatRecord {
    #[serde(default)]
    pub message_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub event_bus_type: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl HeartbeatRecord {
    pub fn new(source: impl Into<String>, event_bus_type: impl Into<String>) -> Self {
        let timestamp = Utc::now();
        Self {
            message_id: generate_message_id(timestamp),
            timestamp,
            source: source.into(),
            event_bus_type: event_bus_type.into(),
            version: HEARTBEAT_SCHEMA_VERSION.to_string(),
            metadata: HashMap::new(),
        }
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Required fields present and timestamp within the default skew window
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), HeartbeatError> {
        self.validate_window(now, defaults::MAX_FUTURE_SKEW, defaults::MAX_MESSAGE_AGE)
    }

    /// Required fields present and timestamp within `[now - max_age, now + max_future_skew]`
    pub fn validate_window(
        &self,
        now: DateTime<Utc>,
        max_future_skew: Duration,
        max_age: Duration,
    ) -> Result<(), HeartbeatError> {
        for (field, value) in [
            ("messageId", &self.message_id),
            ("source", &self.source),
            ("eventBusType", &self.event_bus_type),
            ("version", &self.version),
        ] {
            if value.trim().is_empty() {
                return Err(HeartbeatError::MissingField { field });
            }
        }

        let offset_ms = (self.timestamp - now).num_milliseconds();
        if offset_ms > duration_ms(max_future_skew) {
            return Err(HeartbeatError::FromFuture { skew_ms: offset_ms });
        }
        if -offset_ms > duration_ms(max_age) {
            return Err(HeartbeatError::TooOld { age_ms: -offset_ms });
        }

        Ok(())
    }

    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.validate(now).is_ok()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, HeartbeatError> {
        serde_json::to_vec(self).map_err(|e| HeartbeatError::Serialization {
            message: e.to_string(),
        })
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, HeartbeatError> {
        serde_json::from_slice(data).map_err(|e| HeartbeatError::Deserialization {
            message: e.to_string(),
        })
    }
}

fn duration_ms(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

/// `hc-<unix nanos>-<16 hex chars>`
fn generate_message_id(timestamp: DateTime<Utc>) -> String {
    let nanos = timestamp
        .timestamp_nanos_opt()
        .unwrap_or_else(|| timestamp.timestamp_micros() * 1_000);
    let random = Uuid::new_v4().simple().to_string();
    format!("hc-{nanos}-{}", &random[..16])
}

/// Fluent construction of heartbeat records
#[derive(Debug, Clone)]
pub struct HeartbeatRecordBuilder {
    record: HeartbeatRecord,
}

impl HeartbeatRecordBuilder {
    pub fn new(source: impl Into<String>, event_bus_type: impl Into<String>) -> Self {
        Self {
            record: HeartbeatRecord::new(source, event_bus_type),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.record.set_metadata(key, value);
        self
    }

    pub fn with_check_type(self, check_type: impl Into<String>) -> Self {
        self.with_metadata(METADATA_CHECK_TYPE, check_type)
    }

    pub fn with_instance_id(self, instance_id: impl Into<String>) -> Self {
        self.with_metadata(METADATA_INSTANCE_ID, instance_id)
    }

    pub fn with_environment(self, environment: impl Into<String>) -> Self {
        self.with_metadata(METADATA_ENVIRONMENT, environment)
    }

    pub fn build(self) -> HeartbeatRecord {
        self.record
    }
}

/// Decodes heartbeat records, optionally enforcing the skew window
#[derive(Debug, Clone)]
pub struct HeartbeatParser {
    max_future_skew: Duration,
    max_age: Duration,
}

impl Default for HeartbeatParser {
    fn default() -> Self {
        Self {
            max_future_skew: defaults::MAX_FUTURE_SKEW,
            max_age: defaults::MAX_MESSAGE_AGE,
        }
    }
}

impl HeartbeatParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Decode and validate against the current time
    pub fn parse(&self, data: &[u8]) -> Result<HeartbeatRecord, HeartbeatError> {
        let record = HeartbeatRecord::from_bytes(data)?;
        record.validate_window(Utc::now(), self.max_future_skew, self.max_age)?;
        Ok(record)
    }

    /// Decode without any field or window checks
    pub fn parse_unchecked(&self, data: &[u8]) -> Result<HeartbeatRecord, HeartbeatError> {
        HeartbeatRecord::from_bytes(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[test]
    fn test_message_id_format() {
        let record = HeartbeatRecord::new("orders-service", "kafka");
        let parts: Vec<&str> = record.message_id.splitn(3, '-').collect();
        assert_eq!(parts[0], "hc");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 16);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(
            record.message_id,
            HeartbeatRecord::new("orders-service", "kafka").message_id
        );
    }

    #[test]
    fn test_wire_format() {
        let record = HeartbeatRecordBuilder::new("orders-service", "nats")
            .with_check_type("periodic")
            .build();
        let json: serde_json::Value = serde_json::from_slice(&record.to_bytes().unwrap()).unwrap();

        assert_eq!(json["source"], "orders-service");
        assert_eq!(json["eventBusType"], "nats");
        assert_eq!(json["version"], "2.0.0");
        assert_eq!(json["metadata"]["checkType"], "periodic");
        assert!(json["messageId"].as_str().unwrap().starts_with("hc-"));
    }

    #[test]
    fn test_skew_window() {
        let now = Utc::now();
        let mut record = HeartbeatRecord::new("svc", "memory");

        record.timestamp = now + ChronoDuration::seconds(30);
        assert!(record.is_valid(now));

        record.timestamp = now + ChronoDuration::seconds(61);
        assert!(matches!(
            record.validate(now),
            Err(HeartbeatError::FromFuture { .. })
        ));

        record.timestamp = now - ChronoDuration::minutes(4);
        assert!(record.is_valid(now));

        record.timestamp = now - ChronoDuration::minutes(6);
        assert!(matches!(
            record.validate(now),
            Err(HeartbeatError::TooOld { .. })
        ));
    }

    #[test]
    fn test_required_fields() {
        let now = Utc::now();
        let mut record = HeartbeatRecord::new("svc", "memory");
        record.version.clear();
        assert_eq!(
            record.validate(now),
            Err(HeartbeatError::MissingField { field: "version" })
        );

        let mut record = HeartbeatRecord::new("", "memory");
        record.message_id = "hc-1".to_string();
        assert_eq!(
            record.validate(now),
            Err(HeartbeatError::MissingField { field: "source" })
        );
    }

    #[test]
    fn test_parser_modes() {
        let mut stale = HeartbeatRecordBuilder::new("svc", "memory")
            .with_instance_id("svc-1")
            .with_environment("test")
            .build();
        stale.timestamp = Utc::now() - ChronoDuration::hours(1);
        let bytes = stale.to_bytes().unwrap();

        let parser = HeartbeatParser::new();
        assert!(parser.parse(&bytes).is_err());

        let parsed = parser.parse_unchecked(&bytes).unwrap();
        assert_eq!(parsed.metadata(METADATA_INSTANCE_ID), Some("svc-1"));
        assert_eq!(parsed.metadata(METADATA_ENVIRONMENT), Some("test"));

        let lenient = HeartbeatParser::new().with_max_age(Duration::from_secs(2 * 60 * 60));
        assert!(lenient.parse(&bytes).is_ok());

        assert!(matches!(
            parser.parse(b"{}"),
            Err(HeartbeatError::Deserialization { .. })
        ));
    }
}
