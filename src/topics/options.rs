//! # Topic Options
//!
//! Desired per-topic configuration and the presets used by the topic
//! builder. Serialized with camelCase keys and retention in milliseconds so
//! the same document can be exchanged with peers on other transports.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

const MIB: i64 = 1024 * 1024;
const HOUR: Duration = Duration::from_secs(60 * 60);
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Storage mode of a topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PersistenceMode {
    /// Durable storage (Kafka log, JetStream stream)
    Persistent,
    /// Fire-and-forget delivery with no retained history
    Ephemeral,
    /// Follow the transport's global persistence setting
    #[default]
    Auto,
}

impl PersistenceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Persistent => "persistent",
            Self::Ephemeral => "ephemeral",
            Self::Auto => "auto",
        }
    }

    /// Resolve `Auto` against the transport's global persistence setting
    pub fn is_persistent(&self, transport_default: bool) -> bool {
        match self {
            Self::Persistent => true,
            Self::Ephemeral => false,
            Self::Auto => transport_default,
        }
    }
}

impl fmt::Display for PersistenceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PersistenceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "persistent" => Ok(Self::Persistent),
            "ephemeral" => Ok(Self::Ephemeral),
            "auto" => Ok(Self::Auto),
            other => Err(format!("unknown persistence mode: {other}")),
        }
    }
}

/// Desired configuration of a topic
///
/// Zero-valued numeric fields mean "unspecified" and are never compared
/// against the broker's actual configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TopicOptions {
    pub persistence_mode: PersistenceMode,
    #[serde(with = "duration_ms")]
    pub retention_time: Duration,
    #[serde(rename = "maxSize")]
    pub max_size_bytes: i64,
    pub max_messages: i64,
    pub partitions: u32,
    pub replication_factor: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl Default for TopicOptions {
    fn default() -> Self {
        Self {
            persistence_mode: PersistenceMode::Auto,
            retention_time: DAY,
            max_size_bytes: 100 * MIB,
            max_messages: 10_000,
            partitions: 0,
            replication_factor: 1,
            description: String::new(),
        }
    }
}

impl TopicOptions {
    /// Preset for traffic above roughly 1000 msg/s
    pub fn high_throughput() -> Self {
        Self {
            persistence_mode: PersistenceMode::Persistent,
            retention_time: 7 * DAY,
            max_size_bytes: 1024 * MIB,
            max_messages: 1_000_000,
            partitions: 10,
            replication_factor: 3,
            description: "high throughput topic".to_string(),
        }
    }

    /// Preset for traffic between roughly 100 and 1000 msg/s
    pub fn medium_throughput() -> Self {
        Self {
            persistence_mode: PersistenceMode::Persistent,
            retention_time: 3 * DAY,
            max_size_bytes: 500 * MIB,
            max_messages: 500_000,
            partitions: 5,
            replication_factor: 3,
            description: "medium throughput topic".to_string(),
        }
    }

    /// Preset for traffic below roughly 100 msg/s
    pub fn low_throughput() -> Self {
        Self {
            persistence_mode: PersistenceMode::Persistent,
            retention_time: DAY,
            max_size_bytes: 100 * MIB,
            max_messages: 100_000,
            partitions: 3,
            replication_factor: 3,
            description: "low throughput topic".to_string(),
        }
    }

    /// Short-lived ephemeral topic, mostly for tests and scratch streams
    pub fn ephemeral() -> Self {
        Self {
            persistence_mode: PersistenceMode::Ephemeral,
            retention_time: HOUR,
            ..Self::default()
        }
    }

    pub fn is_persistent(&self, transport_default: bool) -> bool {
        self.persistence_mode.is_persistent(transport_default)
    }
}

/// Serialize a `Duration` as integer milliseconds
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = TopicOptions::default();
        assert_eq!(options.persistence_mode, PersistenceMode::Auto);
        assert_eq!(options.retention_time, Duration::from_secs(86_400));
        assert_eq!(options.max_size_bytes, 100 * 1024 * 1024);
        assert_eq!(options.max_messages, 10_000);
        assert_eq!(options.replication_factor, 1);
    }

    #[test]
    fn test_throughput_presets_scale() {
        let high = TopicOptions::high_throughput();
        let medium = TopicOptions::medium_throughput();
        let low = TopicOptions::low_throughput();

        assert_eq!((high.partitions, medium.partitions, low.partitions), (10, 5, 3));
        assert!(high.retention_time > medium.retention_time);
        assert!(medium.max_size_bytes > low.max_size_bytes);
        assert!(high.is_persistent(false));
    }

    #[test]
    fn test_wire_format_uses_camel_case_and_millis() {
        let options = TopicOptions {
            retention_time: Duration::from_secs(2),
            description: "orders".to_string(),
            ..TopicOptions::default()
        };
        let json = serde_json::to_value(&options).unwrap();

        assert_eq!(json["persistenceMode"], "auto");
        assert_eq!(json["retentionTime"], 2000);
        assert_eq!(json["maxSize"], 100 * 1024 * 1024);
        assert_eq!(json["maxMessages"], 10_000);
        assert_eq!(json["replicationFactor"], 1);
        assert_eq!(json["description"], "orders");

        let parsed: TopicOptions = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, options);
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let parsed: TopicOptions =
            serde_json::from_str(r#"{"persistenceMode":"ephemeral","partitions":4}"#).unwrap();
        assert_eq!(parsed.persistence_mode, PersistenceMode::Ephemeral);
        assert_eq!(parsed.partitions, 4);
        assert_eq!(parsed.max_messages, 10_000);
    }

    #[test]
    fn test_persistence_mode_parsing() {
        assert_eq!("Persistent".parse::<PersistenceMode>(), Ok(PersistenceMode::Persistent));
        assert!(!PersistenceMode::Auto.is_persistent(false));
        assert!(PersistenceMode::Auto.is_persistent(true));
        assert!("durable".parse::<PersistenceMode>().is_err());
    }
}
