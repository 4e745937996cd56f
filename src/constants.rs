//! # System Constants
//!
//! Wire-level names and operational defaults shared by the heartbeat,
//! topic reconciliation, and routing subsystems.
//!
//! Values here are part of the external contract with other services on the
//! bus (topic names, header keys, schema versions), so changing them is a
//! breaking change for every peer.

use std::time::Duration;

/// Heartbeat topic names
pub mod topics {
    /// Topic used when the transport type is unknown
    pub const DEFAULT_HEALTH_CHECK_TOPIC: &str = "jxt-core-health-check";
    pub const KAFKA_HEALTH_CHECK_TOPIC: &str = "jxt-core-kafka-health-check";
    pub const NATS_HEALTH_CHECK_TOPIC: &str = "jxt-core-nats-health-check";
    pub const MEMORY_HEALTH_CHECK_TOPIC: &str = "jxt-core-memory-health-check";
}

/// Aggregate identity headers, checked in this order
pub const AGGREGATE_ID_HEADERS: [&str; 4] = [
    "X-Aggregate-ID",
    "x-aggregate-id",
    "Aggregate-ID",
    "aggregate-id",
];

/// Heartbeat schema version carried in every record
pub const HEARTBEAT_SCHEMA_VERSION: &str = "2.0.0";

/// Alert type raised when heartbeats stop arriving
pub const ALERT_NO_MESSAGES: &str = "no_messages";

/// Known transport identifiers
pub mod transports {
    pub const KAFKA: &str = "kafka";
    pub const NATS: &str = "nats";
    pub const MEMORY: &str = "memory";

    pub const ALL: [&str; 3] = [KAFKA, NATS, MEMORY];
}

/// Operational defaults
pub mod defaults {
    use super::Duration;

    pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(120);
    pub const HEARTBEAT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(10);
    pub const HEARTBEAT_FAILURE_THRESHOLD: u32 = 3;
    pub const CALLBACK_TIMEOUT: Duration = Duration::from_secs(5);

    pub const MONITOR_INTERVAL: Duration = Duration::from_secs(30);
    pub const MIN_MONITOR_INTERVAL: Duration = Duration::from_millis(100);
    pub const WARNING_THRESHOLD: u32 = 3;
    pub const ERROR_THRESHOLD: u32 = 5;
    pub const CRITICAL_THRESHOLD: u32 = 10;

    /// Accepted clock skew for heartbeats stamped in the future
    pub const MAX_FUTURE_SKEW: Duration = Duration::from_secs(60);
    /// Oldest heartbeat still counted as a live signal
    pub const MAX_MESSAGE_AGE: Duration = Duration::from_secs(5 * 60);

    pub const TOPIC_SYNC_TIMEOUT: Duration = Duration::from_secs(30);
    /// Retention differences under this are treated as broker rounding noise
    pub const RETENTION_TOLERANCE: Duration = Duration::from_secs(1);
}

/// Identity and topic grammar limits
pub mod limits {
    pub const MAX_AGGREGATE_ID_LENGTH: usize = 256;
    pub const MAX_TOPIC_NAME_LENGTH: usize = 255;
    pub const MAX_PARTITIONS: u32 = 100;
    pub const MAX_REPLICATION_FACTOR: u32 = 5;
}

/// Resolve the heartbeat topic for a transport type
pub fn health_check_topic(event_bus_type: &str) -> &'static str {
    match event_bus_type {
        transports::KAFKA => topics::KAFKA_HEALTH_CHECK_TOPIC,
        transports::NATS => topics::NATS_HEALTH_CHECK_TOPIC,
        transports::MEMORY => topics::MEMORY_HEALTH_CHECK_TOPIC,
        _ => topics::DEFAULT_HEALTH_CHECK_TOPIC,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_check_topic_per_transport() {
        assert_eq!(health_check_topic("kafka"), "jxt-core-kafka-health-check");
        assert_eq!(health_check_topic("nats"), "jxt-core-nats-health-check");
        assert_eq!(health_check_topic("memory"), "jxt-core-memory-health-check");
        assert_eq!(health_check_topic("rabbitmq"), "jxt-core-health-check");
    }

    #[test]
    fn test_default_thresholds_ascend() {
        assert!(defaults::WARNING_THRESHOLD < defaults::ERROR_THRESHOLD);
        assert!(defaults::ERROR_THRESHOLD < defaults::CRITICAL_THRESHOLD);
        assert!(defaults::MONITOR_INTERVAL < defaults::HEARTBEAT_INTERVAL);
    }
}
