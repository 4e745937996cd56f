//! # Control Plane Configuration
//!
//! Typed configuration for the heartbeat publisher, heartbeat monitor and
//! topic reconciler. Durations are stored as `*_ms` integers so they map
//! cleanly onto TOML/YAML files and environment variables; each section
//! exposes `Duration` accessors.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use eventbus_control::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let interval = manager.config().heartbeat.interval();
//! let topic = manager.config().monitor.topic();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{defaults, health_check_topic, transports};
use crate::topics::{MismatchAction, MismatchLogLevel, ReconcileStrategy, ReconcilerPolicy};

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

const DEFAULT_SOURCE: &str = "eventbus-control";

/// Root configuration
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ControlPlaneConfig {
    pub heartbeat: HeartbeatConfig,
    pub monitor: MonitorConfig,
    pub topics: TopicsConfig,
}

impl ControlPlaneConfig {
    /// Validate every section plus cross-section constraints
    pub fn validate(&self) -> ConfigResult<()> {
        self.heartbeat.validate()?;
        self.monitor.validate()?;
        self.topics.validate()?;

        if self.heartbeat.enabled
            && self.monitor.enabled
            && self.heartbeat.event_bus_type == self.monitor.event_bus_type
            && self.heartbeat.topic() == self.monitor.topic()
            && self.monitor.expected_interval_ms < self.heartbeat.interval_ms
        {
            return Err(ConfigurationError::invalid_value(
                "monitor.expected_interval_ms",
                self.monitor.expected_interval_ms.to_string(),
                format!(
                    "must be at least heartbeat.interval_ms ({}) or every tick will count as a miss",
                    self.heartbeat.interval_ms
                ),
            ));
        }

        Ok(())
    }
}

/// Heartbeat publisher configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    pub enabled: bool,
    /// Service name stamped on every heartbeat
    pub source: String,
    pub event_bus_type: String,
    /// Explicit topic; derived from `event_bus_type` when absent
    pub topic: Option<String>,
    pub interval_ms: u64,
    pub publish_timeout_ms: u64,
    pub failure_threshold: u32,
    pub callback_timeout_ms: u64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            source: DEFAULT_SOURCE.to_string(),
            event_bus_type: transports::MEMORY.to_string(),
            topic: None,
            interval_ms: defaults::HEARTBEAT_INTERVAL.as_millis() as u64,
            publish_timeout_ms: defaults::HEARTBEAT_PUBLISH_TIMEOUT.as_millis() as u64,
            failure_threshold: defaults::HEARTBEAT_FAILURE_THRESHOLD,
            callback_timeout_ms: defaults::CALLBACK_TIMEOUT.as_millis() as u64,
        }
    }
}

impl HeartbeatConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn publish_timeout(&self) -> Duration {
        Duration::from_millis(self.publish_timeout_ms)
    }

    pub fn callback_timeout(&self) -> Duration {
        Duration::from_millis(self.callback_timeout_ms)
    }

    /// Topic heartbeats are published on
    pub fn topic(&self) -> String {
        self.topic
            .clone()
            .unwrap_or_else(|| health_check_topic(&self.event_bus_type).to_string())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.source.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "source",
                "heartbeat",
            ));
        }
        if self.event_bus_type.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "event_bus_type",
                "heartbeat",
            ));
        }
        require_positive("heartbeat.interval_ms", self.interval_ms)?;
        require_positive("heartbeat.publish_timeout_ms", self.publish_timeout_ms)?;
        require_positive("heartbeat.callback_timeout_ms", self.callback_timeout_ms)?;
        require_positive(
            "heartbeat.failure_threshold",
            u64::from(self.failure_threshold),
        )?;
        Ok(())
    }
}

/// Heartbeat monitor configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub enabled: bool,
    /// Name of the monitoring service, carried on alerts
    pub source: String,
    pub event_bus_type: String,
    pub topic: Option<String>,
    /// Silence longer than this counts as a miss
    pub expected_interval_ms: u64,
    /// How often the miss ticker runs; floored at 100ms
    pub monitor_interval_ms: u64,
    pub warning_threshold: u32,
    pub error_threshold: u32,
    pub critical_threshold: u32,
    pub callback_timeout_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            source: DEFAULT_SOURCE.to_string(),
            event_bus_type: transports::MEMORY.to_string(),
            topic: None,
            expected_interval_ms: defaults::HEARTBEAT_INTERVAL.as_millis() as u64,
            monitor_interval_ms: defaults::MONITOR_INTERVAL.as_millis() as u64,
            warning_threshold: defaults::WARNING_THRESHOLD,
            error_threshold: defaults::ERROR_THRESHOLD,
            critical_threshold: defaults::CRITICAL_THRESHOLD,
            callback_timeout_ms: defaults::CALLBACK_TIMEOUT.as_millis() as u64,
        }
    }
}

impl MonitorConfig {
    pub fn expected_interval(&self) -> Duration {
        Duration::from_millis(self.expected_interval_ms)
    }

    /// Ticker period, never below [`defaults::MIN_MONITOR_INTERVAL`]
    pub fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.monitor_interval_ms).max(defaults::MIN_MONITOR_INTERVAL)
    }

    pub fn callback_timeout(&self) -> Duration {
        Duration::from_millis(self.callback_timeout_ms)
    }

    pub fn topic(&self) -> String {
        self.topic
            .clone()
            .unwrap_or_else(|| health_check_topic(&self.event_bus_type).to_string())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.event_bus_type.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "event_bus_type",
                "monitor",
            ));
        }
        require_positive("monitor.expected_interval_ms", self.expected_interval_ms)?;
        require_positive("monitor.callback_timeout_ms", self.callback_timeout_ms)?;

        if self.warning_threshold == 0
            || self.warning_threshold >= self.error_threshold
            || self.error_threshold >= self.critical_threshold
        {
            return Err(ConfigurationError::invalid_value(
                "monitor.thresholds",
                format!(
                    "{}/{}/{}",
                    self.warning_threshold, self.error_threshold, self.critical_threshold
                ),
                "thresholds must ascend: 0 < warning < error < critical",
            ));
        }

        if self.monitor_interval() >= self.expected_interval() {
            return Err(ConfigurationError::invalid_value(
                "monitor.monitor_interval_ms",
                self.monitor_interval_ms.to_string(),
                format!(
                    "must be shorter than monitor.expected_interval_ms ({})",
                    self.expected_interval_ms
                ),
            ));
        }

        Ok(())
    }
}

/// Topic reconciler configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TopicsConfig {
    pub strategy: ReconcileStrategy,
    pub log_level: MismatchLogLevel,
    pub fail_fast: bool,
    pub sync_timeout_ms: u64,
}

impl Default for TopicsConfig {
    fn default() -> Self {
        Self::from(&ReconcilerPolicy::default())
    }
}

impl From<&ReconcilerPolicy> for TopicsConfig {
    fn from(policy: &ReconcilerPolicy) -> Self {
        Self {
            strategy: policy.strategy,
            log_level: policy.on_mismatch.log_level,
            fail_fast: policy.on_mismatch.fail_fast,
            sync_timeout_ms: policy.sync_timeout.as_millis() as u64,
        }
    }
}

impl TopicsConfig {
    pub fn sync_timeout(&self) -> Duration {
        Duration::from_millis(self.sync_timeout_ms)
    }

    pub fn policy(&self) -> ReconcilerPolicy {
        ReconcilerPolicy {
            strategy: self.strategy,
            on_mismatch: MismatchAction {
                log_level: self.log_level,
                fail_fast: self.fail_fast,
            },
            sync_timeout: self.sync_timeout(),
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        require_positive("topics.sync_timeout_ms", self.sync_timeout_ms)
    }
}

fn require_positive(field: &str, value: u64) -> ConfigResult<()> {
    if value == 0 {
        return Err(ConfigurationError::invalid_value(
            field,
            "0",
            "must be greater than zero",
        ));
    }
    Ok(())
}
