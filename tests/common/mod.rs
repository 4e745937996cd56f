//! Shared fixtures for the integration tests
#![allow(dead_code)]

pub mod strategies;

use eventbus_control::health::{callback, HeartbeatAlert, HeartbeatMonitor};
use eventbus_control::{HeartbeatConfig, MonitorConfig};
use parking_lot::Mutex;
use std::sync::Arc;

pub const TEST_TOPIC: &str = "jxt-core-memory-health-check";

/// Publisher emitting once per second onto the in-memory health topic
pub fn fast_heartbeat_config() -> HeartbeatConfig {
    HeartbeatConfig {
        source: "integration-publisher".to_string(),
        event_bus_type: "memory".to_string(),
        interval_ms: 1_000,
        publish_timeout_ms: 200,
        failure_threshold: 3,
        callback_timeout_ms: 100,
        ..HeartbeatConfig::default()
    }
}

/// Monitor expecting a heartbeat every 1.5s, checking twice a second
pub fn fast_monitor_config() -> MonitorConfig {
    MonitorConfig {
        source: "integration-monitor".to_string(),
        event_bus_type: "memory".to_string(),
        expected_interval_ms: 1_500,
        monitor_interval_ms: 500,
        warning_threshold: 2,
        error_threshold: 3,
        critical_threshold: 5,
        callback_timeout_ms: 100,
        ..MonitorConfig::default()
    }
}

/// Register an alert callback that records every alert it sees
pub fn collect_alerts(monitor: &HeartbeatMonitor) -> Arc<Mutex<Vec<HeartbeatAlert>>> {
    let alerts = Arc::new(Mutex::new(Vec::new()));
    let sink = alerts.clone();
    monitor.register_alert_callback(callback(move |alert: HeartbeatAlert| {
        let sink = sink.clone();
        async move {
            sink.lock().push(alert);
        }
    }));
    alerts
}
