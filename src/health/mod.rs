//! # Heartbeat Health Checking
//!
//! A [`HeartbeatPublisher`] emits periodic [`HeartbeatRecord`]s onto a
//! transport topic and a [`HeartbeatMonitor`] watches the same topic,
//! escalating [`HeartbeatAlert`]s as consecutive intervals pass without one.

pub mod callbacks;
pub mod message;
pub mod monitor;
pub mod publisher;

pub use callbacks::{callback, Callback, CallbackRegistry};
pub use message::{
    HeartbeatError, HeartbeatParser, HeartbeatRecord, HeartbeatRecordBuilder,
    METADATA_CHECK_TYPE, METADATA_ENVIRONMENT, METADATA_INSTANCE_ID,
};
pub use monitor::{AlertSeverity, HeartbeatAlert, HeartbeatMonitor, MonitorStats};
pub use publisher::{HeartbeatCheckResult, HeartbeatPublisher, PublisherHealthStatus};
