#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Event Bus Control
//!
//! Reliability and configuration control plane for a pluggable message bus.
//!
//! ## Overview
//!
//! The crate sits on top of a transport (Kafka, NATS, in-memory, ...) reached
//! only through the [`messaging::Publisher`], [`messaging::Subscriber`] and
//! [`messaging::TopicAdmin`] traits, and provides three concerns:
//!
//! - **Heartbeat health checking**: a [`HeartbeatPublisher`] emits periodic
//!   heartbeats and a [`HeartbeatMonitor`] raises escalating alerts when they
//!   stop arriving.
//! - **Topic reconciliation**: a [`TopicReconciler`] compares desired topic
//!   options with the broker and applies only the safe fixes.
//! - **Identity routing**: an [`IdentityResolver`] extracts the aggregate
//!   ordering key from a message and an [`AggregateRouter`] turns it into a
//!   [`RoutingDecision`].
//!
//! ## Module Organization
//!
//! - [`config`] - Layered configuration (files + `EVENTBUS__` environment)
//! - [`health`] - Heartbeat records, publisher, monitor and callbacks
//! - [`topics`] - Topic options, builder and reconciler
//! - [`routing`] - Identity resolution and routing decisions
//! - [`messaging`] - Transport traits, envelope codec and in-memory transport
//! - [`validation`] - Identity and topic-name grammars
//! - [`logging`] - Structured logging setup
//! - [`error`] - Crate-level error umbrella
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use eventbus_control::config::ConfigManager;
//! use eventbus_control::health::{callback, HeartbeatAlert, HeartbeatMonitor, HeartbeatPublisher};
//! use eventbus_control::messaging::InMemoryTransport;
//!
//! # async fn example() -> eventbus_control::Result<()> {
//! eventbus_control::logging::init_structured_logging();
//! let manager = ConfigManager::load()?;
//! let transport = Arc::new(InMemoryTransport::new());
//!
//! let publisher = HeartbeatPublisher::new(transport.clone(), manager.config().heartbeat.clone())?;
//! let monitor = HeartbeatMonitor::new(transport.clone(), manager.config().monitor.clone())?;
//! monitor.register_alert_callback(callback(|alert: HeartbeatAlert| async move {
//!     eprintln!("{} alert after {} misses", alert.severity, alert.consecutive_misses);
//! }));
//!
//! monitor.start().await?;
//! publisher.start().await?;
//! # publisher.stop().await?;
//! # monitor.stop().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod health;
pub mod logging;
pub mod messaging;
pub mod routing;
pub mod topics;
pub mod validation;

pub use config::{
    ConfigManager, ConfigResult, ConfigurationError, ControlPlaneConfig, HeartbeatConfig,
    MonitorConfig, TopicsConfig,
};
pub use error::{ControlPlaneError, Result};
pub use health::{
    AlertSeverity, HeartbeatAlert, HeartbeatMonitor, HeartbeatPublisher, HeartbeatRecord,
    MonitorStats, PublisherHealthStatus,
};
pub use messaging::{Envelope, EnvelopeError, InboundMessage, MessagingError};
pub use routing::{AggregateRouter, IdentityResolver, MessageRouter, RoutingDecision, SubjectHint};
pub use topics::{
    ConfigMismatch, ReconcileAction, ReconcileError, ReconcileStrategy, ReconciliationResult,
    TopicBuilder, TopicOptions, TopicReconciler,
};
