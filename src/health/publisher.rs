//! # Heartbeat Publisher
//!
//! Periodically publishes a [`HeartbeatRecord`] on the heartbeat topic and
//! tracks consecutive publish failures. One check runs immediately on
//! start, then one per interval.
//!
//! Failure counters and timestamps live together behind a single mutex so a
//! status snapshot is always internally consistent. Every attempt, success or
//! failure, is reported to registered observers as a [`HeartbeatCheckResult`].

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use super::callbacks::{Callback, CallbackRegistry};
use super::message::HeartbeatRecordBuilder;
use crate::config::{ConfigResult, HeartbeatConfig};
use crate::logging::log_heartbeat_operation;
use crate::messaging::{MessagingError, MessagingResult, Publisher};

const CHECK_TYPE_PERIODIC: &str = "periodic";

/// Outcome of one heartbeat attempt, delivered to observers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatCheckResult {
    pub success: bool,
    pub timestamp: DateTime<Utc>,
    pub duration: Duration,
    pub error: Option<String>,
    pub consecutive_failures: u32,
    pub event_bus_type: String,
    pub source: String,
}

/// Point-in-time view of publisher health
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublisherHealthStatus {
    pub is_healthy: bool,
    pub consecutive_failures: u32,
    pub last_success_time: Option<DateTime<Utc>>,
    pub last_failure_time: Option<DateTime<Utc>>,
    pub is_running: bool,
    pub event_bus_type: String,
    pub source: String,
}

#[derive(Debug, Default)]
struct PublisherState {
    consecutive_failures: u32,
    last_success_time: Option<DateTime<Utc>>,
    last_failure_time: Option<DateTime<Utc>>,
    is_running: bool,
}

struct PublisherInner {
    publisher: Arc<dyn Publisher>,
    config: HeartbeatConfig,
    topic: String,
    state: Mutex<PublisherState>,
    callbacks: CallbackRegistry<HeartbeatCheckResult>,
}

struct RunningTask {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

pub struct HeartbeatPublisher {
    inner: Arc<PublisherInner>,
    task: Mutex<Option<RunningTask>>,
}

impl std::fmt::Debug for HeartbeatPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeartbeatPublisher")
            .field("source", &self.inner.config.source)
            .field("topic", &self.inner.topic)
            .field("transport", &self.inner.publisher.transport_type())
            .field("running", &self.is_running())
            .finish()
    }
}

impl HeartbeatPublisher {
    pub fn new(publisher: Arc<dyn Publisher>, config: HeartbeatConfig) -> ConfigResult<Self> {
        config.validate()?;
        let topic = config.topic();
        let callbacks = CallbackRegistry::new("heartbeat_publisher", config.callback_timeout());

        Ok(Self {
            inner: Arc::new(PublisherInner {
                publisher,
                config,
                topic,
                state: Mutex::new(PublisherState::default()),
                callbacks,
            }),
            task: Mutex::new(None),
        })
    }

    /// Start the periodic loop; no-op when already running or disabled
    pub async fn start(&self) -> MessagingResult<()> {
        let config = &self.inner.config;
        if !config.enabled {
            info!(source = %config.source, "Heartbeat publishing is disabled");
            return Ok(());
        }

        let mut task = self.task.lock();
        if task.is_some() {
            return Ok(());
        }

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        self.inner.state.lock().is_running = true;
        let inner = self.inner.clone();
        let handle = tokio::spawn(async move { inner.run(shutdown_rx).await });
        *task = Some(RunningTask {
            shutdown: shutdown_tx,
            handle,
        });

        log_heartbeat_operation(
            "start",
            &config.source,
            &config.event_bus_type,
            "running",
            Some(config.interval()),
            Some(self.inner.topic.as_str()),
        );
        Ok(())
    }

    /// Stop the loop and wait for it, including in-flight observers, to exit
    pub async fn stop(&self) -> MessagingResult<()> {
        let task = self.task.lock().take();
        let Some(task) = task else {
            return Ok(());
        };

        let _ = task.shutdown.send(());
        let joined = task.handle.await;
        self.inner.state.lock().is_running = false;

        if let Err(e) = joined {
            error!(source = %self.inner.config.source, error = %e, "Heartbeat loop terminated abnormally");
            return Err(MessagingError::internal(format!(
                "heartbeat loop terminated abnormally: {e}"
            )));
        }

        log_heartbeat_operation(
            "stop",
            &self.inner.config.source,
            &self.inner.config.event_bus_type,
            "stopped",
            None,
            None,
        );
        Ok(())
    }

    /// Observe every heartbeat attempt
    pub fn register_callback(&self, callback: Callback<HeartbeatCheckResult>) {
        self.inner.callbacks.register(callback);
    }

    pub fn status(&self) -> PublisherHealthStatus {
        let state = self.inner.state.lock();
        PublisherHealthStatus {
            is_healthy: state.consecutive_failures < self.inner.config.failure_threshold,
            consecutive_failures: state.consecutive_failures,
            last_success_time: state.last_success_time,
            last_failure_time: state.last_failure_time,
            is_running: state.is_running,
            event_bus_type: self.inner.config.event_bus_type.clone(),
            source: self.inner.config.source.clone(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.consecutive_failures() < self.inner.config.failure_threshold
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.inner.state.lock().consecutive_failures
    }

    pub fn is_running(&self) -> bool {
        self.inner.state.lock().is_running
    }

    pub fn topic(&self) -> &str {
        &self.inner.topic
    }
}

impl PublisherInner {
    async fn run(self: Arc<Self>, mut shutdown: oneshot::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.config.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut observers: Vec<JoinHandle<()>> = Vec::new();

        debug!(
            source = %self.config.source,
            topic = %self.topic,
            interval_ms = self.config.interval_ms,
            "💓 Heartbeat loop started"
        );

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    observers.retain(|handle| !handle.is_finished());
                    observers.extend(self.perform_check().await);
                }
            }
        }

        // Observers are bounded by the callback timeout
        for handle in observers {
            let _ = handle.await;
        }
        debug!(source = %self.config.source, "Heartbeat loop stopped");
    }

    async fn perform_check(&self) -> Vec<JoinHandle<()>> {
        let timestamp = Utc::now();
        let started = Instant::now();
        let outcome = self.publish_heartbeat(timestamp).await;
        let duration = started.elapsed();

        let result = {
            let mut state = self.state.lock();
            match &outcome {
                Ok(()) => {
                    state.consecutive_failures = 0;
                    state.last_success_time = Some(timestamp);
                }
                Err(_) => {
                    state.consecutive_failures = state.consecutive_failures.saturating_add(1);
                    state.last_failure_time = Some(timestamp);
                }
            }
            HeartbeatCheckResult {
                success: outcome.is_ok(),
                timestamp,
                duration,
                error: outcome.as_ref().err().cloned(),
                consecutive_failures: state.consecutive_failures,
                event_bus_type: self.config.event_bus_type.clone(),
                source: self.config.source.clone(),
            }
        };

        match &result.error {
            None => debug!(
                source = %result.source,
                topic = %self.topic,
                duration_ms = duration.as_millis() as u64,
                "✅ Heartbeat published"
            ),
            Some(e) => error!(
                source = %result.source,
                topic = %self.topic,
                error = %e,
                consecutive_failures = result.consecutive_failures,
                duration_ms = duration.as_millis() as u64,
                "❌ Heartbeat failed"
            ),
        }

        self.callbacks.dispatch(result)
    }

    async fn publish_heartbeat(&self, timestamp: DateTime<Utc>) -> Result<(), String> {
        let record = HeartbeatRecordBuilder::new(&self.config.source, &self.config.event_bus_type)
            .with_check_type(CHECK_TYPE_PERIODIC)
            .with_instance_id(format!("{}-{}", self.config.source, timestamp.timestamp()))
            .build();
        let payload = record.to_bytes().map_err(|e| e.to_string())?;

        let timeout = self.config.publish_timeout();
        match tokio::time::timeout(timeout, self.publisher.publish(&self.topic, &payload)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(format!("heartbeat publish failed: {e}")),
            Err(_) => Err(MessagingError::timeout("heartbeat publish", timeout).to_string()),
        }
    }
}
