//! # Heartbeat Monitor
//!
//! Subscribes to the heartbeat topic and raises escalating alerts when
//! heartbeats stop arriving. The monitor never talks to a publisher
//! directly; the transport is the only link between them.
//!
//! Two paths touch the statistics, both under the same mutex:
//!
//! - **Receive path**: every well-formed, in-window heartbeat resets the miss
//!   counter and records the receive time.
//! - **Ticker**: every `monitor_interval` the time since the last heartbeat
//!   (or since start, if none has arrived) is compared with the expected
//!   interval; exceeding it counts as one miss.
//!
//! Once misses reach the warning threshold, each further miss tick raises an
//! alert whose severity never decreases until a heartbeat arrives.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, warn};

use super::callbacks::{Callback, CallbackRegistry};
use super::message::HeartbeatParser;
use crate::config::{ConfigResult, MonitorConfig};
use crate::constants::ALERT_NO_MESSAGES;
use crate::logging::log_heartbeat_operation;
use crate::messaging::{message_handler, MessagingResult, Subscriber, SubscriptionId};

/// Alert severity, ordered by urgency
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Warning,
    Error,
    Critical,
}

impl AlertSeverity {
    /// Severity for a miss count, or `None` below the warning threshold
    pub fn for_misses(misses: u32, warning: u32, error: u32, critical: u32) -> Option<Self> {
        if misses >= critical {
            Some(Self::Critical)
        } else if misses >= error {
            Some(Self::Error)
        } else if misses >= warning {
            Some(Self::Warning)
        } else {
            None
        }
    }
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self {
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        };
        f.write_str(severity)
    }
}

/// Raised when heartbeats stop arriving
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatAlert {
    pub alert_type: String,
    pub severity: AlertSeverity,
    pub source: String,
    pub event_bus_type: String,
    pub topic: String,
    pub last_message_time: Option<DateTime<Utc>>,
    pub time_since_last_message: Duration,
    pub expected_interval: Duration,
    pub consecutive_misses: u32,
    pub timestamp: DateTime<Utc>,
    pub metadata: HashMap<String, String>,
}

/// Point-in-time monitor statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorStats {
    pub start_time: Option<DateTime<Utc>>,
    pub last_message_time: Option<DateTime<Utc>>,
    pub total_messages_received: u64,
    pub consecutive_misses: u32,
    pub total_alerts_raised: u64,
    pub last_alert_time: Option<DateTime<Utc>>,
    pub is_healthy: bool,
    pub uptime_seconds: u64,
}

#[derive(Debug, Default)]
struct MonitorState {
    start_time: Option<DateTime<Utc>>,
    started: Option<Instant>,
    last_message_time: Option<DateTime<Utc>>,
    last_message_at: Option<Instant>,
    total_messages_received: u64,
    consecutive_misses: u32,
    total_alerts_raised: u64,
    last_alert_time: Option<DateTime<Utc>>,
}

struct MonitorInner {
    config: MonitorConfig,
    topic: String,
    state: Mutex<MonitorState>,
    callbacks: CallbackRegistry<HeartbeatAlert>,
    parser: HeartbeatParser,
    accepting: AtomicBool,
}

struct RunningMonitor {
    subscription: SubscriptionId,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

pub struct HeartbeatMonitor {
    subscriber: Arc<dyn Subscriber>,
    inner: Arc<MonitorInner>,
    task: Mutex<Option<RunningMonitor>>,
}

impl fmt::Debug for HeartbeatMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeartbeatMonitor")
            .field("topic", &self.inner.topic)
            .field("running", &self.task.lock().is_some())
            .field("callbacks", &self.inner.callbacks)
            .finish()
    }
}

impl HeartbeatMonitor {
    pub fn new(subscriber: Arc<dyn Subscriber>, config: MonitorConfig) -> ConfigResult<Self> {
        config.validate()?;
        let topic = config.topic();
        let callbacks = CallbackRegistry::new("heartbeat_monitor", config.callback_timeout());

        Ok(Self {
            subscriber,
            inner: Arc::new(MonitorInner {
                config,
                topic,
                state: Mutex::new(MonitorState::default()),
                callbacks,
                parser: HeartbeatParser::new(),
                accepting: AtomicBool::new(false),
            }),
            task: Mutex::new(None),
        })
    }

    /// Subscribe and start the miss ticker; no-op when running or disabled
    pub async fn start(&self) -> MessagingResult<()> {
        let config = &self.inner.config;
        if !config.enabled {
            debug!(topic = %self.inner.topic, "Heartbeat monitoring is disabled");
            return Ok(());
        }
        if self.task.lock().is_some() {
            return Ok(());
        }

        {
            let mut state = self.inner.state.lock();
            state.start_time = Some(Utc::now());
            state.started = Some(Instant::now());
            state.consecutive_misses = 0;
        }
        self.inner.accepting.store(true, Ordering::SeqCst);

        let receiver = self.inner.clone();
        let subscribed = self
            .subscriber
            .subscribe(
                &self.inner.topic,
                message_handler(move |message| {
                    let receiver = receiver.clone();
                    async move {
                        receiver.record_heartbeat(&message.payload);
                        Ok(())
                    }
                }),
            )
            .await;
        let subscription = match subscribed {
            Ok(subscription) => subscription,
            Err(e) => {
                self.inner.accepting.store(false, Ordering::SeqCst);
                error!(topic = %self.inner.topic, error = %e, "Failed to subscribe to heartbeat topic");
                return Err(e);
            }
        };

        let raced = {
            let mut task = self.task.lock();
            if task.is_some() {
                true
            } else {
                let (shutdown_tx, shutdown_rx) = oneshot::channel();
                let inner = self.inner.clone();
                let handle = tokio::spawn(async move { inner.run(shutdown_rx).await });
                *task = Some(RunningMonitor {
                    subscription,
                    shutdown: shutdown_tx,
                    handle,
                });
                false
            }
        };
        if raced {
            // Lost a concurrent start race; keep the winner's subscription
            return self.subscriber.unsubscribe(subscription).await;
        }

        log_heartbeat_operation(
            "monitor_start",
            &config.source,
            &config.event_bus_type,
            "running",
            Some(config.monitor_interval()),
            Some(self.inner.topic.as_str()),
        );
        Ok(())
    }

    /// Stop the ticker, drop the subscription, and wait for in-flight alerts
    pub async fn stop(&self) -> MessagingResult<()> {
        let running = self.task.lock().take();
        let Some(running) = running else {
            return Ok(());
        };

        self.inner.accepting.store(false, Ordering::SeqCst);
        let _ = running.shutdown.send(());
        if let Err(e) = running.handle.await {
            error!(topic = %self.inner.topic, error = %e, "Heartbeat monitor loop terminated abnormally");
        }

        let unsubscribed = self.subscriber.unsubscribe(running.subscription).await;
        log_heartbeat_operation(
            "monitor_stop",
            &self.inner.config.source,
            &self.inner.config.event_bus_type,
            "stopped",
            None,
            None,
        );
        unsubscribed
    }

    pub fn register_alert_callback(&self, callback: Callback<HeartbeatAlert>) {
        self.inner.callbacks.register(callback);
    }

    pub fn stats(&self) -> MonitorStats {
        let state = self.inner.state.lock();
        MonitorStats {
            start_time: state.start_time,
            last_message_time: state.last_message_time,
            total_messages_received: state.total_messages_received,
            consecutive_misses: state.consecutive_misses,
            total_alerts_raised: state.total_alerts_raised,
            last_alert_time: state.last_alert_time,
            is_healthy: self.inner.is_healthy(state.consecutive_misses),
            uptime_seconds: state
                .started
                .map(|started| started.elapsed().as_secs())
                .unwrap_or(0),
        }
    }

    /// Healthy while misses stay below the warning threshold
    pub fn is_healthy(&self) -> bool {
        self.inner.is_healthy(self.consecutive_misses())
    }

    pub fn consecutive_misses(&self) -> u32 {
        self.inner.state.lock().consecutive_misses
    }

    pub fn last_message_time(&self) -> Option<DateTime<Utc>> {
        self.inner.state.lock().last_message_time
    }

    pub fn topic(&self) -> &str {
        &self.inner.topic
    }
}

impl MonitorInner {
    fn is_healthy(&self, misses: u32) -> bool {
        misses < self.config.warning_threshold
    }

    fn record_heartbeat(&self, payload: &[u8]) {
        if !self.accepting.load(Ordering::SeqCst) {
            return;
        }

        let record = match self.parser.parse(payload) {
            Ok(record) => record,
            Err(e) => {
                warn!(topic = %self.topic, error = %e, "Discarding invalid heartbeat");
                return;
            }
        };

        let mut state = self.state.lock();
        state.last_message_time = Some(Utc::now());
        state.last_message_at = Some(Instant::now());
        state.total_messages_received += 1;
        state.consecutive_misses = 0;
        drop(state);

        debug!(
            topic = %self.topic,
            source = %record.source,
            message_id = %record.message_id,
            "💓 Heartbeat received"
        );
    }

    async fn run(self: Arc<Self>, mut shutdown: oneshot::Receiver<()>) {
        let period = self.config.monitor_interval();
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut observers: Vec<JoinHandle<()>> = Vec::new();

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    observers.retain(|handle| !handle.is_finished());
                    if let Some(alert) = self.check_for_miss() {
                        observers.extend(self.callbacks.dispatch(alert));
                    }
                }
            }
        }

        for handle in observers {
            let _ = handle.await;
        }
        debug!(topic = %self.topic, "Heartbeat monitor loop stopped");
    }

    /// Count a miss if the silence exceeds the expected interval; returns the alert to raise
    fn check_for_miss(&self) -> Option<HeartbeatAlert> {
        let expected = self.config.expected_interval();
        let mut state = self.state.lock();

        let reference = state.last_message_at.or(state.started)?;
        let silence = reference.elapsed();
        if silence <= expected {
            return None;
        }

        state.consecutive_misses = state.consecutive_misses.saturating_add(1);
        let misses = state.consecutive_misses;
        let severity = AlertSeverity::for_misses(
            misses,
            self.config.warning_threshold,
            self.config.error_threshold,
            self.config.critical_threshold,
        );

        let Some(severity) = severity else {
            debug!(topic = %self.topic, consecutive_misses = misses, "Heartbeat missed");
            return None;
        };

        let timestamp = Utc::now();
        state.total_alerts_raised += 1;
        state.last_alert_time = Some(timestamp);
        let last_message_time = state.last_message_time;
        drop(state);

        let message = match last_message_time {
            Some(_) => format!(
                "No health check messages received for {}ms (consecutive misses: {misses})",
                silence.as_millis()
            ),
            None => format!(
                "No health check messages received since startup (consecutive misses: {misses})"
            ),
        };

        match severity {
            AlertSeverity::Warning => warn!(
                topic = %self.topic,
                severity = %severity,
                consecutive_misses = misses,
                silence_ms = silence.as_millis() as u64,
                "⚠️ Heartbeat alert raised"
            ),
            AlertSeverity::Error | AlertSeverity::Critical => error!(
                topic = %self.topic,
                severity = %severity,
                consecutive_misses = misses,
                silence_ms = silence.as_millis() as u64,
                "🚨 Heartbeat alert raised"
            ),
        }

        Some(HeartbeatAlert {
            alert_type: ALERT_NO_MESSAGES.to_string(),
            severity,
            source: self.config.source.clone(),
            event_bus_type: self.config.event_bus_type.clone(),
            topic: self.topic.clone(),
            last_message_time,
            time_since_last_message: silence,
            expected_interval: expected,
            consecutive_misses: misses,
            timestamp,
            metadata: HashMap::from([("message".to_string(), message)]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::{callback, HeartbeatRecord};
    use crate::messaging::{InMemoryTransport, Publisher};

    fn config() -> MonitorConfig {
        MonitorConfig {
            expected_interval_ms: 1_000,
            monitor_interval_ms: 400,
            warning_threshold: 2,
            error_threshold: 3,
            critical_threshold: 5,
            ..MonitorConfig::default()
        }
    }

    fn collect_alerts(monitor: &HeartbeatMonitor) -> Arc<Mutex<Vec<HeartbeatAlert>>> {
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

    async fn send_heartbeat(transport: &InMemoryTransport, topic: &str) {
        let record = HeartbeatRecord::new("orders-service", "memory");
        transport
            .publish(topic, &record.to_bytes().unwrap())
            .await
            .unwrap();
    }

    #[test]
    fn test_severity_selection() {
        assert_eq!(AlertSeverity::for_misses(1, 2, 3, 5), None);
        assert_eq!(AlertSeverity::for_misses(2, 2, 3, 5), Some(AlertSeverity::Warning));
        assert_eq!(AlertSeverity::for_misses(4, 2, 3, 5), Some(AlertSeverity::Error));
        assert_eq!(AlertSeverity::for_misses(9, 2, 3, 5), Some(AlertSeverity::Critical));
        assert!(AlertSeverity::Warning < AlertSeverity::Error);
        assert!(AlertSeverity::Error < AlertSeverity::Critical);
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeats_keep_monitor_healthy() {
        let transport = Arc::new(InMemoryTransport::new());
        let monitor = HeartbeatMonitor::new(transport.clone(), config()).unwrap();
        monitor.start().await.unwrap();

        for _ in 0..5 {
            send_heartbeat(&transport, monitor.topic()).await;
            tokio::time::sleep(Duration::from_millis(600)).await;
        }

        let stats = monitor.stats();
        assert_eq!(stats.total_messages_received, 5);
        assert_eq!(stats.consecutive_misses, 0);
        assert_eq!(stats.total_alerts_raised, 0);
        assert!(stats.is_healthy);
        assert!(monitor.last_message_time().is_some());

        monitor.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_escalation_with_custom_thresholds() {
        let transport = Arc::new(InMemoryTransport::new());
        let monitor = HeartbeatMonitor::new(transport.clone(), config()).unwrap();
        let alerts = collect_alerts(&monitor);
        monitor.start().await.unwrap();

        // Ticks at 0.4s and 0.8s are within the expected interval; misses start at 1.2s
        tokio::time::sleep(Duration::from_millis(1_300)).await;
        assert_eq!(monitor.consecutive_misses(), 1);
        assert!(monitor.is_healthy());

        tokio::time::sleep(Duration::from_millis(1_600)).await;
        monitor.stop().await.unwrap();

        let alerts = alerts.lock();
        let misses: Vec<u32> = alerts.iter().map(|a| a.consecutive_misses).collect();
        let severities: Vec<AlertSeverity> = alerts.iter().map(|a| a.severity).collect();
        assert_eq!(misses, vec![2, 3, 4, 5]);
        assert_eq!(
            severities,
            vec![
                AlertSeverity::Warning,
                AlertSeverity::Error,
                AlertSeverity::Error,
                AlertSeverity::Critical
            ]
        );
        assert!(severities.windows(2).all(|pair| pair[0] <= pair[1]));
        assert!(alerts.iter().all(|a| a.alert_type == "no_messages"));
        assert!(alerts[0].last_message_time.is_none());
        assert!(!monitor.is_healthy());
        assert_eq!(monitor.stats().total_alerts_raised, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_resets_misses() {
        let transport = Arc::new(InMemoryTransport::new());
        let monitor = HeartbeatMonitor::new(transport.clone(), config()).unwrap();
        monitor.start().await.unwrap();

        tokio::time::sleep(Duration::from_millis(2_100)).await;
        assert!(monitor.consecutive_misses() >= 2);
        assert!(!monitor.is_healthy());

        send_heartbeat(&transport, monitor.topic()).await;
        assert_eq!(monitor.consecutive_misses(), 0);
        assert!(monitor.is_healthy());

        monitor.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_heartbeats_are_discarded() {
        let transport = Arc::new(InMemoryTransport::new());
        let monitor = HeartbeatMonitor::new(transport.clone(), config()).unwrap();
        monitor.start().await.unwrap();

        transport.publish(monitor.topic(), b"not json").await.unwrap();

        let mut stale = HeartbeatRecord::new("orders-service", "memory");
        stale.timestamp = Utc::now() - chrono::Duration::minutes(10);
        transport
            .publish(monitor.topic(), &stale.to_bytes().unwrap())
            .await
            .unwrap();

        let mut anonymous = HeartbeatRecord::new("orders-service", "memory");
        anonymous.message_id.clear();
        transport
            .publish(monitor.topic(), &anonymous.to_bytes().unwrap())
            .await
            .unwrap();

        assert_eq!(monitor.stats().total_messages_received, 0);
        monitor.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_unsubscribes_and_ignores_late_deliveries() {
        let transport = Arc::new(InMemoryTransport::new());
        let monitor = HeartbeatMonitor::new(transport.clone(), config()).unwrap();
        let topic = monitor.topic().to_string();

        monitor.start().await.unwrap();
        monitor.start().await.unwrap();
        assert_eq!(transport.subscriber_count(&topic), 1);

        monitor.stop().await.unwrap();
        monitor.stop().await.unwrap();
        assert_eq!(transport.subscriber_count(&topic), 0);

        send_heartbeat(&transport, &topic).await;
        tokio::time::sleep(Duration::from_secs(10)).await;
        let stats = monitor.stats();
        assert_eq!(stats.total_messages_received, 0);
        assert_eq!(stats.consecutive_misses, 0);
    }

    #[tokio::test]
    async fn test_disabled_monitor_does_not_subscribe() {
        let transport = Arc::new(InMemoryTransport::new());
        let monitor = HeartbeatMonitor::new(
            transport.clone(),
            MonitorConfig {
                enabled: false,
                ..config()
            },
        )
        .unwrap();

        monitor.start().await.unwrap();
        assert_eq!(transport.subscriber_count(monitor.topic()), 0);
        assert_eq!(monitor.stats().start_time, None);
    }
}
