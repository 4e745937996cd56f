//! # In-Memory Transport
//!
//! In-process broker implementing all three transport capabilities.
//! Used as the `memory` backend and as the test double for the heartbeat and
//! reconciliation components.
//!
//! ## Key Features
//!
//! - **Fan-out delivery**: every subscriber of a topic receives each message
//! - **Topic table**: create/describe/update with real existence semantics
//! - **Call accounting**: publish and admin call counters for assertions
//! - **Failure injection**: publish failures and artificial latency
//!
//! ## Usage
//!
//! ```rust
//! use eventbus_control::messaging::{InMemoryTransport, Publisher};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = InMemoryTransport::new();
//! transport.publish("orders", b"{}").await?;
//! assert_eq!(transport.publish_count(), 1);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use super::errors::{MessagingError, MessagingResult};
use super::message::InboundMessage;
use super::transport::{MessageHandler, Publisher, Subscriber, SubscriptionId, TopicAdmin};
use crate::constants::transports;
use crate::topics::TopicOptions;

/// In-process broker
pub struct InMemoryTransport {
    subscriptions: DashMap<String, Vec<(SubscriptionId, MessageHandler)>>,
    topics: DashMap<String, TopicOptions>,
    publish_calls: AtomicU64,
    admin_calls: AtomicU64,
    fail_publishes: AtomicBool,
    publish_latency: Mutex<Option<Duration>>,
    closed: AtomicBool,
}

impl std::fmt::Debug for InMemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryTransport")
            .field("topics", &self.topics.len())
            .field("subscribed_topics", &self.subscriptions.len())
            .field("publish_calls", &self.publish_count())
            .field("admin_calls", &self.admin_call_count())
            .finish()
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self {
            subscriptions: DashMap::new(),
            topics: DashMap::new(),
            publish_calls: AtomicU64::new(0),
            admin_calls: AtomicU64::new(0),
            fail_publishes: AtomicBool::new(false),
            publish_latency: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// Make every subsequent publish fail until cleared
    pub fn set_publish_failure(&self, failing: bool) {
        self.fail_publishes.store(failing, Ordering::SeqCst);
    }

    /// Delay every publish by the given latency
    pub fn set_publish_latency(&self, latency: Option<Duration>) {
        *self.publish_latency.lock() = latency;
    }

    /// Seed the topic table, bypassing admin call accounting
    pub fn insert_topic(&self, topic: impl Into<String>, options: TopicOptions) {
        self.topics.insert(topic.into(), options);
    }

    /// Current configuration of a topic, bypassing admin call accounting
    pub fn topic_options(&self, topic: &str) -> Option<TopicOptions> {
        self.topics.get(topic).map(|entry| entry.value().clone())
    }

    /// Number of publish calls received, including failed ones
    pub fn publish_count(&self) -> u64 {
        self.publish_calls.load(Ordering::SeqCst)
    }

    /// Number of topic admin calls received
    pub fn admin_call_count(&self) -> u64 {
        self.admin_calls.load(Ordering::SeqCst)
    }

    /// Number of live subscriptions on a topic
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.subscriptions
            .get(topic)
            .map(|handlers| handlers.len())
            .unwrap_or(0)
    }

    /// Stop accepting publishes and drop every subscription
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.subscriptions.clear();
    }

    fn ensure_open(&self) -> MessagingResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(MessagingError::Closed)
        } else {
            Ok(())
        }
    }

    fn record_admin_call(&self) -> MessagingResult<()> {
        self.admin_calls.fetch_add(1, Ordering::SeqCst);
        self.ensure_open()
    }
}

#[async_trait]
impl Publisher for InMemoryTransport {
    async fn publish(&self, topic: &str, payload: &[u8]) -> MessagingResult<()> {
        self.publish_calls.fetch_add(1, Ordering::SeqCst);
        self.ensure_open()?;

        let latency = *self.publish_latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if self.fail_publishes.load(Ordering::SeqCst) {
            return Err(MessagingError::publish(topic, "injected publish failure"));
        }

        // Snapshot so handlers can (un)subscribe without deadlocking the shard
        let handlers: Vec<(SubscriptionId, MessageHandler)> = self
            .subscriptions
            .get(topic)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();

        debug!(topic = %topic, subscribers = handlers.len(), "📨 In-memory publish");

        for (subscription, handler) in handlers {
            let message = InboundMessage::new(topic, payload.to_vec());
            if let Err(e) = handler(message).await {
                warn!(
                    topic = %topic,
                    subscription = %subscription,
                    error = %e,
                    "In-memory subscriber handler failed"
                );
            }
        }

        Ok(())
    }

    fn transport_type(&self) -> &'static str {
        transports::MEMORY
    }
}

#[async_trait]
impl Subscriber for InMemoryTransport {
    async fn subscribe(
        &self,
        topic: &str,
        handler: MessageHandler,
    ) -> MessagingResult<SubscriptionId> {
        self.ensure_open()?;
        let subscription = SubscriptionId::new();
        self.subscriptions
            .entry(topic.to_string())
            .or_default()
            .push((subscription, handler));

        debug!(topic = %topic, subscription = %subscription, "In-memory subscription registered");
        Ok(subscription)
    }

    async fn unsubscribe(&self, subscription: SubscriptionId) -> MessagingResult<()> {
        for mut entry in self.subscriptions.iter_mut() {
            entry.value_mut().retain(|(id, _)| *id != subscription);
        }
        self.subscriptions.retain(|_, handlers| !handlers.is_empty());
        Ok(())
    }
}

#[async_trait]
impl TopicAdmin for InMemoryTransport {
    async fn describe_topic(&self, topic: &str) -> MessagingResult<Option<TopicOptions>> {
        self.record_admin_call()?;
        Ok(self.topic_options(topic))
    }

    async fn create_topic(&self, topic: &str, options: &TopicOptions) -> MessagingResult<()> {
        self.record_admin_call()?;
        if self.topics.contains_key(topic) {
            return Err(MessagingError::topic_admin(
                topic,
                "create",
                "topic already exists",
            ));
        }
        self.topics.insert(topic.to_string(), options.clone());
        Ok(())
    }

    async fn update_topic(&self, topic: &str, options: &TopicOptions) -> MessagingResult<()> {
        self.record_admin_call()?;
        match self.topics.get_mut(topic) {
            Some(mut entry) => {
                *entry.value_mut() = options.clone();
                Ok(())
            }
            None => Err(MessagingError::topic_not_found(topic)),
        }
    }
}
