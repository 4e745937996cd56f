//! # Transport Capabilities
//!
//! The narrow interfaces through which the control plane talks to a broker
//! backend. Wire adapters (Kafka, NATS, in-memory) implement whichever of the
//! three capabilities they support; components depend only on the one they
//! need, so a heartbeat publisher never sees topic administration and the
//! reconciler never sees message delivery.

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;
use uuid::Uuid;

use super::errors::MessagingResult;
use super::message::InboundMessage;
use crate::topics::TopicOptions;

/// Async handler invoked for every delivery on a subscribed topic
pub type MessageHandler =
    Arc<dyn Fn(InboundMessage) -> BoxFuture<'static, MessagingResult<()>> + Send + Sync>;

/// Wrap an async closure as a [`MessageHandler`]
pub fn message_handler<F, Fut>(handler: F) -> MessageHandler
where
    F: Fn(InboundMessage) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = MessagingResult<()>> + Send + 'static,
{
    Arc::new(move |message| Box::pin(handler(message)))
}

/// Handle returned by [`Subscriber::subscribe`], used to cancel delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub Uuid);

impl SubscriptionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Publish capability
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish raw bytes to a topic
    async fn publish(&self, topic: &str, payload: &[u8]) -> MessagingResult<()>;

    /// Transport identifier (`kafka`, `nats`, `memory`, ...)
    fn transport_type(&self) -> &'static str;
}

/// Subscribe capability
#[async_trait]
pub trait Subscriber: Send + Sync {
    /// Register a handler for every message delivered on `topic`
    async fn subscribe(&self, topic: &str, handler: MessageHandler)
        -> MessagingResult<SubscriptionId>;

    /// Stop delivering to a previously registered handler
    async fn unsubscribe(&self, subscription: SubscriptionId) -> MessagingResult<()>;
}

/// Topic administration capability
///
/// The broker's answer is authoritative: callers always re-query rather than
/// trusting any cached intent.
#[async_trait]
pub trait TopicAdmin: Send + Sync {
    /// Actual configuration of a topic, or `None` when it does not exist
    async fn describe_topic(&self, topic: &str) -> MessagingResult<Option<TopicOptions>>;

    /// Create a topic with the given configuration
    async fn create_topic(&self, topic: &str, options: &TopicOptions) -> MessagingResult<()>;

    /// Apply mutable settings to an existing topic
    async fn update_topic(&self, topic: &str, options: &TopicOptions) -> MessagingResult<()>;
}
