//! # Messaging Module
//!
//! Transport capabilities, the in-memory backend, inbound message shape, and
//! the domain event envelope.

pub mod envelope;
pub mod errors;
pub mod in_memory;
pub mod message;
pub mod transport;

pub use envelope::{derive_event_id, publish_envelope, Envelope, EnvelopeError};
pub use errors::{MessagingError, MessagingResult};
pub use in_memory::InMemoryTransport;
pub use message::InboundMessage;
pub use transport::{
    message_handler, MessageHandler, Publisher, Subscriber, SubscriptionId, TopicAdmin,
};
