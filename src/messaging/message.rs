//! # Inbound Message Representation
//!
//! Transport-neutral view of a delivered message. Backends translate their
//! native records (Kafka key + headers, NATS subject, ...) into this shape
//! before handing them to subscribers and routers.

use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundMessage {
    /// Topic the message was delivered on
    pub topic: String,
    /// Raw payload bytes
    pub payload: Vec<u8>,
    /// Transport headers, if the backend supports them
    pub headers: HashMap<String, String>,
    /// Transport-native partition/ordering key
    pub key: Option<Vec<u8>>,
    /// Subject the backend delivered on, when it differs from the topic
    pub subject: Option<String>,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Transport key as bytes, empty when absent
    pub fn key_bytes(&self) -> &[u8] {
        self.key.as_deref().unwrap_or_default()
    }
}
