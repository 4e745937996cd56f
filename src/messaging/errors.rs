//! # Messaging Error Types
//!
//! Structured error handling for transport capabilities using thiserror,
//! shared by every broker backend.

use crate::validation::TopicNameValidationError;
use thiserror::Error;

/// Transport-level error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MessagingError {
    #[error("Transport connection error: {message}")]
    Connection { message: String },

    #[error("Publish failed: {topic}: {message}")]
    Publish { topic: String, message: String },

    #[error("Subscribe failed: {topic}: {message}")]
    Subscribe { topic: String, message: String },

    #[error("Topic admin operation failed: {topic}: {operation}: {message}")]
    TopicAdmin {
        topic: String,
        operation: String,
        message: String,
    },

    #[error("Topic not found: {topic}")]
    TopicNotFound { topic: String },

    #[error("Invalid topic name: {topic}: {reason}")]
    InvalidTopicName { topic: String, reason: String },

    #[error("Message serialization error: {message}")]
    MessageSerialization { message: String },

    #[error("Message deserialization error: {message}")]
    MessageDeserialization { message: String },

    #[error("Network timeout: operation {operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Transport is closed")]
    Closed,

    #[error("Internal messaging error: {message}")]
    Internal { message: String },
}

impl MessagingError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn publish(topic: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Publish {
            topic: topic.into(),
            message: message.into(),
        }
    }

    pub fn subscribe(topic: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Subscribe {
            topic: topic.into(),
            message: message.into(),
        }
    }

    pub fn topic_admin(
        topic: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::TopicAdmin {
            topic: topic.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn topic_not_found(topic: impl Into<String>) -> Self {
        Self::TopicNotFound {
            topic: topic.into(),
        }
    }

    pub fn message_serialization(message: impl Into<String>) -> Self {
        Self::MessageSerialization {
            message: message.into(),
        }
    }

    pub fn message_deserialization(message: impl Into<String>) -> Self {
        Self::MessageDeserialization {
            message: message.into(),
        }
    }

    /// Create a timeout error from the elapsed budget
    pub fn timeout(operation: impl Into<String>, timeout: std::time::Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether retrying the same call later could succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::Publish { .. } | Self::Timeout { .. }
        )
    }
}

impl From<serde_json::Error> for MessagingError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_syntax() || err.is_eof() || err.is_data() {
            MessagingError::message_deserialization(err.to_string())
        } else {
            MessagingError::message_serialization(err.to_string())
        }
    }
}

impl From<TopicNameValidationError> for MessagingError {
    fn from(err: TopicNameValidationError) -> Self {
        MessagingError::InvalidTopicName {
            topic: err.topic,
            reason: err.reason,
        }
    }
}

/// Result type alias for messaging operations
pub type MessagingResult<T> = Result<T, MessagingError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_messaging_error_creation() {
        let err = MessagingError::publish("orders", "broker unavailable");
        assert!(matches!(err, MessagingError::Publish { .. }));
        assert!(err.is_transient());

        let err = MessagingError::timeout("publish", Duration::from_secs(10));
        assert!(matches!(err, MessagingError::Timeout { timeout_ms: 10_000, .. }));

        assert!(!MessagingError::topic_not_found("orders").is_transient());
    }

    #[test]
    fn test_error_conversions() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid json").unwrap_err();
        let err: MessagingError = json_err.into();
        assert!(matches!(err, MessagingError::MessageDeserialization { .. }));

        let name_err = crate::validation::validate_topic_name("bad topic").unwrap_err();
        let err: MessagingError = name_err.into();
        assert!(matches!(err, MessagingError::InvalidTopicName { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = MessagingError::topic_admin("orders", "create", "quota exceeded");
        let display = format!("{err}");
        assert!(display.contains("Topic admin operation failed"));
        assert!(display.contains("orders"));
        assert!(display.contains("create"));
        assert!(display.contains("quota exceeded"));
    }
}
