//! Input validation for identities and topic names
//!
//! Both grammars are deliberately narrow: aggregate identities end up as
//! broker keys and lane selectors, and topic names have to be accepted by
//! every supported transport.

use crate::constants::limits::{MAX_AGGREGATE_ID_LENGTH, MAX_TOPIC_NAME_LENGTH};
use thiserror::Error;

/// Aggregate identity grammar violations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("aggregate_id cannot be empty")]
    Empty,

    #[error("aggregate_id too long ({length} characters, maximum {max})")]
    TooLong { length: usize, max: usize },

    #[error("aggregate_id contains invalid character: {character}")]
    InvalidCharacter { character: char },
}

/// Topic name validation failure, carrying the rejected name
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid topic name '{topic}': {reason}")]
pub struct TopicNameValidationError {
    pub topic: String,
    pub reason: String,
}

impl TopicNameValidationError {
    fn new(topic: &str, reason: impl Into<String>) -> Self {
        Self {
            topic: topic.to_string(),
            reason: reason.into(),
        }
    }
}

/// Characters permitted in an aggregate identity besides ASCII alphanumerics
fn is_identity_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, ':' | '_' | '-' | '.' | '/')
}

/// Validates an aggregate identity.
///
/// The value is trimmed first; the trimmed form must be non-empty, at most
/// 256 characters, and drawn from `[A-Za-z0-9:_\-./]`.
pub fn validate_aggregate_id(id: &str) -> Result<(), IdentityError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(IdentityError::Empty);
    }

    let length = id.chars().count();
    if length > MAX_AGGREGATE_ID_LENGTH {
        return Err(IdentityError::TooLong {
            length,
            max: MAX_AGGREGATE_ID_LENGTH,
        });
    }

    if let Some(character) = id.chars().find(|c| !is_identity_char(*c)) {
        return Err(IdentityError::InvalidCharacter { character });
    }

    Ok(())
}

/// Returns the trimmed identity when it satisfies the grammar
pub fn normalized_aggregate_id(id: &str) -> Option<&str> {
    validate_aggregate_id(id).ok().map(|()| id.trim())
}

/// Validates a topic name against the cross-transport grammar
pub fn validate_topic_name(topic: &str) -> Result<(), TopicNameValidationError> {
    if topic.is_empty() {
        return Err(TopicNameValidationError::new(
            topic,
            "topic name cannot be empty",
        ));
    }

    if topic.len() > MAX_TOPIC_NAME_LENGTH {
        return Err(TopicNameValidationError::new(
            topic,
            format!(
                "topic name too long ({} characters, maximum {MAX_TOPIC_NAME_LENGTH})",
                topic.len()
            ),
        ));
    }

    for (position, c) in topic.chars().enumerate() {
        if c == ' ' {
            return Err(TopicNameValidationError::new(
                topic,
                "topic name cannot contain spaces",
            ));
        }
        if !c.is_ascii() {
            return Err(TopicNameValidationError::new(
                topic,
                format!(
                    "topic name contains non-ASCII character '{c}' at position {position} \
                     (ASCII characters only; Chinese and other non-ASCII scripts are not supported)"
                ),
            ));
        }
        if c.is_ascii_control() {
            return Err(TopicNameValidationError::new(
                topic,
                format!("topic name contains control character at position {position}"),
            ));
        }
    }

    Ok(())
}

pub fn is_valid_topic_name(topic: &str) -> bool {
    validate_topic_name(topic).is_ok()
}
