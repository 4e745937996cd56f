use thiserror::Error;

use crate::config::ConfigurationError;
use crate::health::HeartbeatError;
use crate::messaging::{EnvelopeError, MessagingError};
use crate::topics::{ReconcileError, TopicBuilderError};
use crate::validation::{IdentityError, TopicNameValidationError};

/// Crate-level error for callers that drive several components at once
#[derive(Error, Debug)]
pub enum ControlPlaneError {
    #[error("Messaging error: {0}")]
    Messaging(#[from] MessagingError),

    #[error("Envelope error: {0}")]
    Envelope(#[from] EnvelopeError),

    #[error("Heartbeat error: {0}")]
    Heartbeat(#[from] HeartbeatError),

    #[error("Reconcile error: {0}")]
    Reconcile(#[from] ReconcileError),

    #[error("Topic builder error: {0}")]
    TopicBuilder(#[from] TopicBuilderError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Topic name error: {0}")]
    TopicName(#[from] TopicNameValidationError),
}

pub type Result<T> = std::result::Result<T, ControlPlaneError>;
