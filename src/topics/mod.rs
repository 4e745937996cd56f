//! # Topic Configuration
//!
//! Desired topic options, a validating builder, and the reconciler that
//! keeps the broker in line with them.

pub mod builder;
pub mod options;
pub mod reconciler;

pub use builder::{TopicBuilder, TopicBuilderError};
pub use options::{PersistenceMode, TopicOptions};
pub use reconciler::{
    compare_topic_options, should_create_or_update, ConfigMismatch, MismatchAction,
    MismatchLogLevel, ReconcileAction, ReconcileError, ReconcileStrategy, ReconcilerPolicy,
    ReconciliationResult, TopicReconciler,
};
