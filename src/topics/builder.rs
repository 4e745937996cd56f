//! Fluent builder for topic options.
//!
//! Setter errors are accumulated instead of returned immediately so a whole
//! chain can be written without intermediate `?`; everything is reported at
//! [`TopicBuilder::validate`] or [`TopicBuilder::build`].

use std::time::Duration;
use thiserror::Error;

use super::options::{PersistenceMode, TopicOptions};
use super::reconciler::{ReconcileError, ReconciliationResult, TopicReconciler};
use crate::constants::limits::{MAX_PARTITIONS, MAX_REPLICATION_FACTOR};
use crate::validation::validate_topic_name;

const MIN_RETENTION: Duration = Duration::from_secs(60);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TopicBuilderError {
    #[error("topic builder for {topic} has {} validation errors: {}", .errors.len(), .errors.join("; "))]
    Invalid { topic: String, errors: Vec<String> },

    #[error("replication factor ({replication_factor}) should not exceed partitions ({partitions})")]
    ReplicationExceedsPartitions {
        replication_factor: u32,
        partitions: u32,
    },

    #[error("retention time too short: {retention_ms}ms (minimum 1 minute)")]
    RetentionTooShort { retention_ms: u64 },

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

#[derive(Debug, Clone)]
pub struct TopicBuilder {
    topic: String,
    options: TopicOptions,
    errors: Vec<String>,
}

impl TopicBuilder {
    pub fn new(topic: impl Into<String>) -> Self {
        let topic = topic.into();
        let errors = match validate_topic_name(&topic) {
            Ok(()) => Vec::new(),
            Err(e) => vec![e.to_string()],
        };
        Self {
            topic,
            options: TopicOptions::default(),
            errors,
        }
    }

    pub fn for_high_throughput(mut self) -> Self {
        self.options = TopicOptions::high_throughput();
        self
    }

    pub fn for_medium_throughput(mut self) -> Self {
        self.options = TopicOptions::medium_throughput();
        self
    }

    pub fn for_low_throughput(mut self) -> Self {
        self.options = TopicOptions::low_throughput();
        self
    }

    pub fn with_partitions(mut self, partitions: u32) -> Self {
        if partitions == 0 {
            self.errors
                .push("partitions must be positive, got 0".to_string());
        } else if partitions > MAX_PARTITIONS {
            self.errors.push(format!(
                "partitions should not exceed {MAX_PARTITIONS}, got {partitions}"
            ));
        } else {
            self.options.partitions = partitions;
        }
        self
    }

    pub fn with_replication(mut self, replication_factor: u32) -> Self {
        if replication_factor == 0 {
            self.errors
                .push("replication factor must be positive, got 0".to_string());
        } else if replication_factor > MAX_REPLICATION_FACTOR {
            self.errors.push(format!(
                "replication factor should not exceed {MAX_REPLICATION_FACTOR}, got {replication_factor}"
            ));
        } else {
            self.options.replication_factor = replication_factor;
        }
        self
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        if retention.is_zero() {
            self.errors
                .push("retention time must be positive".to_string());
        } else {
            self.options.retention_time = retention;
        }
        self
    }

    pub fn with_max_size(mut self, bytes: i64) -> Self {
        if bytes <= 0 {
            self.errors
                .push(format!("max size must be positive, got {bytes}"));
        } else {
            self.options.max_size_bytes = bytes;
        }
        self
    }

    pub fn with_max_messages(mut self, count: i64) -> Self {
        if count <= 0 {
            self.errors
                .push(format!("max messages must be positive, got {count}"));
        } else {
            self.options.max_messages = count;
        }
        self
    }

    pub fn with_persistence(mut self, mode: PersistenceMode) -> Self {
        self.options.persistence_mode = mode;
        self
    }

    pub fn persistent(self) -> Self {
        self.with_persistence(PersistenceMode::Persistent)
    }

    pub fn ephemeral(self) -> Self {
        self.with_persistence(PersistenceMode::Ephemeral)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.options.description = description.into();
        self
    }

    /// Three replicas, persistent, seven days of retention
    pub fn for_production(mut self) -> Self {
        self.options.replication_factor = 3;
        self.options.persistence_mode = PersistenceMode::Persistent;
        self.options.retention_time = Duration::from_secs(7 * 24 * 60 * 60);
        self
    }

    /// Single replica, persistent, one day of retention
    pub fn for_development(mut self) -> Self {
        self.options.replication_factor = 1;
        self.options.persistence_mode = PersistenceMode::Persistent;
        self.options.retention_time = Duration::from_secs(24 * 60 * 60);
        self
    }

    /// Single replica, ephemeral, one hour of retention
    pub fn for_testing(mut self) -> Self {
        self.options.replication_factor = 1;
        self.options.persistence_mode = PersistenceMode::Ephemeral;
        self.options.retention_time = Duration::from_secs(60 * 60);
        self
    }

    pub fn validate(&self) -> Result<(), TopicBuilderError> {
        if !self.errors.is_empty() {
            return Err(TopicBuilderError::Invalid {
                topic: self.topic.clone(),
                errors: self.errors.clone(),
            });
        }

        let TopicOptions {
            partitions,
            replication_factor,
            retention_time,
            ..
        } = self.options;

        if partitions > 0 && replication_factor > partitions {
            return Err(TopicBuilderError::ReplicationExceedsPartitions {
                replication_factor,
                partitions,
            });
        }

        if !retention_time.is_zero() && retention_time < MIN_RETENTION {
            return Err(TopicBuilderError::RetentionTooShort {
                retention_ms: retention_time.as_millis() as u64,
            });
        }

        Ok(())
    }

    /// Validate, then reconcile the topic through `reconciler`
    pub async fn build(
        self,
        reconciler: &TopicReconciler,
    ) -> Result<ReconciliationResult, TopicBuilderError> {
        self.validate()?;
        Ok(reconciler.reconcile(&self.topic, self.options).await?)
    }

    pub fn options(&self) -> &TopicOptions {
        &self.options
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::InMemoryTransport;
    use crate::topics::ReconcileAction;
    use std::sync::Arc;

    #[test]
    fn test_preset_then_override() {
        let builder = TopicBuilder::new("orders")
            .for_high_throughput()
            .with_partitions(15)
            .with_description("order events");

        assert!(builder.validate().is_ok());
        assert_eq!(builder.options().partitions, 15);
        assert_eq!(builder.options().replication_factor, 3);
        assert_eq!(builder.options().description, "order events");
    }

    #[test]
    fn test_errors_accumulate() {
        let builder = TopicBuilder::new("orders")
            .with_partitions(0)
            .with_replication(9)
            .with_max_size(-1);

        match builder.validate() {
            Err(TopicBuilderError::Invalid { topic, errors }) => {
                assert_eq!(topic, "orders");
                assert_eq!(errors.len(), 3);
            }
            other => panic!("expected accumulated errors, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_topic_name_recorded() {
        let builder = TopicBuilder::new("订单");
        let err = builder.validate().unwrap_err();
        assert!(err.to_string().contains("non-ASCII"));
    }

    #[test]
    fn test_cross_field_rules() {
        let err = TopicBuilder::new("orders")
            .with_partitions(2)
            .with_replication(3)
            .validate()
            .unwrap_err();
        assert!(matches!(
            err,
            TopicBuilderError::ReplicationExceedsPartitions { .. }
        ));

        let err = TopicBuilder::new("orders")
            .with_retention(Duration::from_secs(10))
            .validate()
            .unwrap_err();
        assert_eq!(
            err,
            TopicBuilderError::RetentionTooShort {
                retention_ms: 10_000
            }
        );
    }

    #[test]
    fn test_environment_profiles() {
        let testing = TopicBuilder::new("orders").for_testing();
        assert_eq!(
            testing.options().persistence_mode,
            PersistenceMode::Ephemeral
        );

        let production = TopicBuilder::new("orders")
            .for_low_throughput()
            .for_production();
        assert_eq!(production.options().replication_factor, 3);
        assert!(production.validate().is_ok());
    }

    #[tokio::test]
    async fn test_build_creates_topic() {
        let transport = Arc::new(InMemoryTransport::new());
        let reconciler = TopicReconciler::with_defaults(transport.clone());

        let result = TopicBuilder::new("orders")
            .for_medium_throughput()
            .build(&reconciler)
            .await
            .unwrap();

        assert_eq!(result.action, ReconcileAction::Created);
        assert_eq!(transport.topic_options("orders").unwrap().partitions, 5);
    }

    #[tokio::test]
    async fn test_invalid_builder_never_reaches_broker() {
        let transport = Arc::new(InMemoryTransport::new());
        let reconciler = TopicReconciler::with_defaults(transport.clone());

        let result = TopicBuilder::new("orders")
            .with_partitions(500)
            .build(&reconciler)
            .await;

        assert!(result.is_err());
        assert_eq!(transport.admin_call_count(), 0);
    }
}
