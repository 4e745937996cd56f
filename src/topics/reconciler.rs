//! # Topic Reconciler
//!
//! Synchronizes desired topic configuration with what the broker actually
//! has. The broker is always re-queried; the in-memory table only records
//! intent after a reconcile succeeds.
//!
//! ## Strategies
//!
//! | strategy | topic absent | topic present |
//! |---|---|---|
//! | `create_only` | create | report mismatches, no mutation |
//! | `create_or_update` | create | apply auto-fixable fields only |
//! | `validate_only` | report | report mismatches, no mutation |
//! | `skip` | nothing | nothing |
//!
//! Mismatches that are not applied are logged at the policy's level together
//! with a recommendation; a fail-fast policy turns them into
//! [`ReconcileError::UnresolvedMismatches`].

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::options::TopicOptions;
use crate::constants::defaults::{RETENTION_TOLERANCE, TOPIC_SYNC_TIMEOUT};
use crate::logging::{log_error, log_topic_operation};
use crate::messaging::{MessagingError, TopicAdmin};
use crate::validation::{validate_topic_name, TopicNameValidationError};

/// How desired configuration is pushed to the broker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileStrategy {
    CreateOnly,
    #[default]
    CreateOrUpdate,
    ValidateOnly,
    Skip,
}

impl ReconcileStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateOnly => "create_only",
            Self::CreateOrUpdate => "create_or_update",
            Self::ValidateOnly => "validate_only",
            Self::Skip => "skip",
        }
    }
}

impl fmt::Display for ReconcileStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReconcileStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create_only" => Ok(Self::CreateOnly),
            "create_or_update" => Ok(Self::CreateOrUpdate),
            "validate_only" => Ok(Self::ValidateOnly),
            "skip" => Ok(Self::Skip),
            other => Err(format!("unknown topic reconcile strategy: {other}")),
        }
    }
}

/// Returns `(should_create, should_update)` for a strategy and existence state
pub fn should_create_or_update(strategy: ReconcileStrategy, exists: bool) -> (bool, bool) {
    match strategy {
        ReconcileStrategy::CreateOnly => (!exists, false),
        ReconcileStrategy::CreateOrUpdate => (!exists, exists),
        ReconcileStrategy::ValidateOnly | ReconcileStrategy::Skip => (false, false),
    }
}

/// Level unresolved mismatches are logged at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MismatchLogLevel {
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl FromStr for MismatchLogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown mismatch log level: {other}")),
        }
    }
}

/// What to do with mismatches that were not applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MismatchAction {
    pub log_level: MismatchLogLevel,
    pub fail_fast: bool,
}

/// Reconciler behavior: strategy, mismatch handling, and per-call deadline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerPolicy {
    pub strategy: ReconcileStrategy,
    pub on_mismatch: MismatchAction,
    pub sync_timeout: Duration,
}

impl Default for ReconcilerPolicy {
    fn default() -> Self {
        Self {
            strategy: ReconcileStrategy::CreateOrUpdate,
            on_mismatch: MismatchAction {
                log_level: MismatchLogLevel::Warn,
                fail_fast: false,
            },
            sync_timeout: TOPIC_SYNC_TIMEOUT,
        }
    }
}

impl ReconcilerPolicy {
    /// Create missing topics but never touch existing ones
    pub fn production() -> Self {
        Self {
            strategy: ReconcileStrategy::CreateOnly,
            ..Self::default()
        }
    }

    /// Report only, and fail on any mismatch
    pub fn strict() -> Self {
        Self {
            strategy: ReconcileStrategy::ValidateOnly,
            on_mismatch: MismatchAction {
                log_level: MismatchLogLevel::Error,
                fail_fast: true,
            },
            sync_timeout: TOPIC_SYNC_TIMEOUT,
        }
    }
}

/// A single field where the broker disagrees with the desired configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigMismatch {
    pub topic: String,
    pub field: String,
    pub expected_value: String,
    pub actual_value: String,
    pub can_auto_fix: bool,
    pub recommendation: String,
}

impl ConfigMismatch {
    fn new(
        topic: &str,
        field: &str,
        expected: impl fmt::Display,
        actual: impl fmt::Display,
        can_auto_fix: bool,
        recommendation: &str,
    ) -> Self {
        Self {
            topic: topic.to_string(),
            field: field.to_string(),
            expected_value: expected.to_string(),
            actual_value: actual.to_string(),
            can_auto_fix,
            recommendation: recommendation.to_string(),
        }
    }
}

/// What a reconcile did to the broker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileAction {
    Created,
    Updated,
    Validated,
    Skipped,
}

impl fmt::Display for ReconcileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Validated => "validated",
            Self::Skipped => "skipped",
        };
        f.write_str(action)
    }
}

/// Outcome of one reconcile call
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationResult {
    pub topic: String,
    pub action: ReconcileAction,
    pub success: bool,
    pub error: Option<String>,
    pub mismatches: Vec<ConfigMismatch>,
    pub duration: Duration,
}

impl ReconciliationResult {
    /// Mismatches that were detected but not applied
    pub fn unresolved(&self) -> impl Iterator<Item = &ConfigMismatch> {
        let applied = self.action == ReconcileAction::Updated;
        self.mismatches
            .iter()
            .filter(move |m| !(applied && m.can_auto_fix))
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReconcileError {
    #[error("topic reconciliation for {topic} timed out after {timeout_ms}ms")]
    Timeout { topic: String, timeout_ms: u64 },

    #[error("topic admin call failed: {0}")]
    Transport(#[from] MessagingError),

    #[error("topic config validation failed for {topic}: found {} mismatches", .mismatches.len())]
    UnresolvedMismatches {
        topic: String,
        mismatches: Vec<ConfigMismatch>,
    },

    #[error("no configuration recorded for topic {topic}")]
    UnknownTopic { topic: String },

    #[error(transparent)]
    InvalidTopicName(#[from] TopicNameValidationError),
}

/// Compare desired against actual options, field by field
pub fn compare_topic_options(
    topic: &str,
    expected: &TopicOptions,
    actual: &TopicOptions,
) -> Vec<ConfigMismatch> {
    let mut mismatches = Vec::new();

    if expected.persistence_mode != actual.persistence_mode {
        mismatches.push(ConfigMismatch::new(
            topic,
            "persistence_mode",
            expected.persistence_mode,
            actual.persistence_mode,
            false,
            "Persistence mode cannot be changed after creation. Consider creating a new topic.",
        ));
    }

    if !expected.retention_time.is_zero() && !actual.retention_time.is_zero() {
        let diff = if expected.retention_time > actual.retention_time {
            expected.retention_time - actual.retention_time
        } else {
            actual.retention_time - expected.retention_time
        };
        if diff > RETENTION_TOLERANCE {
            mismatches.push(ConfigMismatch::new(
                topic,
                "retention_time",
                format!("{}ms", expected.retention_time.as_millis()),
                format!("{}ms", actual.retention_time.as_millis()),
                true,
                "Retention time can be updated. Set strategy to 'create_or_update' to auto-fix.",
            ));
        }
    }

    if expected.max_size_bytes > 0
        && actual.max_size_bytes > 0
        && expected.max_size_bytes != actual.max_size_bytes
    {
        mismatches.push(ConfigMismatch::new(
            topic,
            "max_size_bytes",
            expected.max_size_bytes,
            actual.max_size_bytes,
            true,
            "Max size can be updated. Set strategy to 'create_or_update' to auto-fix.",
        ));
    }

    if expected.max_messages > 0
        && actual.max_messages > 0
        && expected.max_messages != actual.max_messages
    {
        mismatches.push(ConfigMismatch::new(
            topic,
            "max_messages",
            expected.max_messages,
            actual.max_messages,
            true,
            "Max messages can be updated. Set strategy to 'create_or_update' to auto-fix.",
        ));
    }

    if expected.partitions > 0 && actual.partitions > 0 && expected.partitions != actual.partitions
    {
        let growing = expected.partitions > actual.partitions;
        mismatches.push(ConfigMismatch::new(
            topic,
            "partitions",
            expected.partitions,
            actual.partitions,
            growing,
            if growing {
                "Partitions can be increased. Set strategy to 'create_or_update' to auto-fix."
            } else {
                "Partition count cannot be decreased. Consider creating a new topic."
            },
        ));
    }

    if expected.replication_factor > 0
        && actual.replication_factor > 0
        && expected.replication_factor != actual.replication_factor
    {
        mismatches.push(ConfigMismatch::new(
            topic,
            "replication_factor",
            expected.replication_factor,
            actual.replication_factor,
            false,
            "Replication factor cannot be changed after creation. Consider creating a new topic.",
        ));
    }

    mismatches
}

/// Actual options with only the auto-fixable mismatched fields taken from desired
fn apply_auto_fixes(
    desired: &TopicOptions,
    actual: &TopicOptions,
    mismatches: &[ConfigMismatch],
) -> TopicOptions {
    let mut merged = actual.clone();
    for mismatch in mismatches.iter().filter(|m| m.can_auto_fix) {
        match mismatch.field.as_str() {
            "retention_time" => merged.retention_time = desired.retention_time,
            "max_size_bytes" => merged.max_size_bytes = desired.max_size_bytes,
            "max_messages" => merged.max_messages = desired.max_messages,
            "partitions" => merged.partitions = desired.partitions,
            _ => {}
        }
    }
    merged
}

/// Strategy-driven synchronizer of desired vs. actual topic configuration
pub struct TopicReconciler {
    admin: Arc<dyn TopicAdmin>,
    strategy: RwLock<ReconcileStrategy>,
    on_mismatch: MismatchAction,
    sync_timeout: Duration,
    desired: RwLock<HashMap<String, TopicOptions>>,
}

impl fmt::Debug for TopicReconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TopicReconciler")
            .field("strategy", &self.strategy())
            .field("on_mismatch", &self.on_mismatch)
            .field("sync_timeout", &self.sync_timeout)
            .field("configured_topics", &self.desired.read().len())
            .finish()
    }
}

impl TopicReconciler {
    pub fn new(admin: Arc<dyn TopicAdmin>, policy: ReconcilerPolicy) -> Self {
        Self {
            admin,
            strategy: RwLock::new(policy.strategy),
            on_mismatch: policy.on_mismatch,
            sync_timeout: policy.sync_timeout,
            desired: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_defaults(admin: Arc<dyn TopicAdmin>) -> Self {
        Self::new(admin, ReconcilerPolicy::default())
    }

    pub fn strategy(&self) -> ReconcileStrategy {
        *self.strategy.read()
    }

    pub fn set_strategy(&self, strategy: ReconcileStrategy) {
        let previous = std::mem::replace(&mut *self.strategy.write(), strategy);
        info!(
            previous = %previous,
            strategy = %strategy,
            "🔧 Topic reconcile strategy changed"
        );
    }

    /// Bring one topic in line with `desired` according to the current strategy
    pub async fn reconcile(
        &self,
        topic: &str,
        desired: TopicOptions,
    ) -> Result<ReconciliationResult, ReconcileError> {
        validate_topic_name(topic)?;
        let strategy = self.strategy();
        let started = Instant::now();

        if strategy == ReconcileStrategy::Skip {
            self.desired.write().insert(topic.to_string(), desired);
            let result = ReconciliationResult {
                topic: topic.to_string(),
                action: ReconcileAction::Skipped,
                success: true,
                error: None,
                mismatches: Vec::new(),
                duration: started.elapsed(),
            };
            log_result(&result, strategy);
            return Ok(result);
        }

        let outcome =
            tokio::time::timeout(self.sync_timeout, self.sync(topic, &desired, strategy)).await;

        let mut result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                error!(
                    topic = %topic,
                    strategy = %strategy,
                    error = %e,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "❌ Topic reconcile failed"
                );
                return Err(e.into());
            }
            Err(_) => {
                error!(
                    topic = %topic,
                    strategy = %strategy,
                    timeout_ms = self.sync_timeout.as_millis() as u64,
                    "⏰ Topic reconcile timed out"
                );
                return Err(ReconcileError::Timeout {
                    topic: topic.to_string(),
                    timeout_ms: self.sync_timeout.as_millis() as u64,
                });
            }
        };
        result.duration = started.elapsed();

        let unresolved: Vec<ConfigMismatch> = result.unresolved().cloned().collect();
        self.handle_unresolved(&unresolved);
        log_result(&result, strategy);

        if self.on_mismatch.fail_fast && !unresolved.is_empty() {
            return Err(ReconcileError::UnresolvedMismatches {
                topic: topic.to_string(),
                mismatches: unresolved,
            });
        }

        if result.success {
            self.desired.write().insert(topic.to_string(), desired);
        }
        Ok(result)
    }

    /// Report mismatches between `desired` and the broker without mutating anything
    pub async fn validate(
        &self,
        topic: &str,
        desired: &TopicOptions,
    ) -> Result<Vec<ConfigMismatch>, ReconcileError> {
        validate_topic_name(topic)?;

        let described = tokio::time::timeout(self.sync_timeout, self.admin.describe_topic(topic))
            .await
            .map_err(|_| ReconcileError::Timeout {
                topic: topic.to_string(),
                timeout_ms: self.sync_timeout.as_millis() as u64,
            })??;

        match described {
            Some(actual) => Ok(compare_topic_options(topic, desired, &actual)),
            None => Err(MessagingError::topic_not_found(topic).into()),
        }
    }

    /// Desired options recorded by the last successful reconcile
    pub fn get(&self, topic: &str) -> Result<TopicOptions, ReconcileError> {
        self.desired
            .read()
            .get(topic)
            .cloned()
            .ok_or_else(|| ReconcileError::UnknownTopic {
                topic: topic.to_string(),
            })
    }

    /// Topics with recorded desired options, sorted
    pub fn list(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.desired.read().keys().cloned().collect();
        topics.sort();
        topics
    }

    /// Forget the recorded options for a topic; the broker is not touched
    pub fn remove(&self, topic: &str) -> Result<(), ReconcileError> {
        match self.desired.write().remove(topic) {
            Some(_) => {
                debug!(topic = %topic, "Removed recorded topic configuration");
                Ok(())
            }
            None => Err(ReconcileError::UnknownTopic {
                topic: topic.to_string(),
            }),
        }
    }

    async fn sync(
        &self,
        topic: &str,
        desired: &TopicOptions,
        strategy: ReconcileStrategy,
    ) -> Result<ReconciliationResult, MessagingError> {
        let actual = self.admin.describe_topic(topic).await?;
        let (should_create, should_update) = should_create_or_update(strategy, actual.is_some());

        let mut result = ReconciliationResult {
            topic: topic.to_string(),
            action: ReconcileAction::Validated,
            success: true,
            error: None,
            mismatches: Vec::new(),
            duration: Duration::ZERO,
        };

        let Some(actual) = actual else {
            if should_create {
                self.admin.create_topic(topic, desired).await?;
                result.action = ReconcileAction::Created;
            } else {
                result.success = false;
                result.error = Some(format!("topic {topic} does not exist"));
            }
            return Ok(result);
        };

        result.mismatches = compare_topic_options(topic, desired, &actual);

        if should_update && result.mismatches.iter().any(|m| m.can_auto_fix) {
            let merged = apply_auto_fixes(desired, &actual, &result.mismatches);
            self.admin.update_topic(topic, &merged).await?;
            result.action = ReconcileAction::Updated;

            for fixed in result.mismatches.iter().filter(|m| m.can_auto_fix) {
                warn!(
                    topic = %fixed.topic,
                    field = %fixed.field,
                    expected = %fixed.expected_value,
                    actual = %fixed.actual_value,
                    "🔧 Auto-fixed topic config mismatch"
                );
            }
        }

        Ok(result)
    }

    fn handle_unresolved(&self, mismatches: &[ConfigMismatch]) {
        for mismatch in mismatches {
            log_mismatch(mismatch, self.on_mismatch.log_level);
        }
    }
}

fn log_mismatch(mismatch: &ConfigMismatch, level: MismatchLogLevel) {
    match level {
        MismatchLogLevel::Debug => debug!(
            topic = %mismatch.topic,
            field = %mismatch.field,
            expected = %mismatch.expected_value,
            actual = %mismatch.actual_value,
            "Topic config mismatch"
        ),
        MismatchLogLevel::Info => info!(
            topic = %mismatch.topic,
            field = %mismatch.field,
            expected = %mismatch.expected_value,
            actual = %mismatch.actual_value,
            "Topic config mismatch"
        ),
        MismatchLogLevel::Warn => warn!(
            topic = %mismatch.topic,
            field = %mismatch.field,
            expected = %mismatch.expected_value,
            actual = %mismatch.actual_value,
            recommendation = %mismatch.recommendation,
            "⚠️ Topic config mismatch"
        ),
        MismatchLogLevel::Error => error!(
            topic = %mismatch.topic,
            field = %mismatch.field,
            expected = %mismatch.expected_value,
            actual = %mismatch.actual_value,
            recommendation = %mismatch.recommendation,
            "❌ Topic config mismatch"
        ),
    }
}

fn log_result(result: &ReconciliationResult, strategy: ReconcileStrategy) {
    let action = result.action.to_string();
    if result.success {
        let details = format!("{action} in {}ms", result.duration.as_millis());
        log_topic_operation(
            "reconcile",
            &result.topic,
            strategy.as_str(),
            "completed",
            Some(details.as_str()),
        );
    } else {
        let context = format!("topic={} strategy={strategy} action={action}", result.topic);
        log_error(
            "topic_reconciler",
            "reconcile",
            result.error.as_deref().unwrap_or("unknown"),
            Some(context.as_str()),
        );
    }

    if !result.mismatches.is_empty() {
        warn!(
            topic = %result.topic,
            count = result.mismatches.len(),
            "Topic config mismatches detected"
        );
    }
}
