//! Topic reconciliation against the in-memory broker

use eventbus_control::messaging::InMemoryTransport;
use eventbus_control::topics::{
    PersistenceMode, ReconcileAction, ReconcileError, ReconcileStrategy, ReconcilerPolicy,
    TopicBuilder, TopicOptions, TopicReconciler,
};
use std::sync::Arc;
use std::time::Duration;

fn reconciler(transport: &Arc<InMemoryTransport>, policy: ReconcilerPolicy) -> TopicReconciler {
    TopicReconciler::new(transport.clone(), policy)
}

fn with_partitions(partitions: u32) -> TopicOptions {
    TopicOptions {
        partitions,
        ..TopicOptions::default()
    }
}

#[tokio::test]
async fn test_missing_topic_is_created_and_recorded() {
    let transport = Arc::new(InMemoryTransport::new());
    let reconciler = reconciler(&transport, ReconcilerPolicy::default());
    let desired = TopicOptions::medium_throughput();

    let result = reconciler.reconcile("orders.events", desired.clone()).await.unwrap();

    assert_eq!(result.action, ReconcileAction::Created);
    assert!(result.success);
    assert_eq!(transport.topic_options("orders.events"), Some(desired.clone()));
    assert_eq!(reconciler.get("orders.events").unwrap(), desired);
    assert_eq!(reconciler.list(), vec!["orders.events".to_string()]);
}

#[tokio::test]
async fn test_partition_growth_is_auto_fixed() {
    let transport = Arc::new(InMemoryTransport::new());
    transport.insert_topic("orders", with_partitions(5));
    let reconciler = reconciler(&transport, ReconcilerPolicy::default());

    let result = reconciler.reconcile("orders", with_partitions(10)).await.unwrap();

    assert_eq!(result.action, ReconcileAction::Updated);
    let mismatch = &result.mismatches[0];
    assert_eq!(mismatch.field, "partitions");
    assert!(mismatch.can_auto_fix);
    assert_eq!(transport.topic_options("orders").unwrap().partitions, 10);
}

#[tokio::test]
async fn test_partition_shrink_is_never_applied() {
    let transport = Arc::new(InMemoryTransport::new());
    transport.insert_topic("orders", with_partitions(10));
    let reconciler = reconciler(&transport, ReconcilerPolicy::default());

    let result = reconciler.reconcile("orders", with_partitions(5)).await.unwrap();

    assert_eq!(result.action, ReconcileAction::Validated);
    assert!(!result.mismatches[0].can_auto_fix);
    assert_eq!(result.unresolved().count(), 1);
    assert_eq!(transport.topic_options("orders").unwrap().partitions, 10);
}

#[tokio::test]
async fn test_strict_policy_fails_fast_on_unresolved_mismatch() {
    let transport = Arc::new(InMemoryTransport::new());
    transport.insert_topic(
        "payments",
        TopicOptions {
            persistence_mode: PersistenceMode::Ephemeral,
            ..TopicOptions::default()
        },
    );
    let reconciler = reconciler(&transport, ReconcilerPolicy::strict());

    let err = reconciler
        .reconcile("payments", TopicOptions::default())
        .await
        .unwrap_err();

    match err {
        ReconcileError::UnresolvedMismatches { topic, mismatches } => {
            assert_eq!(topic, "payments");
            assert_eq!(mismatches[0].field, "persistence_mode");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(reconciler.get("payments").is_err());
    assert_eq!(
        transport.topic_options("payments").unwrap().persistence_mode,
        PersistenceMode::Ephemeral
    );
}

#[tokio::test]
async fn test_skip_makes_no_transport_calls() {
    let transport = Arc::new(InMemoryTransport::new());
    let reconciler = reconciler(&transport, ReconcilerPolicy::default());
    reconciler.set_strategy(ReconcileStrategy::Skip);

    let result = reconciler
        .reconcile("audit", TopicOptions::low_throughput())
        .await
        .unwrap();

    assert_eq!(result.action, ReconcileAction::Skipped);
    assert_eq!(transport.admin_call_count(), 0);
    assert_eq!(reconciler.get("audit").unwrap(), TopicOptions::low_throughput());
    assert!(transport.topic_options("audit").is_none());
}

#[tokio::test]
async fn test_validate_only_reports_without_mutating() {
    let transport = Arc::new(InMemoryTransport::new());
    transport.insert_topic("orders", TopicOptions::low_throughput());
    let reconciler = reconciler(&transport, ReconcilerPolicy::default());
    reconciler.set_strategy(ReconcileStrategy::ValidateOnly);

    let result = reconciler
        .reconcile("orders", TopicOptions::high_throughput())
        .await
        .unwrap();

    assert_eq!(result.action, ReconcileAction::Validated);
    assert!(!result.mismatches.is_empty());
    assert_eq!(
        transport.topic_options("orders"),
        Some(TopicOptions::low_throughput())
    );

    let missing = reconciler
        .reconcile("absent", TopicOptions::default())
        .await
        .unwrap();
    assert!(!missing.success);
    assert!(transport.topic_options("absent").is_none());
}

#[tokio::test]
async fn test_retention_within_tolerance_is_ignored() {
    let transport = Arc::new(InMemoryTransport::new());
    let actual = TopicOptions::default();
    transport.insert_topic("orders", actual.clone());
    let reconciler = reconciler(&transport, ReconcilerPolicy::default());

    let desired = TopicOptions {
        retention_time: actual.retention_time + Duration::from_millis(500),
        ..actual
    };
    let mismatches = reconciler.validate("orders", &desired).await.unwrap();
    assert!(mismatches.is_empty());
}

#[tokio::test]
async fn test_closed_transport_surfaces_as_transport_error() {
    let transport = Arc::new(InMemoryTransport::new());
    let reconciler = reconciler(&transport, ReconcilerPolicy::default());
    transport.close();

    let err = reconciler
        .reconcile("orders", TopicOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::Transport(_)));
    assert!(reconciler.list().is_empty());
}

#[tokio::test]
async fn test_builder_drives_reconciler() {
    let transport = Arc::new(InMemoryTransport::new());
    let reconciler = reconciler(&transport, ReconcilerPolicy::production());

    let result = TopicBuilder::new("orders.created")
        .for_medium_throughput()
        .with_partitions(6)
        .with_description("order creation events")
        .build(&reconciler)
        .await
        .unwrap();

    assert_eq!(result.action, ReconcileAction::Created);
    let stored = transport.topic_options("orders.created").unwrap();
    assert_eq!(stored.partitions, 6);
    assert_eq!(stored.description, "order creation events");

    let invalid = TopicBuilder::new("bad topic!")
        .with_partitions(0)
        .build(&reconciler)
        .await;
    assert!(invalid.is_err());
    assert_eq!(reconciler.list(), vec!["orders.created".to_string()]);
}
