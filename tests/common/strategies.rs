//! Proptest strategies for identities, subjects and topic options

use eventbus_control::topics::{PersistenceMode, TopicOptions};
use proptest::prelude::*;
use std::time::Duration;

/// Identities drawn from the accepted grammar
pub fn aggregate_id_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9:_/-]{1,64}"
}

/// Strings containing at least one character outside the grammar
pub fn invalid_aggregate_id_strategy() -> impl Strategy<Value = String> {
    ("[A-Za-z0-9]{0,8}", "[@#$%^&*()+= !?]", "[A-Za-z0-9]{0,8}")
        .prop_map(|(prefix, bad, suffix)| format!("{prefix}{bad}{suffix}"))
}

pub fn persistence_mode_strategy() -> impl Strategy<Value = PersistenceMode> {
    prop_oneof![
        Just(PersistenceMode::Persistent),
        Just(PersistenceMode::Ephemeral),
        Just(PersistenceMode::Auto),
    ]
}

pub fn topic_options_strategy() -> impl Strategy<Value = TopicOptions> {
    (
        persistence_mode_strategy(),
        0u64..(7 * 24 * 60 * 60 * 1_000),
        0i64..(1 << 30),
        0i64..1_000_000,
        0u32..=100,
        0u32..=5,
    )
        .prop_map(
            |(persistence_mode, retention_ms, max_size, max_messages, partitions, replication)| {
                TopicOptions {
                    persistence_mode,
                    retention_time: Duration::from_millis(retention_ms),
                    max_size_bytes: max_size,
                    max_messages,
                    partitions,
                    replication_factor: replication,
                    description: String::new(),
                }
            },
        )
}

/// JSON object text with unsorted keys, big integers and decimals, as a producer might emit it
pub fn json_payload_strategy() -> impl Strategy<Value = String> {
    let value = prop_oneof![
        any::<i64>().prop_map(|n| n.to_string()),
        "[1-9][0-9]{19,30}",
        "-?[1-9][0-9]{0,3}\\.[0-9]{1,3}0",
        "[a-z ]{0,12}".prop_map(|s| format!("\"{s}\"")),
        Just("null".to_string()),
    ];
    prop::collection::vec(("[a-z]{1,8}", value), 0..6).prop_map(|fields| {
        let body: Vec<String> = fields
            .into_iter()
            .map(|(key, value)| format!("\"{key}\": {value}"))
            .collect();
        format!("{{{}}}", body.join(", "))
    })
}
