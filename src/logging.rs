//! # Structured Logging Module
//!
//! Environment-aware structured logging for the control plane's background
//! loops. Output is human-readable by default and JSON when
//! `EVENTBUS_LOG_FORMAT=json`; `RUST_LOG` overrides the per-environment level.

use chrono::Utc;
use std::process;
use std::sync::OnceLock;
use std::time::Duration;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let json = wants_json_output();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(get_log_level(&environment)));

        let layer = if json {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .json()
                .with_filter(filter)
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_filter(filter)
                .boxed()
        };

        // Embedding applications may already own the global subscriber
        if tracing_subscriber::registry().with(layer).try_init().is_err() {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
        }

        tracing::info!(
            pid = process::id(),
            environment = %environment,
            json = json,
            "🔧 STRUCTURED LOGGING: Initialized"
        );
    });
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var("EVENTBUS_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

fn wants_json_output() -> bool {
    std::env::var("EVENTBUS_LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> String {
    match environment {
        "test" => "debug".to_string(),
        "development" => "debug".to_string(),
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

/// Log structured data for heartbeat operations
pub fn log_heartbeat_operation(
    operation: &str,
    source: &str,
    event_bus_type: &str,
    status: &str,
    duration: Option<Duration>,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        source = %source,
        event_bus_type = %event_bus_type,
        status = %status,
        duration_ms = duration.map(|d| d.as_millis() as u64),
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "💓 HEARTBEAT_OPERATION"
    );
}

/// Log structured data for topic reconciliation operations
pub fn log_topic_operation(
    operation: &str,
    topic: &str,
    strategy: &str,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        topic = %topic,
        strategy = %strategy,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "🗂️ TOPIC_OPERATION"
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "❌ ERROR"
    );
}
