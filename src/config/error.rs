//! Configuration Error Types
//!
//! Error handling for configuration loading and validation, with specific,
//! actionable messages for each failure.

use thiserror::Error;

/// Configuration-related errors with detailed context
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigurationError {
    /// A configuration source could not be read or parsed
    #[error("Failed to load configuration for environment '{environment}': {error}")]
    LoadError { environment: String, error: String },

    /// Loaded values could not be mapped onto the configuration structure
    #[error("Type mismatch for field {field}: expected {expected}, got {actual}")]
    TypeMismatch {
        field: String,
        expected: String,
        actual: String,
    },

    /// Missing required configuration field
    #[error("Missing required configuration field '{field}' in {context}")]
    MissingRequiredField { field: String, context: String },

    /// Invalid configuration value
    #[error("Invalid value '{value}' for field '{field}': {context}")]
    InvalidValue {
        field: String,
        value: String,
        context: String,
    },

    /// Configuration validation errors
    #[error("Configuration validation failed: {error}")]
    ValidationError { error: String },
}

impl ConfigurationError {
    pub fn load_error<E: Into<String>, R: std::fmt::Display>(environment: E, error: R) -> Self {
        Self::LoadError {
            environment: environment.into(),
            error: error.to_string(),
        }
    }

    pub fn missing_required_field<F: Into<String>, C: Into<String>>(field: F, context: C) -> Self {
        Self::MissingRequiredField {
            field: field.into(),
            context: context.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value<F: Into<String>, V: Into<String>, C: Into<String>>(
        field: F,
        value: V,
        context: C,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            context: context.into(),
        }
    }

    pub fn validation_error<E: std::fmt::Display>(error: E) -> Self {
        Self::ValidationError {
            error: error.to_string(),
        }
    }
}

impl From<config::ConfigError> for ConfigurationError {
    fn from(error: config::ConfigError) -> Self {
        match error {
            config::ConfigError::NotFound(field) => Self::missing_required_field(field, "configuration"),
            config::ConfigError::Type {
                key,
                unexpected,
                expected,
                ..
            } => Self::TypeMismatch {
                field: key.unwrap_or_else(|| "<root>".to_string()),
                expected: expected.to_string(),
                actual: unexpected.to_string(),
            },
            other => Self::LoadError {
                environment: "unknown".to_string(),
                error: other.to_string(),
            },
        }
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigurationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_crate_errors_map_onto_variants() {
        let missing: ConfigurationError = config::ConfigError::NotFound("heartbeat.source".into()).into();
        assert_eq!(
            missing,
            ConfigurationError::missing_required_field("heartbeat.source", "configuration")
        );

        let message: ConfigurationError =
            config::ConfigError::Message("bad EVENTBUS__MONITOR__ENABLED".into()).into();
        assert!(matches!(message, ConfigurationError::LoadError { .. }));
        assert!(message.to_string().contains("EVENTBUS__MONITOR__ENABLED"));
    }

    #[test]
    fn test_messages_name_the_field() {
        let err = ConfigurationError::invalid_value("monitor.thresholds", "5/3/1", "must ascend");
        assert_eq!(
            err.to_string(),
            "Invalid value '5/3/1' for field 'monitor.thresholds': must ascend"
        );
        let err = ConfigurationError::validation_error("topics.sync_timeout_ms must be positive");
        assert!(err.to_string().starts_with("Configuration validation failed"));
    }
}
