//! Configuration Loader
//!
//! Environment-aware configuration loading. Sources are layered with the
//! `config` crate, later sources overriding earlier ones:
//!
//! 1. `config/eventbus.{toml,yaml,json}` (optional)
//! 2. `config/eventbus.<environment>.{toml,yaml,json}` (optional)
//! 3. `EVENTBUS__<SECTION>__<KEY>` environment variables
//!
//! Missing files are not an error; every field has a default. The merged
//! result is validated before it is handed out.

use super::error::{ConfigResult, ConfigurationError};
use super::ControlPlaneConfig;
use config::{Config, Environment, File};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const CONFIG_FILE_STEM: &str = "eventbus";
const ENV_PREFIX: &str = "EVENTBUS";
const ENV_SEPARATOR: &str = "__";

/// Loaded, validated configuration plus where it came from
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: ControlPlaneConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment
    /// This is useful for testing without modifying global environment variables
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(|| PathBuf::from("config"));

        debug!(
            environment = %environment,
            config_directory = %config_directory.display(),
            "Loading control plane configuration"
        );

        let config = Self::load_and_merge_config(&config_directory, environment)?;
        config.validate()?;

        debug!(
            "Configuration loaded successfully: {}",
            serde_json::to_string_pretty(&config)
                .unwrap_or_else(|_| "[serialization error]".to_string())
        );

        info!(
            environment = %environment,
            heartbeat_topic = %config.heartbeat.topic(),
            monitor_topic = %config.monitor.topic(),
            topic_strategy = %config.topics.strategy,
            "⚙️ Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Wrap an already-built configuration, validating it first
    pub fn from_config(
        config: ControlPlaneConfig,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory: PathBuf::from("config"),
        }))
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &ControlPlaneConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Detect current environment: EVENTBUS_ENV || APP_ENV || 'development'
    pub fn detect_environment() -> String {
        env::var("EVENTBUS_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }

    fn load_and_merge_config(
        config_directory: &Path,
        environment: &str,
    ) -> ConfigResult<ControlPlaneConfig> {
        let base = config_directory.join(CONFIG_FILE_STEM);
        let overrides = config_directory.join(format!("{CONFIG_FILE_STEM}.{environment}"));

        let settings = Config::builder()
            .add_source(File::from(base).required(false))
            .add_source(File::from(overrides).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigurationError::load_error(environment, e))?;

        settings.try_deserialize().map_err(ConfigurationError::from)
    }
}
