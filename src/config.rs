use crate::database::DataSource;
use crate::errors::{AppError, AppResult};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application configuration loaded from config.toml or environment variables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    #[serde(default)]
    pub data_sources: Vec<DataSource>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when RUST_LOG is not set
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from config.toml (if present) and environment variables
    /// Environment variables take precedence over file configuration
    pub fn load() -> Result<Self, ConfigError> {
        Self::build(File::with_name("config").required(false))
    }

    /// Load configuration from an explicit file, which must exist
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        Self::build(File::from(path).required(true))
    }

    fn build(file: File<config::FileSourceFile, config::FileFormat>) -> Result<Self, ConfigError> {
        let defaults = LoggingConfig::default();
        let config = Config::builder()
            .set_default("logging.filter", defaults.filter)?
            .add_source(file)
            // DATA_CONNECTION_LOGGING__FILTER overrides logging.filter
            .add_source(
                Environment::with_prefix("DATA_CONNECTION")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Look up a configured data source by name
    pub fn data_source(&self, name: &str) -> AppResult<&DataSource> {
        self.data_sources
            .iter()
            .find(|ds| ds.name() == name)
            .ok_or_else(|| AppError::Config(format!("data source '{}' is not configured", name)))
    }
}
