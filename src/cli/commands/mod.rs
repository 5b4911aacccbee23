pub mod list;
pub mod probe;

use crate::config::AppConfig;
use crate::errors::AppResult;
use std::path::PathBuf;
use tracing::warn;

/// Load configuration from an explicit path, or config.toml and the environment
pub(crate) fn load_config(path: &Option<PathBuf>) -> AppResult<AppConfig> {
    let loaded = match path {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };

    if let Err(e) = &loaded {
        warn!("Failed to load configuration: {}", e);
    }
    Ok(loaded?)
}
