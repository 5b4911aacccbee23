//! Data source descriptor: the identity a connection handle is cached under.

use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

fn default_provider() -> String {
    "sqlite".to_string()
}

/// Immutable identity and configuration for a target database
///
/// Two descriptors are the same data source when their names match;
/// connection parameters do not take part in equality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSource {
    name: String,
    connection_string: String,
    #[serde(default = "default_provider")]
    provider_name: String,
}

impl DataSource {
    /// Create a SQLite data source
    pub fn new(name: impl Into<String>, connection_string: impl Into<String>) -> AppResult<Self> {
        Self::with_provider(name, connection_string, default_provider())
    }

    pub fn with_provider(
        name: impl Into<String>,
        connection_string: impl Into<String>,
        provider_name: impl Into<String>,
    ) -> AppResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(AppError::InvalidArgument("data_source.name".to_string()));
        }

        Ok(Self {
            name,
            connection_string: connection_string.into(),
            provider_name: provider_name.into(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cache key for this data source
    pub fn key(&self) -> &str {
        &self.name
    }

    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }
}

impl PartialEq for DataSource {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for DataSource {}

impl Hash for DataSource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.provider_name)
    }
}
