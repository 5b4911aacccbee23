use thiserror::Error;

/// Application-wide error type - single point of truth
#[derive(Error, Debug)]
pub enum AppError {
    /// A required collaborator was not supplied
    #[error("Invalid argument: {0} is required")]
    InvalidArgument(String),

    /// SQLite driver operations
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Failures reported by any other native driver
    #[error("Driver error: {0}")]
    Driver(String),

    /// The native connection is not open
    #[error("Connection closed: {0}")]
    ConnectionClosed(String),

    /// The transaction attached to a command was already committed or rolled back
    #[error("Transaction already completed")]
    TransactionCompleted,

    /// The connection handle has been disposed
    #[error("Connection for data source '{0}' has been disposed")]
    Disposed(String),

    /// Configuration issues
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration sources could not be read or deserialised
    #[error("Configuration load error: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    /// JSON report output
    #[error("Serialisation error: {0}")]
    Serialisation(#[from] serde_json::Error),
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
