//! Connection lifecycle management.
//!
//! ## Architecture
//!
//! - `DataSource` - identity a handle is cached under
//! - `DatabaseConnection` - owns a native connection and optional transaction
//! - `DatabaseConnectionCache` - process-wide registry of active handles
//! - `AmbientTransaction` - detects externally managed transaction scopes
//! - `sqlite` - rusqlite-backed native driver
//!
//! Driver traits live in `traits` so other drivers can plug into the same
//! handle.

pub mod ambient;
pub mod cache;
mod connection;
mod data_source;
mod factory;
mod query;
pub mod sqlite;
pub mod traits;

pub use ambient::{
    AmbientTransaction, AmbientTransactionScope, NoAmbientTransaction, ThreadAmbientTransaction,
};
pub use cache::{CachedConnection, DatabaseConnectionCache, ThreadSafeConnectionCache};
pub use connection::{ConnectionId, DatabaseConnection, DatabaseConnectionBuilder};
pub use data_source::DataSource;
pub use factory::{DatabaseConnectionFactory, SqliteDatabaseConnection};
pub use query::RawQuery;
pub use sqlite::{SqliteCommand, SqliteCommandFactory, SqliteConnection, SqliteTransaction};
pub use traits::*;
