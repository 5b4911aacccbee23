//! Driver trait abstractions consumed by the connection handle.
//!
//! A native driver supplies a connection, the transaction type it begins,
//! and a command factory. The handle never looks past these traits.

use crate::database::DataSource;
use crate::errors::AppResult;
use rusqlite::types::Value;

/// Lifecycle state reported by a native connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    Open,
    Broken,
}

/// Driver-provided handle to a database session
pub trait NativeConnection {
    type Transaction: NativeTransaction;

    fn state(&self) -> ConnectionState;

    fn open(&mut self) -> AppResult<()>;

    /// Release the session. Closing an already closed connection is a no-op.
    fn close(&mut self) -> AppResult<()>;

    fn begin_transaction(&mut self) -> AppResult<Self::Transaction>;
}

/// Driver-provided transactional scope
pub trait NativeTransaction {
    fn commit(&mut self) -> AppResult<()>;

    fn rollback(&mut self) -> AppResult<()>;
}

/// A driver command that can carry a transaction
pub trait DbCommand<T> {
    fn set_transaction(&mut self, transaction: Option<&T>);

    fn transaction(&self) -> Option<&T>;
}

/// Query text plus its positional parameters
pub trait Query {
    fn command_text(&self) -> &str;

    fn parameters(&self) -> &[Value];
}

/// Builds driver commands for a data source and connection
pub trait CommandFactory<C: NativeConnection> {
    type Command: DbCommand<C::Transaction>;

    fn create_command_using(
        &self,
        data_source: &DataSource,
        connection: &C,
        query: &dyn Query,
    ) -> AppResult<Self::Command>;
}
