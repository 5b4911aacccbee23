//! SQLite native driver built on rusqlite.
//!
//! `SqliteConnection` is cheap to clone; clones share one underlying
//! `rusqlite::Connection`, as do the transactions and commands created from
//! it. Transactions are driven with `BEGIN` / `COMMIT` / `ROLLBACK` on the
//! shared session.

use crate::database::traits::{
    CommandFactory, ConnectionState, DbCommand, NativeConnection, NativeTransaction, Query,
};
use crate::database::DataSource;
use crate::errors::{AppError, AppResult};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

type SharedConnection = Arc<Mutex<Option<Connection>>>;

fn lock(inner: &SharedConnection) -> MutexGuard<'_, Option<Connection>> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Run `f` against the shared session, failing if it is closed
fn with_open<R>(
    inner: &SharedConnection,
    path: &str,
    f: impl FnOnce(&Connection) -> rusqlite::Result<R>,
) -> AppResult<R> {
    let guard = lock(inner);
    let connection = guard
        .as_ref()
        .ok_or_else(|| AppError::ConnectionClosed(path.to_string()))?;
    Ok(f(connection)?)
}

/// Lazily opened SQLite session
#[derive(Clone)]
pub struct SqliteConnection {
    path: String,
    inner: SharedConnection,
}

impl SqliteConnection {
    /// Create a closed connection to the database at `path`
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            inner: Arc::new(Mutex::new(None)),
        }
    }

    pub fn for_data_source(data_source: &DataSource) -> Self {
        Self::new(data_source.connection_string())
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl NativeConnection for SqliteConnection {
    type Transaction = SqliteTransaction;

    fn state(&self) -> ConnectionState {
        if lock(&self.inner).is_some() {
            ConnectionState::Open
        } else {
            ConnectionState::Closed
        }
    }

    fn open(&mut self) -> AppResult<()> {
        let mut guard = lock(&self.inner);
        if guard.is_none() {
            *guard = Some(Connection::open(&self.path)?);
            debug!("SQLite session opened: {}", self.path);
        }
        Ok(())
    }

    fn close(&mut self) -> AppResult<()> {
        if let Some(connection) = lock(&self.inner).take() {
            connection.close().map_err(|(_, e)| AppError::Database(e))?;
            debug!("SQLite session closed: {}", self.path);
        }
        Ok(())
    }

    fn begin_transaction(&mut self) -> AppResult<SqliteTransaction> {
        with_open(&self.inner, &self.path, |c| c.execute_batch("BEGIN"))?;

        Ok(SqliteTransaction {
            path: self.path.clone(),
            inner: Arc::clone(&self.inner),
            completed: Arc::new(AtomicBool::new(false)),
        })
    }
}

/// Transaction on a shared SQLite session
///
/// Clones refer to the same transaction: completing one completes all.
#[derive(Clone)]
pub struct SqliteTransaction {
    path: String,
    inner: SharedConnection,
    completed: Arc<AtomicBool>,
}

impl SqliteTransaction {
    /// True once committed or rolled back
    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::SeqCst)
    }

    fn finish(&mut self, statement: &str) -> AppResult<()> {
        if self.is_completed() {
            return Err(AppError::TransactionCompleted);
        }
        with_open(&self.inner, &self.path, |c| c.execute_batch(statement))?;
        self.completed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

impl NativeTransaction for SqliteTransaction {
    fn commit(&mut self) -> AppResult<()> {
        self.finish("COMMIT")
    }

    fn rollback(&mut self) -> AppResult<()> {
        self.finish("ROLLBACK")
    }
}

/// SQL command bound to a SQLite session
pub struct SqliteCommand {
    path: String,
    inner: SharedConnection,
    sql: String,
    parameters: Vec<Value>,
    transaction: Option<SqliteTransaction>,
}

impl SqliteCommand {
    pub fn command_text(&self) -> &str {
        &self.sql
    }

    fn ensure_transaction_active(&self) -> AppResult<()> {
        match &self.transaction {
            Some(transaction) if transaction.is_completed() => Err(AppError::TransactionCompleted),
            _ => Ok(()),
        }
    }

    /// Execute the statement and return the number of rows changed
    pub fn execute(&self) -> AppResult<usize> {
        self.ensure_transaction_active()?;
        with_open(&self.inner, &self.path, |c| {
            c.execute(&self.sql, params_from_iter(self.parameters.iter()))
        })
    }

    /// Run the query and collect every row as a list of column values
    pub fn query_rows(&self) -> AppResult<Vec<Vec<Value>>> {
        self.ensure_transaction_active()?;
        with_open(&self.inner, &self.path, |c| {
            let mut stmt = c.prepare(&self.sql)?;
            let columns = stmt.column_count();
            let rows = stmt.query_map(params_from_iter(self.parameters.iter()), |row| {
                (0..columns)
                    .map(|i| row.get::<_, Value>(i))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })?;
            let collected = rows.collect::<rusqlite::Result<Vec<_>>>();
            collected
        })
    }
}

impl DbCommand<SqliteTransaction> for SqliteCommand {
    fn set_transaction(&mut self, transaction: Option<&SqliteTransaction>) {
        self.transaction = transaction.cloned();
    }

    fn transaction(&self) -> Option<&SqliteTransaction> {
        self.transaction.as_ref()
    }
}

/// Creates `SqliteCommand`s on the handle's session
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteCommandFactory;

impl CommandFactory<SqliteConnection> for SqliteCommandFactory {
    type Command = SqliteCommand;

    fn create_command_using(
        &self,
        data_source: &DataSource,
        connection: &SqliteConnection,
        query: &dyn Query,
    ) -> AppResult<SqliteCommand> {
        debug!(
            "Creating command for data source '{}': {}",
            data_source.name(),
            query.command_text()
        );

        Ok(SqliteCommand {
            path: connection.path.clone(),
            inner: Arc::clone(&connection.inner),
            sql: query.command_text().to_string(),
            parameters: query.parameters().to_vec(),
            transaction: None,
        })
    }
}
