//! Database connection handle.
//!
//! Wraps one native connection and at most one native transaction, opens the
//! connection when it arrives closed, and registers itself in the connection
//! cache for its data source. Disposal (explicit or on drop) rolls back an
//! owned transaction, closes an owned connection and unregisters the handle,
//! in that order.

use crate::database::ambient::{AmbientTransaction, ThreadAmbientTransaction};
use crate::database::cache::{CachedConnection, DatabaseConnectionCache};
use crate::database::traits::{
    CommandFactory, ConnectionState, DbCommand, NativeConnection, NativeTransaction, Query,
};
use crate::database::DataSource;
use crate::errors::{AppError, AppResult};
use chrono::Utc;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a connection handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ConnectionId(u64);

impl ConnectionId {
    fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Builder collecting the collaborators of a `DatabaseConnection`
///
/// The data source, connection, command factory and cache are required;
/// `build` reports the first missing one as `AppError::InvalidArgument`.
pub struct DatabaseConnectionBuilder<C: NativeConnection, F> {
    data_source: Option<DataSource>,
    connection: Option<C>,
    command_factory: Option<Arc<F>>,
    cache: Option<Arc<dyn DatabaseConnectionCache>>,
    ambient: Arc<dyn AmbientTransaction>,
    owned_connection: bool,
    current_transaction: Option<C::Transaction>,
}

impl<C, F> DatabaseConnectionBuilder<C, F>
where
    C: NativeConnection,
    F: CommandFactory<C>,
{
    pub fn new() -> Self {
        Self {
            data_source: None,
            connection: None,
            command_factory: None,
            cache: None,
            ambient: Arc::new(ThreadAmbientTransaction),
            owned_connection: true,
            current_transaction: None,
        }
    }

    pub fn data_source(mut self, data_source: DataSource) -> Self {
        self.data_source = Some(data_source);
        self
    }

    pub fn connection(mut self, connection: C) -> Self {
        self.connection = Some(connection);
        self
    }

    pub fn command_factory(mut self, command_factory: Arc<F>) -> Self {
        self.command_factory = Some(command_factory);
        self
    }

    pub fn cache(mut self, cache: Arc<dyn DatabaseConnectionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn ambient(mut self, ambient: Arc<dyn AmbientTransaction>) -> Self {
        self.ambient = ambient;
        self
    }

    /// Whether the handle closes the connection on disposal (default `true`)
    pub fn owned_connection(mut self, owned: bool) -> Self {
        self.owned_connection = owned;
        self
    }

    /// Attach a transaction begun elsewhere. The handle never commits or
    /// rolls back a supplied transaction.
    pub fn current_transaction(mut self, transaction: C::Transaction) -> Self {
        self.current_transaction = Some(transaction);
        self
    }

    pub fn build(self) -> AppResult<DatabaseConnection<C, F>> {
        let data_source = self
            .data_source
            .ok_or_else(|| AppError::InvalidArgument("data_source".to_string()))?;
        let connection = self
            .connection
            .ok_or_else(|| AppError::InvalidArgument("connection".to_string()))?;
        let command_factory = self
            .command_factory
            .ok_or_else(|| AppError::InvalidArgument("command_factory".to_string()))?;
        let cache = self
            .cache
            .ok_or_else(|| AppError::InvalidArgument("cache".to_string()))?;

        DatabaseConnection::establish(
            data_source,
            connection,
            command_factory,
            cache,
            self.ambient,
            self.owned_connection,
            self.current_transaction,
        )
    }
}

impl<C, F> Default for DatabaseConnectionBuilder<C, F>
where
    C: NativeConnection,
    F: CommandFactory<C>,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Lifecycle wrapper around a native connection and optional transaction
pub struct DatabaseConnection<C, F>
where
    C: NativeConnection,
    F: CommandFactory<C>,
{
    id: ConnectionId,
    data_source: DataSource,
    connection: Option<C>,
    transaction: Option<C::Transaction>,
    command_factory: Arc<F>,
    cache: Arc<dyn DatabaseConnectionCache>,
    ambient: Arc<dyn AmbientTransaction>,
    owned_connection: bool,
    owned_transaction: bool,
    disposed: bool,
}

impl<C, F> DatabaseConnection<C, F>
where
    C: NativeConnection,
    F: CommandFactory<C>,
{
    /// Create a handle that owns `connection`
    pub fn new(
        data_source: DataSource,
        connection: C,
        command_factory: Arc<F>,
        cache: Arc<dyn DatabaseConnectionCache>,
    ) -> AppResult<Self> {
        Self::builder()
            .data_source(data_source)
            .connection(connection)
            .command_factory(command_factory)
            .cache(cache)
            .build()
    }

    pub fn builder() -> DatabaseConnectionBuilder<C, F> {
        DatabaseConnectionBuilder::new()
    }

    fn establish(
        data_source: DataSource,
        mut connection: C,
        command_factory: Arc<F>,
        cache: Arc<dyn DatabaseConnectionCache>,
        ambient: Arc<dyn AmbientTransaction>,
        owned_connection: bool,
        current_transaction: Option<C::Transaction>,
    ) -> AppResult<Self> {
        let id = ConnectionId::next();
        let owned_transaction = current_transaction.is_none();

        debug!(
            "Connection {} created for data source '{}'",
            id,
            data_source.name()
        );

        if connection.state() == ConnectionState::Closed {
            if let Err(e) = connection.open() {
                error!(
                    "Could not open connection for data source '{}': {}",
                    data_source.name(),
                    e
                );
                return Err(e);
            }
            info!("Connection opened for data source '{}'", data_source.name());
        } else {
            info!(
                "Connection already open for data source '{}'",
                data_source.name()
            );
        }

        cache.add(
            &data_source,
            CachedConnection {
                id,
                data_source: data_source.name().to_string(),
                owned_connection,
                owned_transaction,
                registered_at: Utc::now(),
            },
        );

        Ok(Self {
            id,
            data_source,
            connection: Some(connection),
            transaction: current_transaction,
            command_factory,
            cache,
            ambient,
            owned_connection,
            owned_transaction,
            disposed: false,
        })
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn data_source(&self) -> &DataSource {
        &self.data_source
    }

    /// The native connection, `None` once disposed
    pub fn connection(&self) -> Option<&C> {
        self.connection.as_ref()
    }

    pub fn transaction(&self) -> Option<&C::Transaction> {
        self.transaction.as_ref()
    }

    pub fn has_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    pub fn owns_connection(&self) -> bool {
        self.owned_connection
    }

    pub fn owns_transaction(&self) -> bool {
        self.owned_transaction
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn disposed_error(&self) -> AppError {
        AppError::Disposed(self.data_source.name().to_string())
    }

    /// Build a driver command for `query` carrying the current transaction
    ///
    /// No transaction is required; without one the command runs outside any
    /// transaction.
    pub fn create_command_to_execute(&self, query: &dyn Query) -> AppResult<F::Command> {
        let connection = self.connection.as_ref().ok_or_else(|| self.disposed_error())?;

        let mut command = self
            .command_factory
            .create_command_using(&self.data_source, connection, query)?;
        command.set_transaction(self.transaction.as_ref());

        Ok(command)
    }

    /// Begin a transaction unless one is attached or an ambient scope is active
    ///
    /// Returns the handle either way.
    pub fn begin_transaction(&mut self) -> AppResult<&mut Self> {
        if self.disposed {
            return Err(self.disposed_error());
        }

        if self.transaction.is_none() && !self.ambient.is_active() {
            let connection = match self.connection.as_mut() {
                Some(connection) => connection,
                None => return Err(AppError::Disposed(self.data_source.name().to_string())),
            };
            self.transaction = Some(connection.begin_transaction()?);
            debug!(
                "Connection {} began transaction on '{}'",
                self.id,
                self.data_source.name()
            );
        }

        Ok(self)
    }

    /// Commit an owned transaction. Borrowed transactions are left untouched.
    pub fn commit_transaction(&mut self) -> AppResult<()> {
        if !self.owned_transaction {
            return Ok(());
        }

        let Some(transaction) = self.transaction.as_mut() else {
            return Ok(());
        };

        transaction.commit()?;
        self.transaction = None;

        debug!(
            "Connection {} committed transaction on '{}'",
            self.id,
            self.data_source.name()
        );
        Ok(())
    }

    /// Execute a function within a transaction owned by this handle
    ///
    /// Commits when `f` succeeds. On error the transaction stays attached and
    /// is rolled back when the handle is disposed.
    pub fn with_transaction<R, G>(&mut self, f: G) -> AppResult<R>
    where
        G: FnOnce(&mut Self) -> AppResult<R>,
    {
        self.begin_transaction()?;
        let result = f(&mut *self)?;
        self.commit_transaction()?;
        Ok(result)
    }

    /// Release the handle's resources
    ///
    /// An owned transaction still attached is rolled back, then an owned
    /// connection is closed, then the data source entry is removed from the
    /// cache. Each resource is released at most once: if a step fails the
    /// error is returned and calling `dispose` again continues with the
    /// remaining steps. Once disposal completes further calls do nothing.
    pub fn dispose(&mut self) -> AppResult<()> {
        if self.disposed {
            return Ok(());
        }

        if let Some(mut transaction) = self.transaction.take() {
            if self.owned_transaction {
                transaction.rollback()?;
                debug!(
                    "Connection {} rolled back uncommitted transaction on '{}'",
                    self.id,
                    self.data_source.name()
                );
            }
        }

        if let Some(mut connection) = self.connection.take() {
            if self.owned_connection {
                connection.close()?;
                debug!(
                    "Connection {} closed for '{}'",
                    self.id,
                    self.data_source.name()
                );
            }
        }

        self.cache.remove(&self.data_source);
        self.disposed = true;

        debug!(
            "Connection {} disposed for data source '{}'",
            self.id,
            self.data_source.name()
        );
        Ok(())
    }
}

impl<C, F> Drop for DatabaseConnection<C, F>
where
    C: NativeConnection,
    F: CommandFactory<C>,
{
    fn drop(&mut self) {
        // Every failed pass has already released one resource, so this ends
        // after at most one pass per resource.
        while let Err(e) = self.dispose() {
            error!(
                "Error disposing connection {} for data source '{}': {}",
                self.id,
                self.data_source.name(),
                e
            );
        }
    }
}

impl<C, F> fmt::Debug for DatabaseConnection<C, F>
where
    C: NativeConnection,
    F: CommandFactory<C>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConnection")
            .field("id", &self.id)
            .field("data_source", &self.data_source.name())
            .field("has_transaction", &self.has_transaction())
            .field("owned_connection", &self.owned_connection)
            .field("owned_transaction", &self.owned_transaction)
            .field("disposed", &self.disposed)
            .finish()
    }
}
