use crate::database::ambient::{AmbientTransaction, ThreadAmbientTransaction};
use crate::database::cache::DatabaseConnectionCache;
use crate::database::sqlite::{SqliteCommandFactory, SqliteConnection};
use crate::database::traits::{CommandFactory, NativeConnection};
use crate::database::{DataSource, DatabaseConnection, DatabaseConnectionBuilder};
use crate::errors::AppResult;
use std::sync::Arc;

/// Handle type produced for SQLite data sources
pub type SqliteDatabaseConnection = DatabaseConnection<SqliteConnection, SqliteCommandFactory>;

/// Creates connection handles that share one command factory, cache and
/// ambient transaction source
pub struct DatabaseConnectionFactory<F> {
    command_factory: Arc<F>,
    cache: Arc<dyn DatabaseConnectionCache>,
    ambient: Arc<dyn AmbientTransaction>,
}

impl<F> Clone for DatabaseConnectionFactory<F> {
    fn clone(&self) -> Self {
        Self {
            command_factory: Arc::clone(&self.command_factory),
            cache: Arc::clone(&self.cache),
            ambient: Arc::clone(&self.ambient),
        }
    }
}

impl<F> DatabaseConnectionFactory<F> {
    pub fn new(command_factory: Arc<F>, cache: Arc<dyn DatabaseConnectionCache>) -> Self {
        Self {
            command_factory,
            cache,
            ambient: Arc::new(ThreadAmbientTransaction),
        }
    }

    pub fn with_ambient(mut self, ambient: Arc<dyn AmbientTransaction>) -> Self {
        self.ambient = ambient;
        self
    }

    pub fn cache(&self) -> &Arc<dyn DatabaseConnectionCache> {
        &self.cache
    }

    /// Builder pre-populated with this factory's collaborators
    pub fn builder<C>(
        &self,
        data_source: DataSource,
        connection: C,
    ) -> DatabaseConnectionBuilder<C, F>
    where
        C: NativeConnection,
        F: CommandFactory<C>,
    {
        DatabaseConnectionBuilder::new()
            .data_source(data_source)
            .connection(connection)
            .command_factory(Arc::clone(&self.command_factory))
            .cache(Arc::clone(&self.cache))
            .ambient(Arc::clone(&self.ambient))
    }

    /// Create a handle that owns `connection`
    pub fn create<C>(
        &self,
        data_source: DataSource,
        connection: C,
    ) -> AppResult<DatabaseConnection<C, F>>
    where
        C: NativeConnection,
        F: CommandFactory<C>,
    {
        self.builder(data_source, connection).build()
    }
}

impl DatabaseConnectionFactory<SqliteCommandFactory> {
    pub fn sqlite(cache: Arc<dyn DatabaseConnectionCache>) -> Self {
        Self::new(Arc::new(SqliteCommandFactory), cache)
    }

    /// Open a handle on a fresh session for `data_source`
    pub fn open_sqlite(&self, data_source: &DataSource) -> AppResult<SqliteDatabaseConnection> {
        let connection = SqliteConnection::for_data_source(data_source);
        self.create(data_source.clone(), connection)
    }
}
