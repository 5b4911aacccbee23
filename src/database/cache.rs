use crate::database::{ConnectionId, DataSource};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Registration of an active connection handle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CachedConnection {
    pub id: ConnectionId,
    pub data_source: String,
    pub owned_connection: bool,
    pub owned_transaction: bool,
    pub registered_at: DateTime<Utc>,
}

/// Process-wide lookup of the active handle per data source
///
/// Implementations own their synchronisation: `add` and `remove` may be
/// called concurrently from different threads.
pub trait DatabaseConnectionCache: Send + Sync {
    /// Register a handle, replacing any existing entry for the data source
    fn add(&self, data_source: &DataSource, connection: CachedConnection);

    /// Drop the entry for a data source. Removing a missing entry is a no-op.
    fn remove(&self, data_source: &DataSource);

    fn get(&self, data_source: &DataSource) -> Option<CachedConnection>;

    fn contains(&self, data_source: &DataSource) -> bool {
        self.get(data_source).is_some()
    }

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All registrations ordered by data source name
    fn snapshot(&self) -> Vec<CachedConnection>;
}

/// Thread-safe connection cache backed by a guarded map
#[derive(Clone, Default)]
pub struct ThreadSafeConnectionCache {
    entries: Arc<Mutex<HashMap<String, CachedConnection>>>,
}

impl ThreadSafeConnectionCache {
    /// Create a new empty connection cache
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave the map half-updated,
    // so a poisoned guard is still usable.
    fn entries(&self) -> MutexGuard<'_, HashMap<String, CachedConnection>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DatabaseConnectionCache for ThreadSafeConnectionCache {
    fn add(&self, data_source: &DataSource, connection: CachedConnection) {
        let mut entries = self.entries();
        if let Some(previous) = entries.insert(data_source.key().to_string(), connection) {
            debug!(
                "Replaced cached connection {} for data source '{}'",
                previous.id,
                data_source.name()
            );
        } else {
            debug!("Cached connection for data source '{}'", data_source.name());
        }
    }

    fn remove(&self, data_source: &DataSource) {
        if self.entries().remove(data_source.key()).is_some() {
            debug!(
                "Removed cached connection for data source '{}'",
                data_source.name()
            );
        }
    }

    fn get(&self, data_source: &DataSource) -> Option<CachedConnection> {
        self.entries().get(data_source.key()).cloned()
    }

    fn len(&self) -> usize {
        self.entries().len()
    }

    fn snapshot(&self) -> Vec<CachedConnection> {
        let mut entries: Vec<_> = self.entries().values().cloned().collect();
        entries.sort_by(|a, b| a.data_source.cmp(&b.data_source));
        entries
    }
}
