//! Common Test Utilities
//!
//! Recording mock driver, recording cache and tracing capture shared by the
//! integration tests.

#![allow(dead_code)]

use data_connection::database::{
    CachedConnection, CommandFactory, ConnectionState, DataSource, DatabaseConnectionCache,
    DbCommand, NativeConnection, NativeTransaction, Query, ThreadSafeConnectionCache,
};
use data_connection::errors::{AppError, AppResult};
use std::io;
use std::sync::{Arc, Mutex};

/// Driver and cache calls, in the order they happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Open,
    Close,
    Begin(u32),
    Commit(u32),
    Rollback(u32),
    CacheAdd(String),
    CacheRemove(String),
}

#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<Event>>>);

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: Event) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, predicate: impl Fn(&Event) -> bool) -> usize {
        self.0.lock().unwrap().iter().filter(|e| predicate(e)).count()
    }

    pub fn position(&self, event: &Event) -> Option<usize> {
        self.0.lock().unwrap().iter().position(|e| e == event)
    }
}

/// Native connection that records every call
pub struct MockConnection {
    state: ConnectionState,
    log: EventLog,
    next_transaction: u32,
    fail_open: bool,
    fail_rollback: bool,
}

impl MockConnection {
    pub fn closed(log: &EventLog) -> Self {
        Self {
            state: ConnectionState::Closed,
            log: log.clone(),
            next_transaction: 0,
            fail_open: false,
            fail_rollback: false,
        }
    }

    pub fn already_open(log: &EventLog) -> Self {
        Self {
            state: ConnectionState::Open,
            ..Self::closed(log)
        }
    }

    pub fn broken(log: &EventLog) -> Self {
        Self {
            state: ConnectionState::Broken,
            ..Self::closed(log)
        }
    }

    pub fn refusing_open(log: &EventLog) -> Self {
        Self {
            fail_open: true,
            ..Self::closed(log)
        }
    }

    /// Transactions begun on this connection fail to roll back
    pub fn refusing_rollback(log: &EventLog) -> Self {
        Self {
            fail_rollback: true,
            ..Self::closed(log)
        }
    }
}

impl NativeConnection for MockConnection {
    type Transaction = MockTransaction;

    fn state(&self) -> ConnectionState {
        self.state
    }

    fn open(&mut self) -> AppResult<()> {
        if self.fail_open {
            return Err(AppError::Driver("open refused".to_string()));
        }
        self.log.push(Event::Open);
        self.state = ConnectionState::Open;
        Ok(())
    }

    fn close(&mut self) -> AppResult<()> {
        self.log.push(Event::Close);
        self.state = ConnectionState::Closed;
        Ok(())
    }

    fn begin_transaction(&mut self) -> AppResult<MockTransaction> {
        self.next_transaction += 1;
        self.log.push(Event::Begin(self.next_transaction));
        let transaction = MockTransaction::new(self.next_transaction, &self.log);
        if self.fail_rollback {
            Ok(transaction.refusing_rollback())
        } else {
            Ok(transaction)
        }
    }
}

#[derive(Clone)]
pub struct MockTransaction {
    pub id: u32,
    log: EventLog,
    fail_rollback: bool,
}

impl MockTransaction {
    pub fn new(id: u32, log: &EventLog) -> Self {
        Self {
            id,
            log: log.clone(),
            fail_rollback: false,
        }
    }

    pub fn refusing_rollback(mut self) -> Self {
        self.fail_rollback = true;
        self
    }
}

impl NativeTransaction for MockTransaction {
    fn commit(&mut self) -> AppResult<()> {
        self.log.push(Event::Commit(self.id));
        Ok(())
    }

    fn rollback(&mut self) -> AppResult<()> {
        if self.fail_rollback {
            return Err(AppError::Driver("rollback refused".to_string()));
        }
        self.log.push(Event::Rollback(self.id));
        Ok(())
    }
}

pub struct MockCommand {
    pub data_source: String,
    pub text: String,
    transaction: Option<MockTransaction>,
}

impl MockCommand {
    pub fn transaction_id(&self) -> Option<u32> {
        self.transaction.as_ref().map(|t| t.id)
    }
}

impl DbCommand<MockTransaction> for MockCommand {
    fn set_transaction(&mut self, transaction: Option<&MockTransaction>) {
        self.transaction = transaction.cloned();
    }

    fn transaction(&self) -> Option<&MockTransaction> {
        self.transaction.as_ref()
    }
}

#[derive(Default)]
pub struct MockCommandFactory;

impl CommandFactory<MockConnection> for MockCommandFactory {
    type Command = MockCommand;

    fn create_command_using(
        &self,
        data_source: &DataSource,
        _connection: &MockConnection,
        query: &dyn Query,
    ) -> AppResult<MockCommand> {
        Ok(MockCommand {
            data_source: data_source.name().to_string(),
            text: query.command_text().to_string(),
            transaction: None,
        })
    }
}

/// Connection cache that records add/remove into the shared event log
#[derive(Clone)]
pub struct RecordingCache {
    inner: ThreadSafeConnectionCache,
    log: EventLog,
}

impl RecordingCache {
    pub fn new(log: &EventLog) -> Self {
        Self {
            inner: ThreadSafeConnectionCache::new(),
            log: log.clone(),
        }
    }
}

impl DatabaseConnectionCache for RecordingCache {
    fn add(&self, data_source: &DataSource, connection: CachedConnection) {
        self.log.push(Event::CacheAdd(data_source.name().to_string()));
        self.inner.add(data_source, connection);
    }

    fn remove(&self, data_source: &DataSource) {
        self.log.push(Event::CacheRemove(data_source.name().to_string()));
        self.inner.remove(data_source);
    }

    fn get(&self, data_source: &DataSource) -> Option<CachedConnection> {
        self.inner.get(data_source)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn snapshot(&self) -> Vec<CachedConnection> {
        self.inner.snapshot()
    }
}

pub fn data_source(name: &str) -> DataSource {
    DataSource::new(name, ":memory:").unwrap()
}

#[derive(Clone, Default)]
struct CapturedWriter(Arc<Mutex<Vec<u8>>>);

impl io::Write for CapturedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a thread-local subscriber and return everything it logged
pub fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, String) {
    let writer = CapturedWriter::default();
    let make_writer = writer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || make_writer.clone())
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .finish();

    let result = tracing::subscriber::with_default(subscriber, f);
    let output = String::from_utf8(writer.0.lock().unwrap().clone()).unwrap();
    (result, output)
}
