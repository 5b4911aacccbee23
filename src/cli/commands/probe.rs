use crate::database::{
    CachedConnection, DatabaseConnectionCache, DatabaseConnectionFactory, RawQuery,
    ThreadSafeConnectionCache,
};
use crate::errors::{AppError, AppResult};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use super::load_config;

#[derive(Args)]
pub struct ProbeCommand {
    /// Name of the configured data source
    #[arg(long)]
    data_source: String,

    /// Statement to execute inside a transaction owned by the handle
    #[arg(long)]
    statement: Option<String>,

    /// Commit the transaction (it is rolled back on disposal otherwise)
    #[arg(long, requires = "statement")]
    commit: bool,

    /// Configuration file (defaults to ./config.toml and DATA_CONNECTION_* env vars)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

/// Outcome of a probe run
#[derive(Debug, Serialize)]
pub struct ProbeReport {
    pub data_source: String,
    pub registered: Option<CachedConnection>,
    pub rows_affected: Option<usize>,
    pub committed: bool,
    pub cached_after_dispose: bool,
}

impl ProbeCommand {
    pub fn run(&self) -> AppResult<()> {
        let report = self.execute()?;
        self.print(&report)
    }

    /// Open, exercise and dispose a handle, reporting what happened
    pub fn execute(&self) -> AppResult<ProbeReport> {
        let app_config = load_config(&self.config)?;
        let data_source = app_config.data_source(&self.data_source)?;

        if data_source.provider_name() != "sqlite" {
            return Err(AppError::Config(format!(
                "unsupported provider '{}' for data source '{}'",
                data_source.provider_name(),
                data_source.name()
            )));
        }

        let cache = ThreadSafeConnectionCache::new();
        let factory = DatabaseConnectionFactory::sqlite(Arc::new(cache.clone()));

        let mut handle = factory.open_sqlite(data_source)?;
        let registered = cache.get(data_source);

        let mut rows_affected = None;
        if let Some(statement) = &self.statement {
            handle.begin_transaction()?;
            let command =
                handle.create_command_to_execute(&RawQuery::new(statement.as_str()))?;
            rows_affected = Some(command.execute()?);
            info!("Statement affected {} rows", rows_affected.unwrap_or(0));

            if self.commit {
                handle.commit_transaction()?;
            }
        }
        let committed = self.statement.is_some() && !handle.has_transaction();

        handle.dispose()?;

        Ok(ProbeReport {
            data_source: data_source.name().to_string(),
            registered,
            rows_affected,
            committed,
            cached_after_dispose: cache.contains(data_source),
        })
    }

    fn print(&self, report: &ProbeReport) -> AppResult<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(report)?);
            return Ok(());
        }

        println!("Data source:        {}", report.data_source);
        match &report.registered {
            Some(entry) => println!(
                "Registered handle:  {} at {}",
                entry.id,
                entry.registered_at.to_rfc3339()
            ),
            None => println!("Registered handle:  none"),
        }
        if let Some(rows) = report.rows_affected {
            println!("Rows affected:      {}", rows);
            println!(
                "Transaction:        {}",
                if report.committed { "committed" } else { "rolled back" }
            );
        }
        println!("Cached after close: {}", report.cached_after_dispose);
        Ok(())
    }
}
