//! Database connection handle
//!
//! Owns a native connection/transaction pair, opens the connection on
//! demand and tracks the active handle per data source.

pub mod cli;
pub mod config;
pub mod database;
pub mod errors;
