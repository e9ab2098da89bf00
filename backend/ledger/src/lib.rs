//! `idlewatch-ledger`: the two stores shared by event handlers and the scanner.
//!
//! Provides:
//! - `ActivityLedger`: last-seen / joined / warned per `(channel, member)`
//! - `ConfigStore`: per-channel thresholds with field-by-field defaults
//! - SQLite implementations over one shared connection
//! - In-memory implementations for tests

pub mod config_store;
pub mod db;
pub mod ledger;
pub mod sqlite_config;
pub mod sqlite_ledger;

pub use config_store::{ConfigStore, InMemoryConfigStore};
pub use db::Database;
pub use ledger::{ActivityLedger, InMemoryLedger};
pub use sqlite_config::SqliteConfigStore;
pub use sqlite_ledger::SqliteLedger;
