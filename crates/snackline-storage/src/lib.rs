//! Snackline Storage crate - SQLite persistence for the event store.
//!
//! Provides a WAL-mode SQLite database with migrations and append-only
//! repository implementations for the four event tables: leak tests,
//! oxygen tests, breakage samples, and the production log.

pub mod db;
pub mod migrations;
pub mod repository;

pub use db::Database;
pub use repository::{
    table_counts, BreakageRepository, LeakRepository, OxygenRepository, ProductionLogRepository,
    TableCounts,
};
