//! Application state shared across all route handlers.
//!
//! AppState holds the configuration, the database handle, and the session
//! store. It is passed to handlers via axum's State extractor.

use std::sync::Arc;
use std::time::Instant;

use snackline_core::config::SnacklineConfig;
use snackline_storage::Database;

use crate::auth::SessionStore;

/// Shared application state.
///
/// All fields use `Arc` (or are internally `Arc`-backed) for cheap cloning
/// across handler tasks.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration (user list, ports, data dir).
    pub config: Arc<SnacklineConfig>,
    /// SQLite event store.
    pub database: Arc<Database>,
    /// In-memory bearer-token sessions.
    pub sessions: SessionStore,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Create a new AppState with the given components.
    pub fn new(config: SnacklineConfig, database: Database) -> Self {
        Self {
            config: Arc::new(config),
            database: Arc::new(database),
            sessions: SessionStore::new(),
            start_time: Instant::now(),
        }
    }
}
