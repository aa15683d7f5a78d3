//! Database schema migrations.
//!
//! Applies the initial schema: the four append-only event tables
//! (leak_tests, oxygen_tests, breakage, production_log) plus the
//! schema_migrations tracking table.

use rusqlite::Connection;
use tracing::info;

use snackline_core::error::SnacklineError;

/// Run all pending database migrations.
///
/// Currently implements the initial schema (version 1). Future migrations
/// can be added by checking the current version and applying incremental changes.
pub fn run_migrations(conn: &Connection) -> Result<(), SnacklineError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| SnacklineError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| SnacklineError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: initial_schema");
    }

    Ok(())
}

/// Version 1: Initial schema.
///
/// The synthetic `id` columns are never exposed through the API; rows are
/// addressed only by their filter dimensions. Dates are ISO `YYYY-MM-DD`
/// text so range filters are plain string comparisons.
fn apply_v1(conn: &Connection) -> Result<(), SnacklineError> {
    conn.execute_batch(
        "
        -- Packaging leak tests.
        CREATE TABLE IF NOT EXISTS leak_tests (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            date        TEXT NOT NULL,
            line        TEXT NOT NULL,
            flavour     TEXT NOT NULL DEFAULT '',
            grammage    TEXT NOT NULL DEFAULT '',
            pressure    TEXT NOT NULL DEFAULT '',
            result      TEXT NOT NULL DEFAULT '',
            remarks     TEXT NOT NULL DEFAULT '',
            photo_ref   TEXT NOT NULL DEFAULT '',
            created_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_leak_tests_date
            ON leak_tests (date);

        CREATE INDEX IF NOT EXISTS idx_leak_tests_line_date
            ON leak_tests (line, date);

        -- Residual-oxygen tests.
        CREATE TABLE IF NOT EXISTS oxygen_tests (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            date        TEXT NOT NULL,
            line        TEXT NOT NULL,
            flavour     TEXT NOT NULL DEFAULT '',
            grammage    TEXT NOT NULL DEFAULT '',
            temperature REAL NOT NULL DEFAULT 0.0,
            oxygen      REAL NOT NULL DEFAULT 0.0,
            created_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_oxygen_tests_date
            ON oxygen_tests (date);

        CREATE INDEX IF NOT EXISTS idx_oxygen_tests_line_date
            ON oxygen_tests (line, date);

        -- Breakage count samples.
        CREATE TABLE IF NOT EXISTS breakage (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            date         TEXT NOT NULL,
            line         TEXT NOT NULL,
            product_code TEXT NOT NULL DEFAULT '',
            good         REAL NOT NULL DEFAULT 0.0,
            broken       REAL NOT NULL DEFAULT 0.0,
            cluster      REAL NOT NULL DEFAULT 0.0,
            residue      REAL NOT NULL DEFAULT 0.0,
            created_at   INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_breakage_date
            ON breakage (date);

        CREATE INDEX IF NOT EXISTS idx_breakage_product_code
            ON breakage (product_code);

        -- Run/stop production log.
        CREATE TABLE IF NOT EXISTS production_log (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            date        TEXT NOT NULL,
            time        TEXT NOT NULL DEFAULT '',
            line        TEXT NOT NULL,
            action      TEXT NOT NULL,
            stop_reason TEXT NOT NULL DEFAULT '',
            stop_other  TEXT NOT NULL DEFAULT '',
            created_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_production_log_date
            ON production_log (date);

        CREATE INDEX IF NOT EXISTS idx_production_log_action_date
            ON production_log (action, date);

        -- Record migration.
        INSERT OR IGNORE INTO schema_migrations (version, name) VALUES (1, 'initial_schema');
        ",
    )
    .map_err(|e| SnacklineError::Storage(format!("Failed to apply migration v1: {}", e)))?;

    Ok(())
}
