//! Repository implementations for the four event tables.
//!
//! Each repository is append-only: insert plus read paths, no update or
//! delete. Date-range reads apply inclusive ISO-date bounds in SQL; the
//! categorical filter dimensions (line, flavour, grammage, product code)
//! are applied by the dashboard layer on the fetched rows.

use std::sync::Arc;

use snackline_core::error::SnacklineError;
use snackline_core::records::{BreakageSample, LeakTest, LogEntry, OxygenTest};

use crate::db::Database;

/// Build the `WHERE` clause and owned parameters for an optional inclusive
/// date range, with an optional fixed leading predicate. Bind with
/// `params_from_iter` at the call site.
fn date_range_clause(
    leading: Option<&str>,
    from: Option<&str>,
    to: Option<&str>,
) -> (String, Vec<String>) {
    let mut predicates: Vec<String> = Vec::new();
    let mut params: Vec<String> = Vec::new();

    if let Some(p) = leading {
        predicates.push(p.to_string());
    }
    if let Some(f) = from {
        params.push(f.to_string());
        predicates.push(format!("date >= ?{}", params.len()));
    }
    if let Some(t) = to {
        params.push(t.to_string());
        predicates.push(format!("date <= ?{}", params.len()));
    }

    let clause = if predicates.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", predicates.join(" AND "))
    };
    (clause, params)
}

/// Repository for leak test records.
pub struct LeakRepository {
    db: Arc<Database>,
}

impl LeakRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Store a new leak test.
    pub fn insert(&self, record: &LeakTest) -> Result<(), SnacklineError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO leak_tests (date, line, flavour, grammage, pressure, result, remarks, photo_ref)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    record.date,
                    record.line,
                    record.flavour,
                    record.grammage,
                    record.pressure,
                    record.result,
                    record.remarks,
                    record.photo_ref,
                ],
            )
            .map_err(|e| SnacklineError::Storage(format!("Failed to save leak test: {}", e)))?;
            Ok(())
        })
    }

    /// Fetch every leak test, in insertion order.
    pub fn fetch_all(&self) -> Result<Vec<LeakTest>, SnacklineError> {
        self.fetch_range(None, None)
    }

    /// Fetch leak tests within an optional inclusive date range.
    pub fn fetch_range(
        &self,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<Vec<LeakTest>, SnacklineError> {
        self.db.with_conn(|conn| {
            let (clause, params) = date_range_clause(None, from, to);
            let sql = format!(
                "SELECT date, line, flavour, grammage, pressure, result, remarks, photo_ref
                 FROM leak_tests{} ORDER BY id",
                clause
            );
            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| SnacklineError::Storage(format!("Leak query prepare: {}", e)))?;

            let rows = stmt
                .query_map(rusqlite::params_from_iter(params.iter()), |row| {
                    Ok(LeakTest {
                        date: row.get(0)?,
                        line: row.get(1)?,
                        flavour: row.get(2)?,
                        grammage: row.get(3)?,
                        pressure: row.get(4)?,
                        result: row.get(5)?,
                        remarks: row.get(6)?,
                        photo_ref: row.get(7)?,
                    })
                })
                .map_err(|e| SnacklineError::Storage(format!("Leak query: {}", e)))?;

            let mut results = Vec::new();
            for row in rows {
                results.push(row.map_err(|e| SnacklineError::Storage(e.to_string()))?);
            }
            Ok(results)
        })
    }
}

/// Repository for oxygen test records.
pub struct OxygenRepository {
    db: Arc<Database>,
}

impl OxygenRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Store a new oxygen test.
    pub fn insert(&self, record: &OxygenTest) -> Result<(), SnacklineError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO oxygen_tests (date, line, flavour, grammage, temperature, oxygen)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    record.date,
                    record.line,
                    record.flavour,
                    record.grammage,
                    record.temperature,
                    record.oxygen,
                ],
            )
            .map_err(|e| SnacklineError::Storage(format!("Failed to save oxygen test: {}", e)))?;
            Ok(())
        })
    }

    /// Fetch every oxygen test, in insertion order.
    pub fn fetch_all(&self) -> Result<Vec<OxygenTest>, SnacklineError> {
        self.fetch_range(None, None)
    }

    /// Fetch oxygen tests within an optional inclusive date range.
    pub fn fetch_range(
        &self,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<Vec<OxygenTest>, SnacklineError> {
        self.db.with_conn(|conn| {
            let (clause, params) = date_range_clause(None, from, to);
            let sql = format!(
                "SELECT date, line, flavour, grammage, temperature, oxygen
                 FROM oxygen_tests{} ORDER BY id",
                clause
            );
            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| SnacklineError::Storage(format!("Oxygen query prepare: {}", e)))?;

            let rows = stmt
                .query_map(rusqlite::params_from_iter(params.iter()), |row| {
                    Ok(OxygenTest {
                        date: row.get(0)?,
                        line: row.get(1)?,
                        flavour: row.get(2)?,
                        grammage: row.get(3)?,
                        temperature: row.get(4)?,
                        oxygen: row.get(5)?,
                    })
                })
                .map_err(|e| SnacklineError::Storage(format!("Oxygen query: {}", e)))?;

            let mut results = Vec::new();
            for row in rows {
                results.push(row.map_err(|e| SnacklineError::Storage(e.to_string()))?);
            }
            Ok(results)
        })
    }
}

/// Repository for breakage sample records.
pub struct BreakageRepository {
    db: Arc<Database>,
}

impl BreakageRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Store a new breakage sample.
    pub fn insert(&self, record: &BreakageSample) -> Result<(), SnacklineError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO breakage (date, line, product_code, good, broken, cluster, residue)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    record.date,
                    record.line,
                    record.product_code,
                    record.good,
                    record.broken,
                    record.cluster,
                    record.residue,
                ],
            )
            .map_err(|e| SnacklineError::Storage(format!("Failed to save breakage sample: {}", e)))?;
            Ok(())
        })
    }

    /// Fetch every breakage sample, in insertion order.
    pub fn fetch_all(&self) -> Result<Vec<BreakageSample>, SnacklineError> {
        self.fetch_range(None, None)
    }

    /// Fetch breakage samples within an optional inclusive date range.
    pub fn fetch_range(
        &self,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<Vec<BreakageSample>, SnacklineError> {
        self.db.with_conn(|conn| {
            let (clause, params) = date_range_clause(None, from, to);
            let sql = format!(
                "SELECT date, line, product_code, good, broken, cluster, residue
                 FROM breakage{} ORDER BY id",
                clause
            );
            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| SnacklineError::Storage(format!("Breakage query prepare: {}", e)))?;

            let rows = stmt
                .query_map(rusqlite::params_from_iter(params.iter()), |row| {
                    Ok(BreakageSample {
                        date: row.get(0)?,
                        line: row.get(1)?,
                        product_code: row.get(2)?,
                        good: row.get(3)?,
                        broken: row.get(4)?,
                        cluster: row.get(5)?,
                        residue: row.get(6)?,
                    })
                })
                .map_err(|e| SnacklineError::Storage(format!("Breakage query: {}", e)))?;

            let mut results = Vec::new();
            for row in rows {
                results.push(row.map_err(|e| SnacklineError::Storage(e.to_string()))?);
            }
            Ok(results)
        })
    }
}

/// Repository for production log entries.
pub struct ProductionLogRepository {
    db: Arc<Database>,
}

impl ProductionLogRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Store a new log entry.
    pub fn insert(&self, record: &LogEntry) -> Result<(), SnacklineError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO production_log (date, time, line, action, stop_reason, stop_other)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    record.date,
                    record.time,
                    record.line,
                    record.action,
                    record.stop_reason,
                    record.stop_other,
                ],
            )
            .map_err(|e| SnacklineError::Storage(format!("Failed to save log entry: {}", e)))?;
            Ok(())
        })
    }

    /// Fetch every log entry, in insertion order.
    pub fn fetch_all(&self) -> Result<Vec<LogEntry>, SnacklineError> {
        self.query(None, None, None)
    }

    /// Fetch `action = 'Stop'` entries within an optional inclusive date range.
    pub fn fetch_stops_range(
        &self,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<Vec<LogEntry>, SnacklineError> {
        self.query(Some("action = 'Stop'"), from, to)
    }

    fn query(
        &self,
        leading: Option<&str>,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<Vec<LogEntry>, SnacklineError> {
        self.db.with_conn(|conn| {
            let (clause, params) = date_range_clause(leading, from, to);
            let sql = format!(
                "SELECT date, time, line, action, stop_reason, stop_other
                 FROM production_log{} ORDER BY id",
                clause
            );
            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| SnacklineError::Storage(format!("Log query prepare: {}", e)))?;

            let rows = stmt
                .query_map(rusqlite::params_from_iter(params.iter()), |row| {
                    Ok(LogEntry {
                        date: row.get(0)?,
                        time: row.get(1)?,
                        line: row.get(2)?,
                        action: row.get(3)?,
                        stop_reason: row.get(4)?,
                        stop_other: row.get(5)?,
                    })
                })
                .map_err(|e| SnacklineError::Storage(format!("Log query: {}", e)))?;

            let mut results = Vec::new();
            for row in rows {
                results.push(row.map_err(|e| SnacklineError::Storage(e.to_string()))?);
            }
            Ok(results)
        })
    }
}

/// Row counts per event table, for the health endpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableCounts {
    pub leak_tests: u64,
    pub oxygen_tests: u64,
    pub breakage: u64,
    pub production_log: u64,
}

/// Count the rows in each event table.
pub fn table_counts(db: &Database) -> Result<TableCounts, SnacklineError> {
    db.with_conn(|conn| {
        let count = |table: &str| -> Result<u64, SnacklineError> {
            let n: i64 = conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                    row.get(0)
                })
                .map_err(|e| SnacklineError::Storage(e.to_string()))?;
            Ok(n as u64)
        };
        Ok(TableCounts {
            leak_tests: count("leak_tests")?,
            oxygen_tests: count("oxygen_tests")?,
            breakage: count("breakage")?,
            production_log: count("production_log")?,
        })
    })
}
