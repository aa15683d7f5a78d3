//! Domain records for the four event kinds.
//!
//! Every record is an immutable fact: created once by a form submission,
//! read-only afterward. The tables are flat and unrelated; they are joined
//! only by the shared filter dimensions (date, line, flavour, grammage).
//! Dates are ISO `YYYY-MM-DD` strings so lexical order equals chronological
//! order.

use serde::{Deserialize, Serialize};

/// A packaging leak test. Only `result` is aggregated; the literal string
/// `"Pass"` is the single positive discriminator, anything else counts as
/// a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeakTest {
    pub date: String,
    pub line: String,
    pub flavour: String,
    pub grammage: String,
    pub pressure: String,
    pub result: String,
    #[serde(default)]
    pub remarks: String,
    /// Reference into the upload store; never exported.
    #[serde(default)]
    pub photo_ref: String,
}

/// A residual-oxygen measurement on a sealed pack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OxygenTest {
    pub date: String,
    pub line: String,
    pub flavour: String,
    pub grammage: String,
    #[serde(default)]
    pub temperature: f64,
    /// Residual oxygen, percent. Missing input is coerced to 0.0 upstream.
    #[serde(default)]
    pub oxygen: f64,
}

/// A breakage count sample for one product code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakageSample {
    pub date: String,
    pub line: String,
    pub product_code: String,
    #[serde(default)]
    pub good: f64,
    #[serde(default)]
    pub broken: f64,
    #[serde(default)]
    pub cluster: f64,
    #[serde(default)]
    pub residue: f64,
}

/// A production log entry. Only `action = "Stop"` rows feed the stop-cause
/// ranking; `stop_reason`/`stop_other` follow the resolution rule in
/// [`effective_stop_cause`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub date: String,
    pub time: String,
    pub line: String,
    pub action: String,
    #[serde(default)]
    pub stop_reason: String,
    #[serde(default)]
    pub stop_other: String,
}

/// Resolve the effective stop-cause label for a log entry.
///
/// `stop_reason = "Other"` means the operator typed the real cause into the
/// free-text field, so the label is taken from `stop_other`; any other
/// reason is used verbatim. This rule is applied everywhere stop causes are
/// counted or displayed (series aggregation, KPI ranking, export) and must
/// not be re-derived inline.
pub fn effective_stop_cause(entry: &LogEntry) -> &str {
    if entry.stop_reason == "Other" {
        &entry.stop_other
    } else {
        &entry.stop_reason
    }
}
