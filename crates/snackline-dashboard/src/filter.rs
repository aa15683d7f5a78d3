//! Filter normalization.
//!
//! Clients send a loosely-typed JSON object; [`FilterSpec::from_value`]
//! degrades every malformed or missing field to "no filter on this
//! dimension" instead of rejecting the request. Absence is a valid,
//! permissive state, not an error.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use snackline_core::records::{BreakageSample, LeakTest, LogEntry, OxygenTest};

/// A validated, typed filter specification.
///
/// Empty multi-select vectors mean match-all; `None` dates mean an open
/// bound. `product_code` is a substring search against breakage records,
/// not a key lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub from_date: Option<String>,
    pub to_date: Option<String>,
    pub lines: Vec<String>,
    pub flavours: Vec<String>,
    pub grammages: Vec<String>,
    pub product_code: Option<String>,
}

impl FilterSpec {
    /// Normalize an arbitrary client-supplied JSON object.
    ///
    /// Never fails: unknown keys are ignored, mistyped or unparseable
    /// fields fall back to the permissive default. The caller is expected
    /// to have already rejected payloads that are not JSON objects at all.
    pub fn from_value(value: &Value) -> Self {
        Self {
            from_date: iso_date(value.get("fromDate")),
            to_date: iso_date(value.get("toDate")),
            lines: string_set(value.get("lines")),
            flavours: string_set(value.get("flavours")),
            grammages: string_set(value.get("grammages")),
            product_code: non_empty_string(value.get("productCode")),
        }
    }

    /// Inclusive date-range check on an ISO `YYYY-MM-DD` string.
    fn date_in_range(&self, date: &str) -> bool {
        if let Some(ref from) = self.from_date {
            if date < from.as_str() {
                return false;
            }
        }
        if let Some(ref to) = self.to_date {
            if date > to.as_str() {
                return false;
            }
        }
        true
    }

    /// Multi-select OR semantics: an empty set filters nothing.
    fn in_set(set: &[String], value: &str) -> bool {
        set.is_empty() || set.iter().any(|s| s == value)
    }

    pub fn matches_leak(&self, row: &LeakTest) -> bool {
        self.date_in_range(&row.date)
            && Self::in_set(&self.lines, &row.line)
            && Self::in_set(&self.flavours, &row.flavour)
            && Self::in_set(&self.grammages, &row.grammage)
    }

    pub fn matches_oxygen(&self, row: &OxygenTest) -> bool {
        self.date_in_range(&row.date)
            && Self::in_set(&self.lines, &row.line)
            && Self::in_set(&self.flavours, &row.flavour)
            && Self::in_set(&self.grammages, &row.grammage)
    }

    /// Breakage rows filter on line and product-code containment; flavour
    /// and grammage are not recorded for breakage samples.
    pub fn matches_breakage(&self, row: &BreakageSample) -> bool {
        self.date_in_range(&row.date)
            && Self::in_set(&self.lines, &row.line)
            && self
                .product_code
                .as_ref()
                .map(|code| row.product_code.contains(code.as_str()))
                .unwrap_or(true)
    }

    /// Stop rows filter on date and line only.
    pub fn matches_stop(&self, row: &LogEntry) -> bool {
        self.date_in_range(&row.date) && Self::in_set(&self.lines, &row.line)
    }
}

/// Keep a date field only if it is a string that parses as `%Y-%m-%d`.
fn iso_date(value: Option<&Value>) -> Option<String> {
    let s = value?.as_str()?;
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    Some(s.to_string())
}

/// Accept either a JSON array of strings or a single string; anything else
/// (or empty strings) contributes nothing to the set.
fn string_set(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

fn non_empty_string(value: Option<&Value>) -> Option<String> {
    let s = value?.as_str()?;
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}
