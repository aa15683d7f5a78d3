//! Result shapes produced by the aggregation engine.
//!
//! [`DashboardData`] is the unified bundle serialized to the dashboard
//! client; [`RawBundle`] carries the exact filtered row-sets so the
//! exporter reproduces precisely what the dashboard displayed.

use serde::de::{self, Deserializer, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use snackline_core::records::{BreakageSample, LeakTest, OxygenTest};

/// An averaged KPI that distinguishes "no matching rows" from a true zero.
///
/// Serializes as a plain number, or as the sentinel string `"-"` when no
/// data matched. An empty oxygen set is meaningfully different from a 0%
/// average, so this must never collapse to 0.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KpiAverage {
    Value(f64),
    NoData,
}

impl Serialize for KpiAverage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            KpiAverage::Value(v) => serializer.serialize_f64(*v),
            KpiAverage::NoData => serializer.serialize_str("-"),
        }
    }
}

impl<'de> Deserialize<'de> for KpiAverage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct KpiVisitor;

        impl<'de> Visitor<'de> for KpiVisitor {
            type Value = KpiAverage;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a number or the sentinel string \"-\"")
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<KpiAverage, E> {
                Ok(KpiAverage::Value(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<KpiAverage, E> {
                Ok(KpiAverage::Value(v as f64))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<KpiAverage, E> {
                Ok(KpiAverage::Value(v as f64))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<KpiAverage, E> {
                if v == "-" {
                    Ok(KpiAverage::NoData)
                } else {
                    Err(de::Error::invalid_value(de::Unexpected::Str(v), &self))
                }
            }
        }

        deserializer.deserialize_any(KpiVisitor)
    }
}

/// The four KPI scalars shown at the top of the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kpis {
    /// Leak pass rate, percent, 2 decimals; 0.0 when no leak rows matched.
    pub pass_rate: f64,
    pub avg_oxygen: KpiAverage,
    pub avg_breakage: KpiAverage,
    /// Dominant stop cause; `"-"` when no stop rows matched.
    pub top_stop: String,
}

/// Leak pass/fail counts per date, ascending ISO date order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeakSeries {
    pub date: Vec<String>,
    pub pass: Vec<u64>,
    pub fail: Vec<u64>,
}

/// Oxygen readings in retrieval order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OxygenSeries {
    pub date: Vec<String>,
    pub oxygen: Vec<f64>,
}

/// Breakage counts per sample, parallel vectors in retrieval order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BreakageSeries {
    pub code: Vec<String>,
    pub good: Vec<f64>,
    pub broken: Vec<f64>,
    pub cluster: Vec<f64>,
    pub residue: Vec<f64>,
}

/// Stop-cause frequencies, first-occurrence order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StopSeries {
    pub label: Vec<String>,
    pub count: Vec<u64>,
}

/// A stop event with its cause label already resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopCauseRow {
    pub date: String,
    pub time: String,
    pub line: String,
    pub cause: String,
}

/// The exact filtered row-sets behind the aggregates. Echoed back by the
/// client for export, so the spreadsheet cannot race with newer inserts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawBundle {
    pub leak: Vec<LeakTest>,
    pub oxygen: Vec<OxygenTest>,
    pub breakage: Vec<BreakageSample>,
    pub stop: Vec<StopCauseRow>,
}

/// The unified aggregation result: KPIs, per-kind series, and the raw
/// bundle. Built all-or-nothing; never partially populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardData {
    pub kpi: Kpis,
    pub leak: LeakSeries,
    pub oxygen: OxygenSeries,
    pub breakage: BreakageSeries,
    pub stop: StopSeries,
    pub raw: RawBundle,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kpi_average_serializes_number() {
        let json = serde_json::to_string(&KpiAverage::Value(2.13)).unwrap();
        assert_eq!(json, "2.13");
    }

    #[test]
    fn test_kpi_average_serializes_sentinel() {
        let json = serde_json::to_string(&KpiAverage::NoData).unwrap();
        assert_eq!(json, "\"-\"");
    }

    #[test]
    fn test_kpi_average_deserializes_both_forms() {
        let v: KpiAverage = serde_json::from_str("2.13").unwrap();
        assert_eq!(v, KpiAverage::Value(2.13));
        let v: KpiAverage = serde_json::from_str("3").unwrap();
        assert_eq!(v, KpiAverage::Value(3.0));
        let v: KpiAverage = serde_json::from_str("\"-\"").unwrap();
        assert_eq!(v, KpiAverage::NoData);
    }

    #[test]
    fn test_kpi_average_rejects_other_strings() {
        let v: Result<KpiAverage, _> = serde_json::from_str("\"none\"");
        assert!(v.is_err());
    }

    #[test]
    fn test_sentinel_is_distinct_from_zero() {
        assert_ne!(KpiAverage::NoData, KpiAverage::Value(0.0));
    }

    #[test]
    fn test_raw_bundle_roundtrip() {
        let bundle = RawBundle {
            stop: vec![StopCauseRow {
                date: "2024-01-05".to_string(),
                time: "09:30".to_string(),
                line: "L1".to_string(),
                cause: "Jam".to_string(),
            }],
            ..RawBundle::default()
        };
        let json = serde_json::to_string(&bundle).unwrap();
        let back: RawBundle = serde_json::from_str(&json).unwrap();
        assert_eq!(back, bundle);
    }
}
