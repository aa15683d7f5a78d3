//! The query & aggregation engine.
//!
//! One request-scoped pass per call: fetch the filtered rows for each
//! event kind, fold them into series and KPIs, and retain the filtered
//! row-sets in the raw bundle. Any storage failure aborts the whole
//! aggregation; empty results produce sentinel KPIs, never errors.

use std::collections::BTreeMap;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use snackline_core::error::Result;
use snackline_core::records::effective_stop_cause;
use snackline_storage::{
    BreakageRepository, Database, LeakRepository, OxygenRepository, ProductionLogRepository,
};

use crate::filter::FilterSpec;
use crate::result::{
    BreakageSeries, DashboardData, Kpis, KpiAverage, LeakSeries, OxygenSeries, RawBundle,
    StopCauseRow, StopSeries,
};

/// Round half away from zero to 2 decimal places. Applied uniformly to
/// every numeric KPI.
fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Mean of a slice as a KPI, with the no-data sentinel for an empty slice.
fn average_kpi(values: &[f64]) -> KpiAverage {
    if values.is_empty() {
        KpiAverage::NoData
    } else {
        KpiAverage::Value(round2(values.iter().sum::<f64>() / values.len() as f64))
    }
}

/// Executes filtered retrieval and aggregation for the dashboard.
pub struct DashboardEngine {
    db: Arc<Database>,
}

impl DashboardEngine {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Produce the unified dashboard bundle for a filter specification.
    pub fn aggregate(&self, spec: &FilterSpec) -> Result<DashboardData> {
        let from = spec.from_date.as_deref();
        let to = spec.to_date.as_deref();

        let leak_rows: Vec<_> = LeakRepository::new(Arc::clone(&self.db))
            .fetch_range(from, to)?
            .into_iter()
            .filter(|r| spec.matches_leak(r))
            .collect();
        let oxygen_rows: Vec<_> = OxygenRepository::new(Arc::clone(&self.db))
            .fetch_range(from, to)?
            .into_iter()
            .filter(|r| spec.matches_oxygen(r))
            .collect();
        let breakage_rows: Vec<_> = BreakageRepository::new(Arc::clone(&self.db))
            .fetch_range(from, to)?
            .into_iter()
            .filter(|r| spec.matches_breakage(r))
            .collect();
        let stop_rows: Vec<_> = ProductionLogRepository::new(Arc::clone(&self.db))
            .fetch_stops_range(from, to)?
            .into_iter()
            .filter(|r| spec.matches_stop(r))
            .collect();

        debug!(
            leak = leak_rows.len(),
            oxygen = oxygen_rows.len(),
            breakage = breakage_rows.len(),
            stop = stop_rows.len(),
            "Aggregating filtered rows"
        );

        // Leak: group by date, ascending (ISO dates are string-sortable).
        // "Pass" is the only positive discriminator; anything else counts
        // as a failure, not an excluded row.
        let mut leak_group: BTreeMap<String, (u64, u64)> = BTreeMap::new();
        for row in &leak_rows {
            let bucket = leak_group.entry(row.date.clone()).or_default();
            if row.result == "Pass" {
                bucket.0 += 1;
            } else {
                bucket.1 += 1;
            }
        }
        let total_pass: u64 = leak_group.values().map(|(p, _)| p).sum();
        let total: u64 = leak_group.values().map(|(p, f)| p + f).sum();
        let pass_rate = round2(total_pass as f64 / total.max(1) as f64 * 100.0);

        let mut leak = LeakSeries::default();
        for (date, (pass, fail)) in &leak_group {
            leak.date.push(date.clone());
            leak.pass.push(*pass);
            leak.fail.push(*fail);
        }

        // Oxygen: retrieval order, no forced sort.
        let mut oxygen = OxygenSeries::default();
        for row in &oxygen_rows {
            oxygen.date.push(row.date.clone());
            oxygen.oxygen.push(row.oxygen);
        }
        let avg_oxygen = average_kpi(&oxygen.oxygen);

        // Breakage: parallel vectors in retrieval order.
        let mut breakage = BreakageSeries::default();
        for row in &breakage_rows {
            breakage.code.push(row.product_code.clone());
            breakage.good.push(row.good);
            breakage.broken.push(row.broken);
            breakage.cluster.push(row.cluster);
            breakage.residue.push(row.residue);
        }
        let avg_breakage = average_kpi(&breakage.broken);

        // Stop causes: resolved label tally in first-occurrence order.
        let mut stop_count: IndexMap<String, u64> = IndexMap::new();
        let mut stop_raw = Vec::with_capacity(stop_rows.len());
        for row in &stop_rows {
            let cause = effective_stop_cause(row).to_string();
            *stop_count.entry(cause.clone()).or_insert(0) += 1;
            stop_raw.push(StopCauseRow {
                date: row.date.clone(),
                time: row.time.clone(),
                line: row.line.clone(),
                cause,
            });
        }
        // Ties break toward the first-encountered label, so only a strictly
        // greater count displaces the current best.
        let mut top_stop = "-".to_string();
        let mut top_count = 0u64;
        for (label, count) in &stop_count {
            if *count > top_count {
                top_stop = label.clone();
                top_count = *count;
            }
        }
        let mut stop = StopSeries::default();
        for (label, count) in &stop_count {
            stop.label.push(label.clone());
            stop.count.push(*count);
        }

        Ok(DashboardData {
            kpi: Kpis {
                pass_rate,
                avg_oxygen,
                avg_breakage,
                top_stop,
            },
            leak,
            oxygen,
            breakage,
            stop,
            raw: RawBundle {
                leak: leak_rows,
                oxygen: oxygen_rows,
                breakage: breakage_rows,
                stop: stop_raw,
            },
        })
    }
}
