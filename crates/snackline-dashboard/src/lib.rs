//! Snackline Dashboard crate - filter normalization and the query &
//! aggregation engine.
//!
//! Turns a loosely-typed client filter payload into a typed [`FilterSpec`],
//! executes filtered retrieval against the event store, and folds the rows
//! into grouped time series, scalar KPIs, a ranked stop-cause breakdown,
//! and the raw row bundle the exporter reuses.

pub mod engine;
pub mod filter;
pub mod result;

pub use engine::DashboardEngine;
pub use filter::FilterSpec;
pub use result::{
    BreakageSeries, DashboardData, Kpis, KpiAverage, LeakSeries, OxygenSeries, RawBundle,
    StopCauseRow, StopSeries,
};
