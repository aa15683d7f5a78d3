//! Snackline Export crate - spreadsheet assembly.
//!
//! Converts row-sets into `.xlsx` workbooks: one four-sheet workbook for
//! the filtered dashboard bundle, and single-sheet dumps for the
//! unfiltered per-kind export endpoints.

pub mod workbook;

pub use workbook::{
    breakage_workbook, build_workbook, leak_workbook, oxygen_workbook, production_log_workbook,
};
