//! Workbook assembly.
//!
//! Every sheet is written headers-first, so an empty row-set still yields
//! a correctly-headered sheet. The whole buffer is produced or an error is
//! returned; no partial file ever leaves this module. Leak remarks and
//! photo references are reporting-internal and never exported.

use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use tracing::debug;

use snackline_core::error::{Result, SnacklineError};
use snackline_core::records::{
    effective_stop_cause, BreakageSample, LeakTest, LogEntry, OxygenTest,
};
use snackline_dashboard::RawBundle;

fn export_err(e: XlsxError) -> SnacklineError {
    SnacklineError::Export(e.to_string())
}

fn write_headers(sheet: &mut Worksheet, headers: &[&str]) -> std::result::Result<(), XlsxError> {
    let bold = Format::new().set_bold();
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, &bold)?;
    }
    Ok(())
}

fn write_leak_sheet(
    sheet: &mut Worksheet,
    rows: &[LeakTest],
) -> std::result::Result<(), XlsxError> {
    sheet.set_name("Leak Tests")?;
    write_headers(
        sheet,
        &["Date", "Line", "Flavour", "Grammage", "Pressure", "Result"],
    )?;
    for (i, row) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        sheet.write_string(r, 0, row.date.as_str())?;
        sheet.write_string(r, 1, row.line.as_str())?;
        sheet.write_string(r, 2, row.flavour.as_str())?;
        sheet.write_string(r, 3, row.grammage.as_str())?;
        sheet.write_string(r, 4, row.pressure.as_str())?;
        sheet.write_string(r, 5, row.result.as_str())?;
    }
    Ok(())
}

fn write_oxygen_sheet(
    sheet: &mut Worksheet,
    rows: &[OxygenTest],
) -> std::result::Result<(), XlsxError> {
    sheet.set_name("Oxygen Tests")?;
    write_headers(
        sheet,
        &["Date", "Line", "Flavour", "Grammage", "Temperature", "Oxygen"],
    )?;
    for (i, row) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        sheet.write_string(r, 0, row.date.as_str())?;
        sheet.write_string(r, 1, row.line.as_str())?;
        sheet.write_string(r, 2, row.flavour.as_str())?;
        sheet.write_string(r, 3, row.grammage.as_str())?;
        sheet.write_number(r, 4, row.temperature)?;
        sheet.write_number(r, 5, row.oxygen)?;
    }
    Ok(())
}

fn write_breakage_sheet(
    sheet: &mut Worksheet,
    rows: &[BreakageSample],
) -> std::result::Result<(), XlsxError> {
    sheet.set_name("Breakage")?;
    write_headers(
        sheet,
        &["Date", "Line", "Product Code", "Good", "Broken", "Cluster", "Residue"],
    )?;
    for (i, row) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        sheet.write_string(r, 0, row.date.as_str())?;
        sheet.write_string(r, 1, row.line.as_str())?;
        sheet.write_string(r, 2, row.product_code.as_str())?;
        sheet.write_number(r, 3, row.good)?;
        sheet.write_number(r, 4, row.broken)?;
        sheet.write_number(r, 5, row.cluster)?;
        sheet.write_number(r, 6, row.residue)?;
    }
    Ok(())
}

/// Build the four-sheet workbook from a filtered raw bundle.
///
/// Sheet order and names are fixed: "Leak Tests", "Oxygen Tests",
/// "Breakage", "Stop Reasons". Empty row-sets still get their sheet.
pub fn build_workbook(bundle: &RawBundle) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();

    write_leak_sheet(workbook.add_worksheet(), &bundle.leak).map_err(export_err)?;
    write_oxygen_sheet(workbook.add_worksheet(), &bundle.oxygen).map_err(export_err)?;
    write_breakage_sheet(workbook.add_worksheet(), &bundle.breakage).map_err(export_err)?;

    let sheet = workbook.add_worksheet();
    sheet.set_name("Stop Reasons").map_err(export_err)?;
    write_headers(sheet, &["Date", "Time", "Line", "Stop Reason"]).map_err(export_err)?;
    for (i, row) in bundle.stop.iter().enumerate() {
        let r = (i + 1) as u32;
        sheet.write_string(r, 0, row.date.as_str()).map_err(export_err)?;
        sheet.write_string(r, 1, row.time.as_str()).map_err(export_err)?;
        sheet.write_string(r, 2, row.line.as_str()).map_err(export_err)?;
        sheet.write_string(r, 3, row.cause.as_str()).map_err(export_err)?;
    }

    debug!(
        leak = bundle.leak.len(),
        oxygen = bundle.oxygen.len(),
        breakage = bundle.breakage.len(),
        stop = bundle.stop.len(),
        "Workbook assembled"
    );

    workbook.save_to_buffer().map_err(export_err)
}

/// Single-sheet dump of the full leak test table.
pub fn leak_workbook(rows: &[LeakTest]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    write_leak_sheet(workbook.add_worksheet(), rows).map_err(export_err)?;
    workbook.save_to_buffer().map_err(export_err)
}

/// Single-sheet dump of the full oxygen test table.
pub fn oxygen_workbook(rows: &[OxygenTest]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    write_oxygen_sheet(workbook.add_worksheet(), rows).map_err(export_err)?;
    workbook.save_to_buffer().map_err(export_err)
}

/// Single-sheet dump of the full breakage table.
pub fn breakage_workbook(rows: &[BreakageSample]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    write_breakage_sheet(workbook.add_worksheet(), rows).map_err(export_err)?;
    workbook.save_to_buffer().map_err(export_err)
}

/// Single-sheet dump of the full production log, with the stop cause
/// resolved to its effective label.
pub fn production_log_workbook(rows: &[LogEntry]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Production Log").map_err(export_err)?;
    write_headers(sheet, &["Date", "Time", "Line", "Action", "Stop Reason"])
        .map_err(export_err)?;
    for (i, row) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        sheet.write_string(r, 0, row.date.as_str()).map_err(export_err)?;
        sheet.write_string(r, 1, row.time.as_str()).map_err(export_err)?;
        sheet.write_string(r, 2, row.line.as_str()).map_err(export_err)?;
        sheet.write_string(r, 3, row.action.as_str()).map_err(export_err)?;
        sheet
            .write_string(r, 4, effective_stop_cause(row))
            .map_err(export_err)?;
    }
    workbook.save_to_buffer().map_err(export_err)
}
