//! Legacy workbook conversion.
//!
//! Older exports often arrive as `.xls`. [`convert_workbook_to_xlsx`] rewrites the first sheet of
//! any workbook calamine can read as a modern `.xlsx` file so downstream tools only need to
//! handle one format.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook, Worksheet};

use crate::error::{IngestionError, IngestionResult};

const DATETIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";
const DURATION_FORMAT: &str = "[h]:mm:ss";
const TIME_FORMAT: &str = "hh:mm:ss";

/// Convert the first sheet of `src` into a single-sheet `.xlsx` workbook at `dst`.
///
/// Cells keep their position and value. Date cells are rewritten from their calendar value, so
/// workbooks on the 1904 date system keep their dates in the 1900-based output. Durations and
/// bare times stay serial numbers with a time format. Empty cells are skipped.
///
/// Returns the number of cells written.
pub fn convert_workbook_to_xlsx(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> IngestionResult<usize> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    let mut source = open_workbook_auto(src)?;
    let sheet_name = source.sheet_names().first().cloned();
    let range = source
        .worksheet_range_at(0)
        .ok_or_else(|| IngestionError::SchemaMismatch {
            message: format!("workbook has no sheets ({})", src.display()),
        })??;

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    if let Some(name) = sheet_name.as_deref() {
        sheet.set_name(name)?;
    }

    let (row0, col0) = range.start().unwrap_or((0, 0));
    let mut written = 0usize;
    for (r, c, cell) in range.used_cells() {
        let row = row0 + r as u32;
        let col = u16::try_from(col0 as usize + c).map_err(|_| IngestionError::SchemaMismatch {
            message: format!("column {} exceeds the xlsx column limit", col0 as usize + c),
        })?;
        if write_cell(sheet, row, col, cell)? {
            written += 1;
        }
    }

    workbook.save(dst)?;
    tracing::debug!(
        src = %src.display(),
        dst = %dst.display(),
        cells = written,
        "converted workbook to xlsx"
    );
    Ok(written)
}

fn write_cell(sheet: &mut Worksheet, row: u32, col: u16, cell: &Data) -> IngestionResult<bool> {
    match cell {
        Data::Empty => return Ok(false),
        Data::String(s) => {
            sheet.write_string(row, col, s)?;
        }
        Data::Int(i) => {
            sheet.write_number(row, col, *i as f64)?;
        }
        Data::Float(f) => {
            sheet.write_number(row, col, *f)?;
        }
        Data::Bool(b) => {
            sheet.write_boolean(row, col, *b)?;
        }
        Data::DateTime(edt) if edt.is_duration() => {
            sheet.write_number_with_format(row, col, edt.as_f64(), &Format::new().set_num_format(DURATION_FORMAT))?;
        }
        // A fraction of a day with no date part.
        Data::DateTime(edt) if edt.as_f64() < 1.0 => {
            sheet.write_number_with_format(row, col, edt.as_f64(), &Format::new().set_num_format(TIME_FORMAT))?;
        }
        Data::DateTime(edt) => {
            let (year, month, day, hour, min, sec, milli) = edt.to_ymd_hms_milli();
            let datetime = ExcelDateTime::from_ymd(year, month, day)?.and_hms_milli(hour.into(), min, sec, milli)?;
            sheet.write_datetime_with_format(row, col, &datetime, &Format::new().set_num_format(DATETIME_FORMAT))?;
        }
        Data::DateTimeIso(s) | Data::DurationIso(s) => {
            sheet.write_string(row, col, s)?;
        }
        Data::Error(_) => {
            sheet.write_string(row, col, cell.to_string())?;
        }
    }
    Ok(true)
}
