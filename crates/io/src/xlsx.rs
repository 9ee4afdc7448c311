// Excel import (calamine) and export (rust_xlsxwriter)

use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader, Sheets};
use log::debug;
use plantgeo_recon::{Table, Value};
use rust_xlsxwriter::{Format, Workbook};

use crate::error::IoError;

/// Read the first worksheet of an xlsx/xls/xlsb/ods file.
///
/// The first non-blank row of the used range is the header; blank header
/// cells become `Unnamed: <index>`.
pub fn read_first_sheet(path: &Path) -> Result<Table, IoError> {
    let mut workbook: Sheets<_> = open_workbook_auto(path)?;
    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let Some(first) = sheet_names.first() else {
        return Err(IoError::NoSheets(path.to_path_buf()));
    };

    let range = workbook.worksheet_range(first)?;
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    debug!(
        "Sheet '{first}' in {}: {:?} cells starting at ({start_row}, {start_col})",
        path.display(),
        range.get_size()
    );
    Ok(range_to_table(&range))
}

fn range_to_table(range: &Range<Data>) -> Table {
    let mut rows = range
        .rows()
        .map(|row| row.iter().map(cell_value).collect::<Vec<_>>())
        .skip_while(|row| row.iter().all(Value::is_null));

    let Some(header) = rows.next() else {
        return Table::default();
    };
    let columns = header
        .iter()
        .enumerate()
        .map(|(i, v)| v.to_text().unwrap_or_else(|| format!("Unnamed: {i}")))
        .collect();

    let mut table = Table::new(columns);
    for row in rows {
        table.push_row(row);
    }
    table
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) => Value::text(s.as_str()),
        Data::Float(n) => Value::number(*n),
        Data::Int(n) => Value::number(*n as f64),
        Data::Bool(b) => Value::Bool(*b),
        Data::Error(e) => Value::text(format!("#{:?}", e)),
        // Serial date number; the reference data has no date columns we interpret
        Data::DateTime(dt) => Value::number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::text(s.as_str()),
    }
}

/// Write `table` to a single-sheet workbook with a bold header row.
pub fn write_table(table: &Table, path: &Path, sheet_name: &str) -> Result<(), IoError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    for (col, name) in table.columns().iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, name, &header)?;
    }
    for (row_idx, row) in table.rows().iter().enumerate() {
        let row32 = (row_idx + 1) as u32;
        for (col, value) in row.iter().enumerate() {
            let col16 = col as u16;
            match value {
                Value::Null => {}
                Value::Text(s) => {
                    worksheet.write_string(row32, col16, s)?;
                }
                Value::Number(n) => {
                    worksheet.write_number(row32, col16, *n)?;
                }
                Value::Bool(b) => {
                    worksheet.write_boolean(row32, col16, *b)?;
                }
            }
        }
    }

    workbook.save(path)?;
    Ok(())
}
