use std::path::Path;

use anyhow::{bail, Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use chrono::Timelike;

use super::model::{CellValue, Row, Table, Workbook};
use super::table::TableError;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a multi-sheet workbook from an `.xlsx` file.
///
/// Every sheet is parsed eagerly. The first row of a sheet is taken as the
/// header; the remaining rows become data rows keyed by header name. Sheets
/// are kept in file order. Any read or parse failure surfaces as
/// [`TableError::Parse`].
pub fn load_workbook(path: &Path) -> Result<Workbook, TableError> {
    Ok(read_workbook(path)?)
}

fn read_workbook(path: &Path) -> Result<Workbook> {
    let mut reader = open_workbook_auto(path)
        .with_context(|| format!("opening workbook {}", path.display()))?;

    let sheet_names = reader.sheet_names().to_vec();
    if sheet_names.is_empty() {
        bail!("workbook contains no sheets");
    }

    let mut sheets = Vec::with_capacity(sheet_names.len());
    for name in sheet_names {
        let range = reader
            .worksheet_range(&name)
            .with_context(|| format!("reading sheet '{name}'"))?;
        sheets.push((name, range_to_table(&range)));
    }

    Ok(Workbook { sheets })
}

// ---------------------------------------------------------------------------
// Sheet conversion
// ---------------------------------------------------------------------------

fn range_to_table(range: &calamine::Range<Data>) -> Table {
    let mut rows_iter = range.rows();

    let headers: Vec<String> = match rows_iter.next() {
        Some(header_row) => header_row.iter().map(header_name).collect(),
        None => return Table::default(),
    };

    let mut rows = Vec::new();
    for cells in rows_iter {
        let mut row = Row::new();
        for (idx, cell) in cells.iter().enumerate() {
            let Some(name) = headers.get(idx) else {
                continue;
            };
            if name.is_empty() {
                continue;
            }
            row.insert(name.clone(), cell_to_value(cell));
        }
        rows.push(row);
    }

    let columns = headers.into_iter().filter(|h| !h.is_empty()).collect();
    Table { columns, rows }
}

fn header_name(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => cell_to_value(other).to_string(),
    }
}

fn cell_to_value(cell: &Data) -> CellValue {
    match cell {
        Data::String(s) => CellValue::String(s.clone()),
        Data::Int(i) => CellValue::Integer(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(dt) => CellValue::Date(format_datetime(dt)),
            // Not representable as a date; keep the raw serial number.
            None => CellValue::Float(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Date(s.clone()),
        Data::Error(e) => CellValue::String(format!("{e:?}")),
        Data::Empty => CellValue::Null,
    }
}

/// Date cells with a midnight time component render as a bare date.
fn format_datetime(dt: chrono::NaiveDateTime) -> String {
    let time = dt.time();
    if time.hour() == 0 && time.minute() == 0 && time.second() == 0 {
        dt.format("%Y-%m-%d").to_string()
    } else {
        dt.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_convert_to_matching_value_kinds() {
        assert_eq!(
            cell_to_value(&Data::String("TV".into())),
            CellValue::String("TV".into())
        );
        assert_eq!(cell_to_value(&Data::Int(7)), CellValue::Integer(7));
        assert_eq!(cell_to_value(&Data::Float(123.0)), CellValue::Float(123.0));
        assert_eq!(cell_to_value(&Data::Bool(true)), CellValue::Bool(true));
        assert_eq!(cell_to_value(&Data::Empty), CellValue::Null);
    }

    #[test]
    fn midnight_dates_render_without_time() {
        let midnight = chrono::NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(format_datetime(midnight), "2024-03-01");

        let afternoon = chrono::NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(14, 30, 5)
            .unwrap();
        assert_eq!(format_datetime(afternoon), "2024-03-01 14:30:05");
    }

    #[test]
    fn missing_workbook_surfaces_as_a_typed_parse_error() {
        let err = load_workbook(Path::new("/nonexistent/derby.xlsx")).unwrap_err();
        assert!(matches!(&err, TableError::Parse(_)));
        assert!(err.to_string().contains("opening workbook"));
    }
}
