use std::io::{Cursor, Read, Seek};
use std::path::Path;

use calamine::{DataType, Range, Reader, Xlsx, open_workbook};
use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::khaapa::insights::error::{Result, ToolError};
use crate::khaapa::insights::model::{CellValue, RawRow};

/// Reads the first sheet of a workbook on disk.
pub fn read_first_sheet(path: &Path) -> Result<Vec<RawRow>> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    first_sheet_rows(&mut workbook)
}

/// Reads the first sheet of a workbook held in memory, such as a downloaded file.
pub fn read_first_sheet_bytes(bytes: Vec<u8>) -> Result<Vec<RawRow>> {
    let mut workbook = Xlsx::new(Cursor::new(bytes))?;
    first_sheet_rows(&mut workbook)
}

fn first_sheet_rows<R: Read + Seek>(workbook: &mut Xlsx<R>) -> Result<Vec<RawRow>> {
    let Some(range) = workbook.worksheet_range_at(0) else {
        return Ok(Vec::new());
    };
    let range = range.map_err(ToolError::from)?;
    Ok(range_to_rows(&range))
}

/// Converts a sheet range into raw rows. Trailing empty cells are dropped so
/// rows carry the same ragged shape the values API returns.
pub fn range_to_rows(range: &Range<DataType>) -> Vec<RawRow> {
    range
        .rows()
        .map(|row| {
            let mut cells: RawRow = row.iter().map(cell_to_value).collect();
            while cells.last().is_some_and(CellValue::is_null) {
                cells.pop();
            }
            cells
        })
        .collect()
}

fn cell_to_value(cell: &DataType) -> CellValue {
    match cell {
        DataType::String(value) => CellValue::Text(value.clone()),
        DataType::Float(value) => CellValue::Number(*value),
        DataType::Int(value) => CellValue::Number(*value as f64),
        DataType::Bool(value) => CellValue::Text(value.to_string()),
        DataType::Empty => CellValue::Null,
        DataType::DateTime(serial) => match serial_to_datetime(*serial) {
            Some(moment) if serial.fract() == 0.0 => {
                CellValue::Text(moment.format("%Y-%m-%d").to_string())
            }
            Some(moment) => CellValue::Text(moment.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => CellValue::Number(*serial),
        },
        DataType::DateTimeIso(value) => CellValue::Text(value.clone()),
        other => CellValue::Text(other.to_string()),
    }
}

/// Converts a 1900-system Excel serial date. Serials before March 1900 are
/// off by one day because of the 1900 leap-year quirk; they do not occur in
/// practice.
fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    epoch.checked_add_signed(Duration::milliseconds(millis))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_empty_cells_are_trimmed() {
        let mut range: Range<DataType> = Range::new((0, 0), (1, 2));
        range.set_value((0, 0), DataType::String("Item".into()));
        range.set_value((0, 1), DataType::String("Total Profit".into()));
        range.set_value((1, 0), DataType::String("Pen".into()));

        let rows = range_to_rows(&range);
        assert_eq!(
            rows,
            vec![
                vec![
                    CellValue::Text("Item".into()),
                    CellValue::Text("Total Profit".into())
                ],
                vec![CellValue::Text("Pen".into())],
            ]
        );
    }

    #[test]
    fn numeric_cells_stay_numeric() {
        assert_eq!(cell_to_value(&DataType::Int(4)), CellValue::Number(4.0));
        assert_eq!(cell_to_value(&DataType::Float(2.5)), CellValue::Number(2.5));
        assert_eq!(cell_to_value(&DataType::Bool(true)), CellValue::Text("true".into()));
    }

    #[test]
    fn date_cells_render_as_calendar_dates() {
        assert_eq!(
            cell_to_value(&DataType::DateTime(45292.0)),
            CellValue::Text("2024-01-01".into())
        );
        assert_eq!(
            cell_to_value(&DataType::DateTime(45292.5)),
            CellValue::Text("2024-01-01 12:00:00".into())
        );
        assert_eq!(
            cell_to_value(&DataType::DateTimeIso("2024-03-04T08:30:00".into())),
            CellValue::Text("2024-03-04T08:30:00".into())
        );
    }

    #[test]
    fn same_day_dates_count_once_in_a_day_column() {
        let mut range: Range<DataType> = Range::new((0, 0), (2, 0));
        range.set_value((0, 0), DataType::String("Day".into()));
        range.set_value((1, 0), DataType::DateTime(45293.0));
        range.set_value((2, 0), DataType::DateTime(45293.0));

        let rows = range_to_rows(&range);
        assert_eq!(rows[1], rows[2]);
        assert_eq!(rows[1], vec![CellValue::Text("2024-01-02".into())]);
    }
}
