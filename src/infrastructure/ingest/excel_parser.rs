use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, DataType, Range, Reader};
use tracing::debug;

use crate::domain::error::AppError;
use crate::domain::traffic::RawTable;

/// Reads the first worksheet of an `.xlsx`/`.xls` upload
pub struct ExcelParser;

impl ExcelParser {
    pub fn parse_bytes(bytes: &[u8]) -> Result<RawTable, AppError> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
            .map_err(|e| AppError::ParseError(format!("Failed to open Excel file: {}", e)))?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| AppError::ParseError("No worksheet found".to_string()))?
            .map_err(|e| AppError::ParseError(format!("Failed to read Excel range: {}", e)))?;

        let table = Self::range_to_table(&range)?;
        debug!(rows = table.len(), columns = table.headers.len(), "Excel sheet read");
        Ok(table)
    }

    fn range_to_table(range: &Range<Data>) -> Result<RawTable, AppError> {
        let mut rows = range.rows();

        let headers: Vec<String> = rows
            .next()
            .ok_or_else(|| AppError::ParseError("Excel sheet is empty".to_string()))?
            .iter()
            .map(|cell| Self::cell_to_string(cell).trim().to_string())
            .collect();

        // Cell text stays as entered; only header names are trimmed
        let body = rows
            .map(|row| row.iter().map(Self::cell_to_string).collect::<Vec<_>>())
            .filter(|row| row.iter().any(|v| !v.trim().is_empty()))
            .collect();

        Ok(RawTable::new(headers, body))
    }

    /// Render a cell the way the CSV path would see it
    fn cell_to_string(cell: &Data) -> String {
        if cell.is_datetime() || cell.is_datetime_iso() {
            if let Some(dt) = cell.as_datetime() {
                return dt.format("%Y-%m-%d %H:%M:%S").to_string();
            }
        }
        if cell.is_empty() {
            return String::new();
        }
        cell.as_string().unwrap_or_else(|| format!("{}", cell))
    }
}
