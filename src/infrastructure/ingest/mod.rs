// ============================================================
// UPLOAD INGESTION
// ============================================================
// Turn uploaded file bytes into a raw string table

mod csv_parser;
mod excel_parser;

pub use csv_parser::CsvParser;
pub use excel_parser::ExcelParser;

use crate::domain::error::{AppError, Result};
use crate::domain::traffic::RawTable;

/// Upload formats accepted by the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Csv,
    Excel,
}

impl FileKind {
    pub fn from_filename(filename: &str) -> Result<Self> {
        let lower = filename.to_lowercase();
        if lower.ends_with(".csv") || lower.ends_with(".txt") {
            Ok(Self::Csv)
        } else if lower.ends_with(".xlsx") || lower.ends_with(".xls") {
            Ok(Self::Excel)
        } else {
            Err(AppError::ValidationError(format!(
                "Unsupported file type: {} (expected csv, txt, xlsx or xls)",
                filename
            )))
        }
    }
}

pub fn read_upload(filename: &str, bytes: &[u8]) -> Result<RawTable> {
    match FileKind::from_filename(filename)? {
        FileKind::Csv => CsvParser::parse_bytes_auto_detect(bytes),
        FileKind::Excel => ExcelParser::parse_bytes(bytes),
    }
}
