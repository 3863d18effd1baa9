// ============================================================
// CSV PARSER
// ============================================================
// Decode uploaded CSV/TXT exports into a raw string table

use csv::{ReaderBuilder, StringRecord, Trim};
use encoding_rs::WINDOWS_1252;

use crate::domain::error::AppError;
use crate::domain::traffic::RawTable;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// CSV parser with Latin-1 fallback decoding.
/// Header names are trimmed; cell values are kept verbatim.
pub struct CsvParser {
    /// Delimiter character (default: comma)
    delimiter: u8,
}

impl Default for CsvParser {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl CsvParser {
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Decode raw upload bytes to text.
    ///
    /// Exports are produced as ISO-8859-1; files that are already valid
    /// UTF-8 are taken as-is so re-saved exports don't get double-decoded.
    /// WHATWG maps the ISO-8859-1 label to windows-1252, which is what
    /// `encoding_rs` provides.
    pub fn decode(bytes: &[u8]) -> String {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        match std::str::from_utf8(bytes) {
            Ok(text) => text.to_string(),
            Err(_) => {
                let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
                text.into_owned()
            }
        }
    }

    /// Parse upload bytes with automatic delimiter detection
    pub fn parse_bytes_auto_detect(bytes: &[u8]) -> Result<RawTable, AppError> {
        let content = Self::decode(bytes);
        let delimiter = Self::detect_delimiter(&content);
        Self::default().with_delimiter(delimiter).parse_content(&content)
    }

    /// Parse CSV content from string
    pub fn parse_content(&self, content: &str) -> Result<RawTable, AppError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .trim(Trim::Headers)
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| AppError::ParseError(format!("Failed to read CSV headers: {}", e)))?
            .iter()
            .map(|h| h.to_string())
            .collect();

        if headers.iter().all(|h| h.is_empty()) {
            return Err(AppError::ParseError("CSV file has no header row".to_string()));
        }

        let mut rows = Vec::new();
        for (index, result) in reader.records().enumerate() {
            let record = result.map_err(|e| {
                AppError::ParseError(format!("Failed to parse CSV row {}: {}", index + 1, e))
            })?;

            if record.iter().all(|v| v.trim().is_empty()) {
                continue;
            }
            rows.push(Self::align_row(headers.len(), &record));
        }

        Ok(RawTable::new(headers, rows))
    }

    /// Pad or cut a record to the header width
    fn align_row(width: usize, record: &StringRecord) -> Vec<String> {
        (0..width)
            .map(|idx| record.get(idx).unwrap_or("").to_string())
            .collect()
    }

    /// Detect delimiter from content (comma, semicolon, tab, pipe)
    pub fn detect_delimiter(content: &str) -> u8 {
        let candidates = [b',', b';', b'\t', b'|'];
        let sample_lines: Vec<_> = content.lines().take(10).collect();

        let mut best_delimiter = b',';
        let mut best_score = 0.0f32;

        if sample_lines.is_empty() {
            return best_delimiter;
        }

        for &delimiter in &candidates {
            let field_counts: Vec<usize> = sample_lines
                .iter()
                .map(|line| line.bytes().filter(|&b| b == delimiter).count())
                .collect();

            // Score by consistency (low standard deviation) and frequency
            let avg = field_counts.iter().sum::<usize>() as f32 / field_counts.len() as f32;
            let variance = field_counts
                .iter()
                .map(|&x| (x as f32 - avg).powi(2))
                .sum::<f32>()
                / field_counts.len() as f32;

            let score = avg / (1.0 + variance.sqrt());

            if score > best_score {
                best_score = score;
                best_delimiter = delimiter;
            }
        }

        best_delimiter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_csv() {
        let content = "Category Type,Server IP\nWeb,1.1.1.1\nGame,2.2.2.2";
        let table = CsvParser::default().parse_content(content).unwrap();

        assert_eq!(table.headers, vec!["Category Type", "Server IP"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[1], vec!["Game", "2.2.2.2"]);
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(CsvParser::detect_delimiter("a,b,c\nd,e,f"), b',');
        assert_eq!(CsvParser::detect_delimiter("a;b;c\nd;e;f"), b';');
        assert_eq!(CsvParser::detect_delimiter("a\tb\tc\nd\te\tf"), b'\t');
        assert_eq!(CsvParser::detect_delimiter(""), b',');
    }

    #[test]
    fn test_latin1_bytes_are_decoded() {
        // "Café" with 0xE9 for é, invalid as UTF-8
        let bytes = b"Name,Server IP\nCaf\xE9,1.1.1.1\n";
        let table = CsvParser::parse_bytes_auto_detect(bytes).unwrap();
        assert_eq!(table.rows[0][0], "Café");
    }

    #[test]
    fn test_bom_is_stripped() {
        let bytes = b"\xEF\xBB\xBFCategory Type,Server IP\nWeb,1.1.1.1\n";
        let table = CsvParser::parse_bytes_auto_detect(bytes).unwrap();
        assert_eq!(table.headers[0], "Category Type");
    }

    #[test]
    fn test_short_and_blank_rows() {
        let content = "a,b,c\n1,2\n,,\n4,5,6,7\n";
        let table = CsvParser::default().parse_content(content).unwrap();
        assert_eq!(table.rows, vec![vec!["1", "2", ""], vec!["4", "5", "6"]]);
    }

    #[test]
    fn test_cells_are_kept_verbatim() {
        let content = " Category Type , Application Type\nWeb , Other_UDP \n";
        let table = CsvParser::default().parse_content(content).unwrap();
        assert_eq!(table.headers, vec!["Category Type", "Application Type"]);
        assert_eq!(table.rows[0], vec!["Web ", " Other_UDP "]);
    }

    #[test]
    fn test_empty_content_fails() {
        assert!(CsvParser::default().parse_content("").is_err());
    }
}
