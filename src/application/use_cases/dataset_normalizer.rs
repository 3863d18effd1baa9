// ============================================================
// DATASET NORMALIZER USE CASE
// ============================================================
// Canonical column names, unit conversion, timestamp parsing and
// a single enrichment pass over the uploaded table

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::application::use_cases::enrichment::{EnrichmentSummary, EnrichmentUseCase};
use crate::domain::error::{AppError, Result};
use crate::domain::traffic::{
    Dataset, RawTable, TrafficRecord, APPLICATION_TYPE, BYTES_PER_GB, CATEGORY_TYPE, END_TIME,
    SERVER_IP, START_TIME, TOTAL_TRAFFIC_B, TOTAL_TRAFFIC_GB,
};

static WHITESPACE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Export header -> canonical column name
static COLUMN_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("Category Type", CATEGORY_TYPE),
        ("Application Type", APPLICATION_TYPE),
        ("Start Time", START_TIME),
        ("End Time", END_TIME),
        ("Total Traffic(B)", TOTAL_TRAFFIC_B),
        ("Server IP", SERVER_IP),
    ])
});

pub const REQUIRED_COLUMNS: [&str; 6] = [
    CATEGORY_TYPE,
    APPLICATION_TYPE,
    START_TIME,
    END_TIME,
    TOTAL_TRAFFIC_B,
    SERVER_IP,
];

const DATETIME_FORMATS: [&str; 7] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    // Slash dates are month-first; day-first only when the month reading is impossible
    "%m/%d/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d-%m-%Y %H:%M:%S",
];

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d/%m/%Y"];

/// Normalized dataset plus what the enrichment pass did to it
#[derive(Debug, Clone)]
pub struct NormalizedDataset {
    pub dataset: Dataset,
    pub enrichment: EnrichmentSummary,
}

pub struct DatasetNormalizer {
    enrichment: Arc<EnrichmentUseCase>,
}

impl DatasetNormalizer {
    pub fn new(enrichment: Arc<EnrichmentUseCase>) -> Self {
        Self { enrichment }
    }

    /// Build the typed dataset and run enrichment once. The dataset is only
    /// returned after every lookup has finished.
    pub async fn normalize(&self, table: RawTable) -> Result<NormalizedDataset> {
        let mut dataset = Self::build_dataset(table)?;
        let enrichment = self.enrichment.enrich(&mut dataset).await;

        info!(
            rows = dataset.len(),
            enriched = enrichment.selected,
            "Dataset normalized"
        );

        Ok(NormalizedDataset {
            dataset,
            enrichment,
        })
    }

    /// Map export headers onto canonical names; unknown headers pass through
    pub fn rename_columns(headers: &[String]) -> Vec<String> {
        headers
            .iter()
            .map(|header| {
                let cleaned = WHITESPACE_PATTERN.replace_all(header.trim(), " ");
                COLUMN_ALIASES
                    .get(cleaned.as_ref())
                    .map(|canonical| canonical.to_string())
                    .unwrap_or_else(|| cleaned.into_owned())
            })
            .collect()
    }

    pub fn missing_columns(headers: &[String]) -> Vec<&'static str> {
        REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|required| !headers.iter().any(|h| h == required))
            .collect()
    }

    /// Rename, validate and type the table without any network access
    pub fn build_dataset(table: RawTable) -> Result<Dataset> {
        let headers = Self::rename_columns(&table.headers);

        let missing = Self::missing_columns(&headers);
        if !missing.is_empty() {
            return Err(AppError::ValidationError(format!(
                "The uploaded file does not contain the required columns: {}",
                missing.join(", ")
            )));
        }

        let index_of = |name: &str| headers.iter().position(|h| h == name).unwrap_or(0);
        let category_idx = index_of(CATEGORY_TYPE);
        let application_idx = index_of(APPLICATION_TYPE);
        let start_idx = index_of(START_TIME);
        let end_idx = index_of(END_TIME);
        let bytes_idx = index_of(TOTAL_TRAFFIC_B);
        let ip_idx = index_of(SERVER_IP);

        let canonical_indices = [
            category_idx,
            application_idx,
            start_idx,
            end_idx,
            bytes_idx,
            ip_idx,
        ];

        let mut records = Vec::with_capacity(table.rows.len());
        for (row_idx, row) in table.rows.iter().enumerate() {
            let row_no = row_idx + 1;
            // Text cells are kept as-is, so a padded " Other_UDP " is not a placeholder.
            // Numbers and timestamps tolerate surrounding whitespace.
            let text = |idx: usize| row.get(idx).map(String::as_str).unwrap_or("");
            let cell = |idx: usize| text(idx).trim();

            let total_traffic_bytes = parse_bytes(cell(bytes_idx)).map_err(|e| {
                AppError::ParseError(format!("Row {}: {} {}", row_no, TOTAL_TRAFFIC_B, e))
            })?;
            let start_time = parse_timestamp(cell(start_idx)).ok_or_else(|| {
                AppError::ParseError(format!(
                    "Row {}: invalid {} '{}'",
                    row_no,
                    START_TIME,
                    cell(start_idx)
                ))
            })?;
            let end_time = parse_timestamp(cell(end_idx)).ok_or_else(|| {
                AppError::ParseError(format!(
                    "Row {}: invalid {} '{}'",
                    row_no,
                    END_TIME,
                    cell(end_idx)
                ))
            })?;

            let mut record = TrafficRecord::new(
                text(category_idx),
                text(application_idx),
                start_time,
                end_time,
                total_traffic_bytes,
                text(ip_idx),
            );

            record.extra = headers
                .iter()
                .enumerate()
                .filter(|(idx, _)| !canonical_indices.contains(idx))
                .map(|(idx, name)| (name.clone(), row.get(idx).cloned().unwrap_or_default()))
                .collect::<BTreeMap<_, _>>();

            records.push(record);
        }

        let mut columns = headers;
        if !columns.iter().any(|c| c == TOTAL_TRAFFIC_GB) {
            columns.push(TOTAL_TRAFFIC_GB.to_string());
        }

        debug!(rows = records.len(), columns = columns.len(), "Table typed");
        Ok(Dataset::new(columns, records))
    }
}

fn parse_bytes(value: &str) -> std::result::Result<f64, String> {
    let bytes: f64 = value
        .parse()
        .map_err(|_| format!("is not a number: '{}'", value))?;
    if !bytes.is_finite() || bytes < 0.0 {
        return Err(format!("must be a non-negative number: '{}'", value));
    }
    Ok(bytes)
}

/// Parse the timestamp layouts seen in usage exports
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}
