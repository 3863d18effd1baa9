// ============================================================
// TRAFFIC RECORD TYPES
// ============================================================
// Rows of an uploaded usage export, before and after normalization

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::ResolutionResult;

/// Application type marking rows whose traffic needs an ISP lookup
pub const OTHER_UDP: &str = "Other_UDP";

pub const CATEGORY_TYPE: &str = "Category_Type";
pub const APPLICATION_TYPE: &str = "Application_Type";
pub const START_TIME: &str = "Start_Time";
pub const END_TIME: &str = "End_Time";
pub const TOTAL_TRAFFIC_B: &str = "Total_Traffic_B";
pub const TOTAL_TRAFFIC_GB: &str = "Total_Traffic_GB";
pub const SERVER_IP: &str = "Server_IP";

pub const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Header row plus string cells, as read from CSV or Excel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// One normalized row of the usage export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficRecord {
    pub category_type: String,
    pub application_type: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub total_traffic_bytes: f64,
    pub total_traffic_gb: f64,
    pub server_ip: String,

    /// Lookup outcome that produced `application_type`, if the row was enriched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<ResolutionResult>,

    /// Columns outside the canonical set, kept verbatim
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl TrafficRecord {
    pub fn new(
        category_type: impl Into<String>,
        application_type: impl Into<String>,
        start_time: NaiveDateTime,
        end_time: NaiveDateTime,
        total_traffic_bytes: f64,
        server_ip: impl Into<String>,
    ) -> Self {
        Self {
            category_type: category_type.into(),
            application_type: application_type.into(),
            start_time,
            end_time,
            total_traffic_bytes,
            total_traffic_gb: total_traffic_bytes / BYTES_PER_GB,
            server_ip: server_ip.into(),
            resolution: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn needs_enrichment(&self) -> bool {
        self.application_type == OTHER_UDP
    }

    /// Overwrite the application type with a lookup outcome
    pub fn apply_resolution(&mut self, result: ResolutionResult) {
        self.application_type = result.label();
        self.resolution = Some(result);
    }
}

/// Ordered records of one uploaded file, indexed by original row position
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Column order of the normalized table, derived GB column included
    pub columns: Vec<String>,
    pub records: Vec<TrafficRecord>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, records: Vec<TrafficRecord>) -> Self {
        Self { columns, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Indices of records still carrying the `Other_UDP` placeholder
    pub fn enrichment_candidates(&self) -> Vec<usize> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.needs_enrichment())
            .map(|(idx, _)| idx)
            .collect()
    }

    pub fn min_start_time(&self) -> Option<NaiveDateTime> {
        self.records.iter().map(|r| r.start_time).min()
    }

    pub fn max_start_time(&self) -> Option<NaiveDateTime> {
        self.records.iter().map(|r| r.start_time).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_gb_is_derived_from_bytes() {
        let record = TrafficRecord::new("Web", "HTTP", at(1, 0), at(1, 1), BYTES_PER_GB * 2.0, "1.1.1.1");
        assert_eq!(record.total_traffic_gb, 2.0);
    }

    #[test]
    fn test_enrichment_candidates_keep_row_order() {
        let dataset = Dataset::new(
            Vec::new(),
            vec![
                TrafficRecord::new("Web", OTHER_UDP, at(1, 0), at(1, 1), 1.0, "1.1.1.1"),
                TrafficRecord::new("Web", "HTTP", at(1, 0), at(1, 1), 1.0, "2.2.2.2"),
                TrafficRecord::new("Game", OTHER_UDP, at(1, 0), at(1, 1), 1.0, "3.3.3.3"),
            ],
        );
        assert_eq!(dataset.enrichment_candidates(), vec![0, 2]);
    }

    #[test]
    fn test_apply_resolution_sets_label_and_tag() {
        let mut record = TrafficRecord::new("Web", OTHER_UDP, at(1, 0), at(1, 1), 1.0, "1.1.1.1");
        record.apply_resolution(ResolutionResult::status(404));
        assert_eq!(record.application_type, "Error: Status code 404");
        assert_eq!(record.resolution, Some(ResolutionResult::status(404)));
        assert!(!record.needs_enrichment());
    }

    #[test]
    fn test_start_time_bounds() {
        let dataset = Dataset::new(
            Vec::new(),
            vec![
                TrafficRecord::new("Web", "HTTP", at(5, 0), at(5, 1), 1.0, "1.1.1.1"),
                TrafficRecord::new("Web", "HTTP", at(2, 3), at(2, 4), 1.0, "1.1.1.1"),
            ],
        );
        assert_eq!(dataset.min_start_time(), Some(at(2, 3)));
        assert_eq!(dataset.max_start_time(), Some(at(5, 0)));
        assert_eq!(Dataset::default().min_start_time(), None);
    }
}
