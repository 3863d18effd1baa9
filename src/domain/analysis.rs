//! Filter and chart types served to the dashboard
//! Everything here is a read-only projection of an enriched dataset

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use validator::{Validate, ValidationError};

/// Application selector value meaning "no application filter"
pub const ALL_APPLICATIONS: &str = "All";

/// Values the filter form can offer for the current dataset
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilterOptions {
    pub categories: Vec<String>,
    /// `"All"` followed by every application type in first-seen order
    pub application_types: Vec<String>,
    pub min_date: Option<NaiveDate>,
    pub max_date: Option<NaiveDate>,
}

fn default_application() -> String {
    ALL_APPLICATIONS.to_string()
}

/// Submitted analysis form
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_date_range"))]
pub struct AnalysisFilter {
    #[serde(default)]
    pub categories: Vec<String>,

    /// Use every category regardless of `categories`
    #[serde(default)]
    pub select_all: bool,

    pub start_date: NaiveDate,
    pub end_date: NaiveDate,

    #[serde(default = "default_application")]
    #[validate(length(min = 1))]
    pub application: String,

    /// When set, failed lookups are grouped under this label instead of
    /// their `Error: ...` text
    #[serde(default)]
    #[validate(length(min = 1, max = 64))]
    pub failure_label: Option<String>,
}

fn validate_date_range(filter: &AnalysisFilter) -> Result<(), ValidationError> {
    if filter.start_date > filter.end_date {
        return Err(ValidationError::new("date_range").with_message(Cow::Borrowed(
            "Start date must be before or equal to the end date.",
        )));
    }
    Ok(())
}

impl AnalysisFilter {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            categories: Vec::new(),
            select_all: true,
            start_date,
            end_date,
            application: default_application(),
            failure_label: None,
        }
    }

    pub fn is_all_applications(&self) -> bool {
        self.application == ALL_APPLICATIONS
    }
}

/// Summed traffic for one chart bar
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrafficTotal {
    pub label: String,
    pub total_traffic_gb: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeSeriesPoint {
    pub start_time: NaiveDateTime,
    pub total_traffic_gb: f64,
}

/// Chart data for one submitted filter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisReport {
    pub row_count: usize,
    pub empty: bool,
    /// Usage per category, largest first
    pub category_traffic: Vec<TrafficTotal>,
    /// Usage per application type, largest first
    pub application_traffic: Vec<TrafficTotal>,
    /// Only present when a single application is selected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_series: Option<Vec<TimeSeriesPoint>>,
}
