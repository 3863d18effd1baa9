//! Read-only projections behind the dashboard charts

use std::collections::HashMap;

use chrono::NaiveTime;
use tracing::debug;
use validator::Validate;

use crate::domain::analysis::{
    AnalysisFilter, AnalysisReport, FilterOptions, TimeSeriesPoint, TrafficTotal,
    ALL_APPLICATIONS,
};
use crate::domain::error::Result;
use crate::domain::traffic::{Dataset, TrafficRecord};

pub struct TrafficAnalysis;

impl TrafficAnalysis {
    /// Application label used for grouping. Failed lookups can be folded
    /// under `failure_label`; otherwise the stored label is used as-is.
    fn application_label<'a>(record: &'a TrafficRecord, failure_label: Option<&'a str>) -> &'a str {
        match (failure_label, &record.resolution) {
            (Some(label), Some(resolution)) if resolution.is_failure() => label,
            _ => record.application_type.as_str(),
        }
    }

    pub fn options(dataset: &Dataset, failure_label: Option<&str>) -> FilterOptions {
        let mut categories: Vec<String> = Vec::new();
        let mut application_types = vec![ALL_APPLICATIONS.to_string()];

        for record in &dataset.records {
            if !categories.contains(&record.category_type) {
                categories.push(record.category_type.clone());
            }
            let application = Self::application_label(record, failure_label);
            if !application_types[1..].iter().any(|a| a == application) {
                application_types.push(application.to_string());
            }
        }

        FilterOptions {
            categories,
            application_types,
            min_date: dataset.min_start_time().map(|t| t.date()),
            max_date: dataset.max_start_time().map(|t| t.date()),
        }
    }

    pub fn analyze(dataset: &Dataset, filter: &AnalysisFilter) -> Result<AnalysisReport> {
        filter.validate()?;

        let failure_label = filter.failure_label.as_deref();
        let from = filter.start_date.and_time(NaiveTime::MIN);
        // Compared against midnight of the end date, as the form always has
        let to = filter.end_date.and_time(NaiveTime::MIN);

        let rows: Vec<&TrafficRecord> = dataset
            .records
            .iter()
            .filter(|r| filter.select_all || filter.categories.contains(&r.category_type))
            .filter(|r| r.start_time >= from && r.start_time <= to)
            .filter(|r| {
                filter.is_all_applications()
                    || Self::application_label(r, failure_label) == filter.application
            })
            .collect();

        debug!(
            matched = rows.len(),
            total = dataset.len(),
            application = %filter.application,
            "Traffic filter applied"
        );

        if rows.is_empty() {
            return Ok(AnalysisReport {
                row_count: 0,
                empty: true,
                category_traffic: Vec::new(),
                application_traffic: Vec::new(),
                time_series: None,
            });
        }

        let category_traffic = Self::sum_by(&rows, |r| r.category_type.as_str());
        let application_traffic =
            Self::sum_by(&rows, |r| Self::application_label(r, failure_label));

        let time_series = if filter.is_all_applications() {
            None
        } else {
            let mut points: Vec<TimeSeriesPoint> = rows
                .iter()
                .map(|r| TimeSeriesPoint {
                    start_time: r.start_time,
                    total_traffic_gb: r.total_traffic_gb,
                })
                .collect();
            points.sort_by_key(|p| p.start_time);
            Some(points)
        };

        Ok(AnalysisReport {
            row_count: rows.len(),
            empty: false,
            category_traffic,
            application_traffic,
            time_series,
        })
    }

    /// Sum GB per key, largest first; ties keep first-seen order
    fn sum_by<'a, F>(rows: &[&'a TrafficRecord], key: F) -> Vec<TrafficTotal>
    where
        F: Fn(&'a TrafficRecord) -> &'a str,
    {
        let mut positions: HashMap<&str, usize> = HashMap::new();
        let mut totals: Vec<TrafficTotal> = Vec::new();

        for &record in rows {
            let label = key(record);
            match positions.get(label) {
                Some(&idx) => totals[idx].total_traffic_gb += record.total_traffic_gb,
                None => {
                    positions.insert(label, totals.len());
                    totals.push(TrafficTotal {
                        label: label.to_string(),
                        total_traffic_gb: record.total_traffic_gb,
                    });
                }
            }
        }

        totals.sort_by(|a, b| b.total_traffic_gb.total_cmp(&a.total_traffic_gb));
        totals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::test_support::at;
    use crate::domain::error::AppError;
    use crate::domain::traffic::{ResolutionResult, BYTES_PER_GB};
    use chrono::NaiveDate;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn row(category: &str, application: &str, day: u32, gb: f64) -> TrafficRecord {
        TrafficRecord::new(
            category,
            application,
            at(day, 0),
            at(day, 1),
            gb * BYTES_PER_GB,
            "1.1.1.1",
        )
    }

    fn sample() -> Dataset {
        let mut failed = row("Game", "placeholder", 2, 4.0);
        failed.apply_resolution(ResolutionResult::status(429));
        let mut other_failed = row("Game", "placeholder", 3, 1.0);
        other_failed.apply_resolution(ResolutionResult::transport("connection reset"));
        let mut resolved = row("Game", "placeholder", 3, 2.0);
        resolved.apply_resolution(ResolutionResult::resolved("Acme"));

        Dataset::new(
            Vec::new(),
            vec![
                row("Web", "HTTP", 1, 1.0),
                row("Video", "YouTube", 2, 3.0),
                row("Web", "HTTPS", 3, 2.5),
                failed,
                other_failed,
                resolved,
            ],
        )
    }

    #[test]
    fn test_options() {
        let options = TrafficAnalysis::options(&sample(), None);
        assert_eq!(options.categories, vec!["Web", "Video", "Game"]);
        assert_eq!(
            options.application_types,
            vec![
                "All",
                "HTTP",
                "YouTube",
                "HTTPS",
                "Error: Status code 429",
                "Error: connection reset",
                "Acme"
            ]
        );
        assert_eq!(options.min_date, Some(date(1)));
        assert_eq!(options.max_date, Some(date(3)));
    }

    #[test]
    fn test_options_with_failure_label() {
        let options = TrafficAnalysis::options(&sample(), Some("Unresolved"));
        assert_eq!(
            options.application_types,
            vec!["All", "HTTP", "YouTube", "HTTPS", "Unresolved", "Acme"]
        );
    }

    #[test]
    fn test_analyze_all_sorted_descending() {
        let filter = AnalysisFilter::new(date(1), date(3));
        let report = TrafficAnalysis::analyze(&sample(), &filter).unwrap();

        assert_eq!(report.row_count, 6);
        assert!(!report.empty);
        assert!(report.time_series.is_none());
        assert_eq!(
            report.category_traffic,
            vec![
                TrafficTotal { label: "Game".into(), total_traffic_gb: 7.0 },
                TrafficTotal { label: "Web".into(), total_traffic_gb: 3.5 },
                TrafficTotal { label: "Video".into(), total_traffic_gb: 3.0 },
            ]
        );
        assert_eq!(report.application_traffic[0].label, "Error: Status code 429");
    }

    #[test]
    fn test_end_date_is_compared_at_midnight() {
        // Rows start at 00:00 so day 2 rows are included, day 3 rows are not
        let filter = AnalysisFilter::new(date(1), date(2));
        let report = TrafficAnalysis::analyze(&sample(), &filter).unwrap();
        assert_eq!(report.row_count, 3);

        let mut late = sample();
        late.records[0].start_time = at(2, 6);
        let report = TrafficAnalysis::analyze(&late, &filter).unwrap();
        assert_eq!(report.row_count, 2);
        assert!(report
            .category_traffic
            .iter()
            .all(|t| t.label != "Web"));
    }

    #[test]
    fn test_category_and_application_filter_with_series() {
        let mut filter = AnalysisFilter::new(date(1), date(3));
        filter.select_all = false;
        filter.categories = vec!["Web".to_string()];
        filter.application = "HTTPS".to_string();

        let report = TrafficAnalysis::analyze(&sample(), &filter).unwrap();
        assert_eq!(report.row_count, 1);
        assert_eq!(
            report.time_series,
            Some(vec![TimeSeriesPoint {
                start_time: at(3, 0),
                total_traffic_gb: 2.5
            }])
        );
    }

    #[test]
    fn test_failure_label_groups_failed_lookups() {
        let mut filter = AnalysisFilter::new(date(1), date(3));
        filter.failure_label = Some("Unresolved".to_string());

        let report = TrafficAnalysis::analyze(&sample(), &filter).unwrap();
        assert_eq!(
            report.application_traffic[0],
            TrafficTotal { label: "Unresolved".into(), total_traffic_gb: 5.0 }
        );
        assert!(report
            .application_traffic
            .iter()
            .all(|t| !t.label.starts_with("Error:")));

        filter.application = "Unresolved".to_string();
        let report = TrafficAnalysis::analyze(&sample(), &filter).unwrap();
        assert_eq!(report.row_count, 2);
    }

    #[test]
    fn test_no_categories_selected_is_empty() {
        let mut filter = AnalysisFilter::new(date(1), date(3));
        filter.select_all = false;

        let report = TrafficAnalysis::analyze(&sample(), &filter).unwrap();
        assert!(report.empty);
        assert_eq!(report.row_count, 0);
    }

    #[test]
    fn test_inverted_dates_rejected() {
        let filter = AnalysisFilter::new(date(3), date(1));
        assert!(matches!(
            TrafficAnalysis::analyze(&sample(), &filter),
            Err(AppError::ValidationError(_))
        ));
    }
}
