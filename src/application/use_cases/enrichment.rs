//! ISP enrichment for `Other_UDP` traffic
//!
//! Selects the rows still carrying the placeholder label, resolves their
//! server IPs concurrently and writes each result back onto the row it
//! came from. Individual lookup failures stay on their row; the batch
//! itself never fails.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::domain::app_config::EnrichmentConfig;
use crate::domain::traffic::{Dataset, ResolutionResult, ResolutionTask};
use crate::infrastructure::geo_clients::IspLookup;

/// Outcome counts of one enrichment pass
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnrichmentSummary {
    pub selected: usize,
    pub resolved: usize,
    pub unknown: usize,
    pub failed: usize,
}

impl EnrichmentSummary {
    fn record(&mut self, result: &ResolutionResult) {
        match result {
            ResolutionResult::Resolved { .. } => self.resolved += 1,
            ResolutionResult::Unknown => self.unknown += 1,
            ResolutionResult::Failed { .. } => self.failed += 1,
        }
    }
}

pub struct EnrichmentUseCase {
    lookup: Arc<dyn IspLookup + Send + Sync>,
    config: EnrichmentConfig,
}

impl EnrichmentUseCase {
    pub fn new(lookup: Arc<dyn IspLookup + Send + Sync>, config: EnrichmentConfig) -> Self {
        Self { lookup, config }
    }

    /// One task per placeholder row, in row order
    pub fn plan(dataset: &Dataset) -> Vec<ResolutionTask> {
        dataset
            .enrichment_candidates()
            .into_iter()
            .map(|idx| ResolutionTask::new(idx, dataset.records[idx].server_ip.clone()))
            .collect()
    }

    /// Resolve every task; the returned vector is positional with `tasks`.
    pub async fn resolve_all(&self, tasks: &[ResolutionTask]) -> Vec<ResolutionResult> {
        let permits = Semaphore::new(
            self.config
                .max_concurrent_lookups
                .clamp(1, Semaphore::MAX_PERMITS),
        );
        let deadline = self.config.lookup_timeout_secs.map(Duration::from_secs);

        let lookups = tasks.iter().map(|task| {
            let permits = &permits;
            let lookup = &self.lookup;
            async move {
                let _permit = match permits.acquire().await {
                    Ok(permit) => permit,
                    Err(e) => return ResolutionResult::transport(e.to_string()),
                };

                match deadline {
                    Some(limit) => {
                        match tokio::time::timeout(limit, lookup.lookup(&task.ip)).await {
                            Ok(result) => result,
                            Err(_) => {
                                warn!(ip = %task.ip, row = task.row_index, "ISP lookup timed out");
                                ResolutionResult::transport(format!(
                                    "lookup timed out after {}s",
                                    limit.as_secs()
                                ))
                            }
                        }
                    }
                    None => lookup.lookup(&task.ip).await,
                }
            }
        });

        join_all(lookups).await
    }

    /// Replace `Other_UDP` labels in place. Rows are only touched once the
    /// whole batch has resolved.
    pub async fn enrich(&self, dataset: &mut Dataset) -> EnrichmentSummary {
        let tasks = Self::plan(dataset);
        let mut summary = EnrichmentSummary {
            selected: tasks.len(),
            ..Default::default()
        };

        if tasks.is_empty() {
            debug!("No Other_UDP rows, skipping ISP lookups");
            return summary;
        }

        info!(
            lookups = tasks.len(),
            max_concurrent = self.config.max_concurrent_lookups,
            "Resolving ISPs for Other_UDP traffic"
        );

        let results = self.resolve_all(&tasks).await;

        for (task, result) in tasks.iter().zip(results) {
            summary.record(&result);
            dataset.records[task.row_index].apply_resolution(result);
        }

        if summary.failed > 0 {
            warn!(
                failed = summary.failed,
                selected = summary.selected,
                "Some ISP lookups failed"
            );
        }
        info!(
            resolved = summary.resolved,
            unknown = summary.unknown,
            failed = summary.failed,
            "ISP enrichment complete"
        );

        summary
    }
}
