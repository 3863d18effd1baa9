//! Upload handling and the current-dataset cache
//!
//! The processed dataset is memoized by a SHA-256 fingerprint of the
//! uploaded bytes: re-submitting the same file returns the cached result
//! without new lookups, and a successful upload of a different file
//! replaces it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::use_cases::dataset_normalizer::DatasetNormalizer;
use crate::application::use_cases::enrichment::EnrichmentSummary;
use crate::domain::error::{AppError, Result};
use crate::domain::traffic::Dataset;
use crate::infrastructure::ingest::read_upload;

/// A processed upload held for the dashboard
#[derive(Debug, Clone, Serialize)]
pub struct CachedDataset {
    pub id: String,
    pub fingerprint: String,
    pub filename: String,
    pub uploaded_at: DateTime<Utc>,
    pub enrichment: EnrichmentSummary,
    #[serde(skip)]
    pub dataset: Dataset,
}

#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub entry: Arc<CachedDataset>,
    /// True when the bytes matched the cached upload and nothing was recomputed
    pub cached: bool,
}

pub struct UploadUseCase {
    normalizer: DatasetNormalizer,
    current: RwLock<Option<Arc<CachedDataset>>>,
    // Serializes processing so one file is never enriched twice at once
    processing: Mutex<()>,
}

impl UploadUseCase {
    pub fn new(normalizer: DatasetNormalizer) -> Self {
        Self {
            normalizer,
            current: RwLock::new(None),
            processing: Mutex::new(()),
        }
    }

    pub fn fingerprint(bytes: &[u8]) -> String {
        hex::encode(Sha256::digest(bytes))
    }

    pub async fn upload(&self, filename: &str, bytes: &[u8]) -> Result<UploadOutcome> {
        if bytes.is_empty() {
            return Err(AppError::ValidationError("Uploaded file is empty".to_string()));
        }

        let fingerprint = Self::fingerprint(bytes);
        let _guard = self.processing.lock().await;

        if let Some(entry) = self.current().await {
            if entry.fingerprint == fingerprint {
                info!(filename, fingerprint = %fingerprint, "Upload unchanged, using cached dataset");
                return Ok(UploadOutcome {
                    entry,
                    cached: true,
                });
            }
        }

        let table = read_upload(filename, bytes).map_err(|e| {
            warn!(filename, error = %e, "Failed to read upload");
            e
        })?;

        let normalized = self.normalizer.normalize(table).await.map_err(|e| {
            warn!(filename, error = %e, "Failed to process upload");
            e
        })?;

        let entry = Arc::new(CachedDataset {
            id: Uuid::new_v4().to_string(),
            fingerprint,
            filename: filename.to_string(),
            uploaded_at: Utc::now(),
            enrichment: normalized.enrichment,
            dataset: normalized.dataset,
        });

        *self.current.write().await = Some(entry.clone());
        info!(
            filename,
            dataset_id = %entry.id,
            rows = entry.dataset.len(),
            "Upload processed"
        );

        Ok(UploadOutcome {
            entry,
            cached: false,
        })
    }

    pub async fn current(&self) -> Option<Arc<CachedDataset>> {
        self.current.read().await.clone()
    }

    pub async fn require_current(&self) -> Result<Arc<CachedDataset>> {
        self.current()
            .await
            .ok_or_else(|| AppError::NotFound("No dataset uploaded yet".to_string()))
    }

    pub async fn clear(&self) {
        *self.current.write().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::enrichment::EnrichmentUseCase;
    use crate::application::use_cases::test_support::FakeLookup;
    use crate::domain::app_config::EnrichmentConfig;
    use crate::domain::traffic::ResolutionResult;

    const EXPORT: &str = "Category Type,Application Type,Start Time,End Time,Total Traffic(B),Server IP\n\
        Streaming,Other_UDP,2024-03-01 08:00:00,2024-03-01 09:00:00,1073741824,1.2.3.4\n\
        Web,HTTP,2024-03-01 10:00:00,2024-03-01 11:00:00,1024,5.6.7.8\n";

    fn use_case(lookup: Arc<FakeLookup>) -> UploadUseCase {
        let enrichment = EnrichmentUseCase::new(lookup, EnrichmentConfig::default());
        UploadUseCase::new(DatasetNormalizer::new(Arc::new(enrichment)))
    }

    fn lookup() -> Arc<FakeLookup> {
        Arc::new(FakeLookup::new().respond("1.2.3.4", ResolutionResult::resolved("ExampleNet")))
    }

    #[test]
    fn test_fingerprint_is_sha256_hex() {
        assert_eq!(
            UploadUseCase::fingerprint(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_upload_processes_and_caches() {
        let lookup = lookup();
        let uploads = use_case(lookup.clone());

        let first = uploads.upload("usage.csv", EXPORT.as_bytes()).await.unwrap();
        assert!(!first.cached);
        assert_eq!(first.entry.dataset.len(), 2);
        assert_eq!(first.entry.dataset.records[0].application_type, "ExampleNet");
        assert_eq!(first.entry.enrichment.resolved, 1);

        let second = uploads.upload("usage.csv", EXPORT.as_bytes()).await.unwrap();
        assert!(second.cached);
        assert_eq!(second.entry.id, first.entry.id);
        assert_eq!(lookup.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_new_file_replaces_cached_dataset() {
        let lookup = lookup();
        let uploads = use_case(lookup.clone());

        let first = uploads.upload("usage.csv", EXPORT.as_bytes()).await.unwrap();
        let changed = EXPORT.replace("1024,5.6.7.8", "2048,5.6.7.8");
        let second = uploads.upload("usage.csv", changed.as_bytes()).await.unwrap();

        assert!(!second.cached);
        assert_ne!(second.entry.id, first.entry.id);
        assert_eq!(uploads.current().await.unwrap().id, second.entry.id);
        assert_eq!(lookup.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_upload_keeps_previous_dataset() {
        let uploads = use_case(lookup());
        let first = uploads.upload("usage.csv", EXPORT.as_bytes()).await.unwrap();

        let err = uploads
            .upload("broken.csv", b"Server IP,Other\n1.1.1.1,x\n")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
        assert_eq!(uploads.current().await.unwrap().id, first.entry.id);
    }

    #[tokio::test]
    async fn test_require_current_and_clear() {
        let uploads = use_case(lookup());
        assert!(matches!(
            uploads.require_current().await,
            Err(AppError::NotFound(_))
        ));

        uploads.upload("usage.csv", EXPORT.as_bytes()).await.unwrap();
        assert!(uploads.require_current().await.is_ok());

        uploads.clear().await;
        assert!(uploads.current().await.is_none());
    }

    #[tokio::test]
    async fn test_empty_and_unsupported_uploads() {
        let uploads = use_case(lookup());
        assert!(matches!(
            uploads.upload("usage.csv", b"").await,
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            uploads.upload("usage.pdf", EXPORT.as_bytes()).await,
            Err(AppError::ValidationError(_))
        ));
    }
}
