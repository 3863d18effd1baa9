use std::sync::Arc;

use crate::application::{DatasetNormalizer, EnrichmentUseCase, UploadUseCase};
use crate::domain::app_config::AppConfig;
use crate::infrastructure::geo_clients::{FindIpClient, IspLookup};

pub struct AppState {
    pub config: AppConfig,
    pub upload_use_case: UploadUseCase,
}

impl AppState {
    /// Wire the use cases around the configured geolocation client
    pub fn new(config: AppConfig) -> Self {
        let lookup: Arc<dyn IspLookup + Send + Sync> = Arc::new(FindIpClient::new(&config.geo_api));
        Self::with_lookup(config, lookup)
    }

    pub fn with_lookup(config: AppConfig, lookup: Arc<dyn IspLookup + Send + Sync>) -> Self {
        let enrichment = Arc::new(EnrichmentUseCase::new(lookup, config.enrichment.clone()));
        let upload_use_case = UploadUseCase::new(DatasetNormalizer::new(enrichment));

        Self {
            config,
            upload_use_case,
        }
    }
}
