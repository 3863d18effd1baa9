pub mod use_cases;

pub use use_cases::dataset_normalizer::DatasetNormalizer;
pub use use_cases::enrichment::EnrichmentUseCase;
pub use use_cases::traffic_analysis::TrafficAnalysis;
pub use use_cases::upload::UploadUseCase;
