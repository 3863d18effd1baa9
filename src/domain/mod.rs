pub mod analysis;
pub mod app_config;
pub mod error;

// Usage export and enrichment types
pub mod traffic;
