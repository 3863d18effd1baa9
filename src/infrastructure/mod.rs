pub mod config;
pub mod geo_clients;
pub mod ingest;
