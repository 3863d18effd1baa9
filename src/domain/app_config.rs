use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
        }
    }
}

/// Geolocation service used for ISP lookups
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct GeoApiConfig {
    pub base_url: String,
    pub token: String,
}

impl Default for GeoApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.findip.net".to_string(),
            token: String::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Upper bound on lookups in flight at once
    pub max_concurrent_lookups: usize,

    /// Per-lookup deadline; `None` waits for the transport indefinitely
    pub lookup_timeout_secs: Option<u64>,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            max_concurrent_lookups: 16,
            lookup_timeout_secs: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub geo_api: GeoApiConfig,
    pub enrichment: EnrichmentConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be > 0".to_string());
        }
        if self.enrichment.max_concurrent_lookups == 0 {
            return Err("enrichment.max_concurrent_lookups must be >= 1".to_string());
        }
        if self.enrichment.max_concurrent_lookups > Semaphore::MAX_PERMITS {
            return Err(format!(
                "enrichment.max_concurrent_lookups must be <= {}",
                Semaphore::MAX_PERMITS
            ));
        }
        if self.enrichment.lookup_timeout_secs == Some(0) {
            return Err("enrichment.lookup_timeout_secs must be > 0 when set".to_string());
        }
        url::Url::parse(&self.geo_api.base_url)
            .map_err(|e| format!("geo_api.base_url is not a valid URL: {}", e))?;
        Ok(())
    }
}
