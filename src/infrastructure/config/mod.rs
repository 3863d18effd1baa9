use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use tracing::{debug, warn};

use crate::domain::app_config::AppConfig;
use crate::domain::error::{AppError, Result};

pub const DEFAULT_CONFIG_FILE: &str = "traffic-insight.toml";
pub const DEFAULT_ENV_PREFIX: &str = "TRAFFIC_";
/// Overrides the config file location when set
pub const CONFIG_PATH_VAR: &str = "TRAFFIC_CONFIG";

/// Layers defaults, an optional TOML file and prefixed environment variables.
/// Nested keys use `__` in env names, e.g. `TRAFFIC_GEO_API__TOKEN`.
pub struct ConfigService {
    file: PathBuf,
    env_prefix: String,
}

impl ConfigService {
    pub fn new() -> Self {
        Self {
            file: PathBuf::from(DEFAULT_CONFIG_FILE),
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
        }
    }

    pub fn with_file(mut self, file: impl AsRef<Path>) -> Self {
        self.file = file.as_ref().to_path_buf();
        self
    }

    /// Default service, reading the file named by `TRAFFIC_CONFIG` if set
    pub fn from_env() -> Self {
        match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) if !path.trim().is_empty() => Self::new().with_file(path),
            _ => Self::new(),
        }
    }

    #[cfg(test)]
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn figment(&self) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(&self.file))
            .merge(Env::prefixed(&self.env_prefix).split("__"))
    }

    pub fn load(&self) -> Result<AppConfig> {
        debug!(file = %self.file.display(), prefix = %self.env_prefix, "Loading configuration");

        let config: AppConfig = self
            .figment()
            .extract()
            .map_err(|e| AppError::ConfigError(e.to_string()))?;

        config.validate().map_err(AppError::ConfigError)?;

        if config.geo_api.token.trim().is_empty() {
            warn!("geo_api.token is empty; ISP lookups will likely be rejected");
        }

        Ok(config)
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}
