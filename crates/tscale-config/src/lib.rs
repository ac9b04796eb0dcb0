use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Environment variable naming the TOML file
pub const CONFIG_ENV: &str = "TSCALE_CONFIG";

/// Overrides `[database] url`
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HttpConfig {
    pub bind: Option<String>,
    pub upload_limit_bytes: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IngestConfig {
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub http: Option<HttpConfig>,
    pub database: Option<DatabaseConfig>,
    pub ingest: Option<IngestConfig>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppConfig {
    /// Load from the `TSCALE_CONFIG` path (default `config.toml`) if it
    /// exists, then apply `DATABASE_URL`
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| "config.toml".to_string());
        let mut cfg = Self::load_from(&path)?;
        if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
            cfg.set_database_url(url);
        }
        Ok(cfg)
    }

    /// Load a specific file; a missing file yields the defaults
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(AppConfig::default());
        }
        let s = fs::read_to_string(path)?;
        Ok(toml::from_str::<AppConfig>(&s)?)
    }

    pub fn set_database_url(&mut self, url: impl Into<String>) {
        self.database.get_or_insert_with(Default::default).url = Some(url.into());
    }

    /// Get HTTP bind address (default 0.0.0.0:8080)
    pub fn http_bind(&self) -> String {
        self.http
            .as_ref()
            .and_then(|h| h.bind.clone())
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
    }

    /// Largest accepted request body (default 16 MiB)
    pub fn upload_limit_bytes(&self) -> usize {
        self.http
            .as_ref()
            .and_then(|h| h.upload_limit_bytes)
            .unwrap_or(16 * 1024 * 1024)
    }

    /// Database URL, if one is configured and not blank
    pub fn database_url(&self) -> Option<String> {
        self.database
            .as_ref()
            .and_then(|d| d.url.clone())
            .filter(|url| !url.trim().is_empty())
    }

    pub fn max_connections(&self) -> u32 {
        self.database
            .as_ref()
            .and_then(|d| d.max_connections)
            .unwrap_or(10)
    }

    pub fn acquire_timeout_secs(&self) -> u64 {
        self.database
            .as_ref()
            .and_then(|d| d.acquire_timeout_secs)
            .unwrap_or(30)
    }

    /// Upper bound on one upload's processing time (default 60s)
    pub fn ingest_timeout_secs(&self) -> u64 {
        self.ingest
            .as_ref()
            .and_then(|i| i.timeout_secs)
            .unwrap_or(60)
    }
}
