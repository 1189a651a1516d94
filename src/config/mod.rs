use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

use crate::domain::RadiusPolicy;
use crate::ratelimit::RateLimitConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Where cached venues live
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Sqlite,
    Memory,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}
fn default_database() -> PathBuf {
    PathBuf::from("barhop.db")
}

#[derive(Debug, Deserialize, Clone)]
pub struct FileConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_database")]
    pub database: PathBuf,
    #[serde(default)]
    pub cache_backend: CacheBackend,
    #[serde(default)]
    pub overpass: OverpassConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub radius: RadiusPolicy,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            database: default_database(),
            cache_backend: CacheBackend::default(),
            overpass: OverpassConfig::default(),
            rate_limit: RateLimitConfig::default(),
            radius: RadiusPolicy::default(),
        }
    }
}

fn default_overpass_urls() -> Vec<String> {
    vec!["https://overpass-api.de/api/interpreter".to_string()]
}

fn default_query_timeout_secs() -> u64 {
    15
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

#[derive(Debug, Deserialize, Clone)]
pub struct OverpassConfig {
    /// Endpoints tried in turn, one per attempt
    #[serde(default = "default_overpass_urls")]
    pub urls: Vec<String>,
    /// Server-side `[timeout:N]` hint
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// Optional client-side timeout per request
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Default for OverpassConfig {
    fn default() -> Self {
        Self {
            urls: default_overpass_urls(),
            query_timeout_secs: default_query_timeout_secs(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            request_timeout_secs: None,
        }
    }
}

impl FileConfig {
    /// Load from an explicit path, or search the usual locations.
    ///
    /// Unparsable files found while searching are skipped with a warning;
    /// an explicit path must exist and parse.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            return Self::from_file(path);
        }

        Ok(Self::load_first(&get_config_paths()))
    }

    /// First candidate that exists and parses, else the defaults
    fn load_first(paths: &[PathBuf]) -> Self {
        for path in paths {
            if !path.exists() {
                continue;
            }
            match Self::from_file(path) {
                Ok(config) => return config,
                Err(e) => warn!("Skipping config file: {}", e),
            }
        }

        Self::default()
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.overpass.urls.is_empty() {
            return Err(ConfigError::Invalid(
                "overpass.urls must list at least one endpoint".to_string(),
            ));
        }
        if self.rate_limit.max_requests == 0 {
            return Err(ConfigError::Invalid(
                "rate_limit.max_requests must be at least 1".to_string(),
            ));
        }
        if self.rate_limit.window_ms == 0 {
            return Err(ConfigError::Invalid(
                "rate_limit.window_ms must be positive".to_string(),
            ));
        }

        let radius = &self.radius;
        if radius.min > radius.max || radius.default < radius.min || radius.default > radius.max {
            return Err(ConfigError::Invalid(format!(
                "radius.default ({}) must lie within [{}, {}]",
                radius.default, radius.min, radius.max
            )));
        }

        Ok(())
    }
}

fn get_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    paths.push(PathBuf::from("barhop.toml"));
    paths.push(PathBuf::from(".barhop.toml"));

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("barhop").join("config.toml"));
        paths.push(config_dir.join("barhop.toml"));
    }

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".barhop.toml"));
        paths.push(home.join(".config").join("barhop").join("config.toml"));
    }

    paths
}
