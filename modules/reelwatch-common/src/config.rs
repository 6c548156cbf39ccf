use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ReelwatchError;

/// Engine tunables. Loaded from an optional TOML file; every key has a default.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct EngineConfig {
    /// Seconds to sleep between discovery passes.
    pub poll_interval_secs: u64,
    /// Number of most recent items eligible for a stats refresh.
    pub refresh_window: usize,
    /// Items fetched concurrently per refresh batch.
    pub refresh_batch_size: usize,
    /// Maximum simultaneously in-flight external calls.
    pub fetch_concurrency: usize,
    /// Items requested per account per pass (single page).
    pub page_size: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 60,
            refresh_window: 480,
            refresh_batch_size: 20,
            fetch_concurrency: 10,
            page_size: 30,
        }
    }
}

impl EngineConfig {
    /// Load and validate a TOML tunables file.
    pub fn load(path: &Path) -> Result<Self, ReelwatchError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ReelwatchError::Config(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        Self::parse(&content)
            .map_err(|e| ReelwatchError::Config(format!("{} ({})", e, path.display())))
    }

    /// Parse and validate TOML tunables.
    pub fn parse(content: &str) -> Result<Self, ReelwatchError> {
        let config: EngineConfig = toml::from_str(content)
            .map_err(|e| ReelwatchError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReelwatchError> {
        let zero = [
            ("poll_interval_secs", self.poll_interval_secs == 0),
            ("refresh_window", self.refresh_window == 0),
            ("refresh_batch_size", self.refresh_batch_size == 0),
            ("fetch_concurrency", self.fetch_concurrency == 0),
            ("page_size", self.page_size == 0),
        ];
        match zero.iter().find(|(_, is_zero)| *is_zero) {
            Some((key, _)) => Err(ReelwatchError::Config(format!("{key} must be greater than zero"))),
            None => Ok(()),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Application configuration: secrets and paths from the environment,
/// tunables from [`EngineConfig`].
#[derive(Debug, Clone)]
pub struct Config {
    // Scraper API
    pub rapidapi_key: String,
    pub posts_host: String,
    pub stats_host: String,

    // Storage
    pub item_store_path: PathBuf,
    pub accounts_path: PathBuf,
    pub thumbnails_dir: PathBuf,

    pub engine: EngineConfig,
}

impl Config {
    /// Load configuration from environment variables.
    /// `RAPIDAPI_KEY` is only required when `needs_api` is set.
    pub fn from_env(engine: EngineConfig, needs_api: bool) -> Result<Self, ReelwatchError> {
        let rapidapi_key = match env::var("RAPIDAPI_KEY") {
            Ok(key) if !key.trim().is_empty() => key,
            _ if needs_api => {
                return Err(ReelwatchError::Config(
                    "RAPIDAPI_KEY environment variable is required".to_string(),
                ))
            }
            _ => String::new(),
        };

        Ok(Self {
            rapidapi_key,
            posts_host: env_or("TIKTOK_POSTS_HOST", "tiktok-scraper7.p.rapidapi.com"),
            stats_host: env_or("TIKTOK_STATS_HOST", "tiktok-scraper2.p.rapidapi.com"),
            item_store_path: env_or("ITEM_STORE_PATH", "public/videoData.json").into(),
            accounts_path: env_or("ACCOUNTS_PATH", "data/UserIDs.json").into(),
            thumbnails_dir: env_or("THUMBNAILS_DIR", "public/thumbnails").into(),
            engine,
        })
    }

    /// Log the effective configuration with the API key redacted.
    pub fn log_redacted(&self) {
        let key_state = if self.rapidapi_key.is_empty() {
            "<unset>"
        } else {
            "<redacted>"
        };
        tracing::info!(
            rapidapi_key = key_state,
            posts_host = %self.posts_host,
            stats_host = %self.stats_host,
            item_store = %self.item_store_path.display(),
            accounts = %self.accounts_path.display(),
            thumbnails = %self.thumbnails_dir.display(),
            poll_interval_secs = self.engine.poll_interval_secs,
            refresh_window = self.engine.refresh_window,
            refresh_batch_size = self.engine.refresh_batch_size,
            fetch_concurrency = self.engine.fetch_concurrency,
            page_size = self.engine.page_size,
            "Configuration loaded"
        );
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}
