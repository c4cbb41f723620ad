use crate::constants::{
    BACKFILL_WINDOW_SECS, LENDING_SNAPSHOT_FILE, SNAPSHOT_INTERVAL_SECS, TOKEN_CACHE_TTL_SECS, TRADE_SNAPSHOT_FILE,
};
use crate::utils::config_loader::{LoadConfigError, load_from_file};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the trade statistics engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Snapshot file for the spot trade cache
    pub trade_snapshot_path: String,
    /// Snapshot file for the lending trade cache
    pub lending_snapshot_path: String,
    /// Seconds between periodic snapshot flushes
    pub snapshot_interval_secs: u64,
    /// How far back historical backfill reaches on a cold start
    pub backfill_window_secs: i64,
    /// Page size used when paging through the historical record store
    pub backfill_page_size: usize,
    /// Maximum wait per change-feed poll in milliseconds
    pub feed_max_await_ms: u64,
    /// Maximum number of change events delivered per poll
    pub feed_batch_size: usize,
    /// Delay between change-feed resubscription attempts in seconds
    pub reconnect_delay_secs: u64,
    /// Lifetime of a cached token metadata entry in seconds
    pub token_cache_ttl_secs: u64,
    /// Curated wash-trading counterparty pairs (hex addresses)
    #[serde(default)]
    pub wash_pairs: Vec<(String, String)>,
    /// Curated bot addresses excluded from rankings (hex addresses)
    #[serde(default)]
    pub bots: Vec<String>,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            trade_snapshot_path: TRADE_SNAPSHOT_FILE.to_string(),
            lending_snapshot_path: LENDING_SNAPSHOT_FILE.to_string(),
            snapshot_interval_secs: SNAPSHOT_INTERVAL_SECS,
            backfill_window_secs: BACKFILL_WINDOW_SECS,
            backfill_page_size: 1000,
            feed_max_await_ms: 500,
            feed_batch_size: 1000,
            reconnect_delay_secs: 2,
            token_cache_ttl_secs: TOKEN_CACHE_TTL_SECS,
            wash_pairs: Vec::new(),
            bots: Vec::new(),
        }
    }
}

impl StatsConfig {
    /// Load configuration from environment variables. The classifier lists
    /// stay file-based; only scalar knobs can be overridden.
    pub fn from_env() -> eyre::Result<Self> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("TRADE_SNAPSHOT_PATH") {
            config.trade_snapshot_path = path;
        }

        if let Ok(path) = std::env::var("LENDING_SNAPSHOT_PATH") {
            config.lending_snapshot_path = path;
        }

        if let Ok(interval_str) = std::env::var("SNAPSHOT_INTERVAL_SECS") {
            config.snapshot_interval_secs = interval_str.parse()
                .map_err(|e| eyre::eyre!("Invalid SNAPSHOT_INTERVAL_SECS: {}", e))?;
        }

        if let Ok(window_str) = std::env::var("BACKFILL_WINDOW_SECS") {
            config.backfill_window_secs = window_str.parse()
                .map_err(|e| eyre::eyre!("Invalid BACKFILL_WINDOW_SECS: {}", e))?;
        }

        if let Ok(page_str) = std::env::var("BACKFILL_PAGE_SIZE") {
            config.backfill_page_size = page_str.parse()
                .map_err(|e| eyre::eyre!("Invalid BACKFILL_PAGE_SIZE: {}", e))?;
        }

        if let Ok(await_str) = std::env::var("FEED_MAX_AWAIT_MS") {
            config.feed_max_await_ms = await_str.parse()
                .map_err(|e| eyre::eyre!("Invalid FEED_MAX_AWAIT_MS: {}", e))?;
        }

        if let Ok(batch_str) = std::env::var("FEED_BATCH_SIZE") {
            config.feed_batch_size = batch_str.parse()
                .map_err(|e| eyre::eyre!("Invalid FEED_BATCH_SIZE: {}", e))?;
        }

        if let Ok(delay_str) = std::env::var("RECONNECT_DELAY_SECS") {
            config.reconnect_delay_secs = delay_str.parse()
                .map_err(|e| eyre::eyre!("Invalid RECONNECT_DELAY_SECS: {}", e))?;
        }

        if let Ok(ttl_str) = std::env::var("TOKEN_CACHE_TTL_SECS") {
            config.token_cache_ttl_secs = ttl_str.parse()
                .map_err(|e| eyre::eyre!("Invalid TOKEN_CACHE_TTL_SECS: {}", e))?;
        }

        Ok(config)
    }

    /// Load configuration from a TOML file with `${VAR}` expansion.
    pub async fn from_file(file_name: String) -> Result<Self, LoadConfigError> {
        load_from_file(file_name).await
    }

    pub fn snapshot_interval(&self) -> Duration {
        Duration::from_secs(self.snapshot_interval_secs)
    }

    pub fn feed_max_await(&self) -> Duration {
        Duration::from_millis(self.feed_max_await_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    pub fn token_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.token_cache_ttl_secs)
    }
}
