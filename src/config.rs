//! Watcher tuning

use std::path::Path;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::utils::{CcaError, Result};

/// Seconds between scalar refetches
pub const DEFAULT_SCALAR_REFRESH: u64 = 12;

/// Settings for syncing and following one auction.
///
/// Intervals are in seconds so the struct reads naturally from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WatchConfig {
    /// First block of the historical fetch; `None` starts at the auction's start block
    pub from_block: Option<u64>,
    /// Initial block span of one `eth_getLogs` query
    pub log_chunk_size: u64,
    /// Span below which a failing query is not split further
    pub min_chunk_size: u64,
    pub scalar_refresh: u64,
    pub block_poll: u64,
    /// Poll interval of the live feed when no WebSocket is configured
    pub live_poll: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            from_block: None,
            log_chunk_size: 10_000,
            min_chunk_size: 1_000,
            scalar_refresh: DEFAULT_SCALAR_REFRESH,
            block_poll: 4,
            live_poll: 4,
        }
    }
}

impl WatchConfig {
    /// Read from a JSON file; missing keys keep their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_chunk_size == 0 {
            return Err(CcaError::invalid("minChunkSize", "must be at least 1 block"));
        }
        if self.log_chunk_size < self.min_chunk_size {
            return Err(CcaError::invalid("logChunkSize", "must not be below minChunkSize"));
        }
        if self.scalar_refresh == 0 || self.block_poll == 0 || self.live_poll == 0 {
            return Err(CcaError::invalid("intervals", "must be at least 1 second"));
        }
        Ok(())
    }

    pub fn scalar_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.scalar_refresh)
    }

    pub fn block_poll_interval(&self) -> Duration {
        Duration::from_secs(self.block_poll)
    }

    pub fn live_poll_interval(&self) -> Duration {
        Duration::from_secs(self.live_poll)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: WatchConfig = serde_json::from_str(r#"{"fromBlock": 500, "logChunkSize": 2000}"#).unwrap();
        assert_eq!(config.from_block, Some(500));
        assert_eq!(config.log_chunk_size, 2_000);
        assert_eq!(config.min_chunk_size, 1_000);
        assert_eq!(config.scalar_refresh_interval(), Duration::from_secs(12));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_inverted_chunk_sizes() {
        let config = WatchConfig { log_chunk_size: 10, ..Default::default() };
        assert!(config.validate().is_err());
    }
}
