//! Layered configuration (§10.3), following the teacher's `backend/lib::config` pattern: a
//! `Config` deriving `serde::Deserialize`/`Serialize`, a test/dev-friendly `Config::default()`,
//! and `Config::from_file` reading TOML. The binary crate (`command.rs`) layers CLI overrides
//! on top of whichever of these two the operator picked.

use std::fs;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Which subset of the event taxonomy the Indexer applies, per the `indexer_mode` key (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexerModeConfig {
    Full,
    Fishing,
}

/// Structured vs human-readable log output, per the `log_format` key (§6/§10.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Chain RPC endpoint (`rpc_url`).
    pub rpc_url: String,
    /// Event store endpoint (`db_url`).
    pub db_url: String,
    /// `full` or `fishing` (`indexer_mode`).
    pub indexer_mode: IndexerModeConfig,
    /// If true, this process only runs the Indexer; a separate process runs the scheduler
    /// against the same store (§4.1 Standalone mode).
    pub standalone_indexer: bool,
    /// Fisherman tick period, in seconds (`batch_interval`).
    pub batch_interval_secs: u64,
    /// Widened tick period after consecutive no-work ticks (`idle_poll_interval`).
    pub idle_poll_interval_secs: u64,
    /// Max file keys considered per target per tick (`batch_deletion_limit`).
    pub batch_deletion_limit: i64,
    /// Gap, in blocks, past which the Indexer enters paginated sync mode
    /// (`sync_mode_min_blocks_behind`).
    pub sync_mode_min_blocks_behind: u64,
    /// Page size within sync mode (`incomplete_sync_page_size`).
    pub incomplete_sync_page_size: u64,
    /// Max blocks processed per finality notification while in sync mode
    /// (`incomplete_sync_max`).
    pub incomplete_sync_max: u64,
    /// Hex-encoded 32-byte ECDSA secret the scheduler signs `deleteFiles` extrinsics with.
    pub signing_key: String,
    /// `RUST_LOG`-style directive string (`log_level`).
    pub log_level: String,
    /// `pretty` or `json` (`log_format`).
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: "ws://localhost:9944".to_string(),
            db_url: "postgres://localhost:5432/fisherman".to_string(),
            indexer_mode: IndexerModeConfig::Full,
            standalone_indexer: false,
            batch_interval_secs: 5,
            idle_poll_interval_secs: 30,
            batch_deletion_limit: 100,
            sync_mode_min_blocks_behind: 100,
            incomplete_sync_page_size: 50,
            incomplete_sync_max: 1000,
            signing_key: "00".repeat(32),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    /// Decodes [`Config::signing_key`] into the 32-byte secret the scheduler signs with.
    pub fn signing_key_bytes(&self) -> Result<[u8; 32], ConfigError> {
        let bytes = hex::decode(self.signing_key.trim_start_matches("0x"))
            .map_err(|_| ConfigError::BadSigningKey(self.signing_key.clone()))?;
        bytes
            .try_into()
            .map_err(|_| ConfigError::BadSigningKey(self.signing_key.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_dev_friendly_endpoints() {
        let config = Config::default();
        assert_eq!(config.rpc_url, "ws://localhost:9944");
        assert!(config.db_url.starts_with("postgres://"));
        assert_eq!(config.batch_interval_secs, 5);
    }

    #[test]
    fn round_trips_through_toml() {
        let config = Config::default();
        let serialized = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.rpc_url, config.rpc_url);
        assert_eq!(parsed.indexer_mode, config.indexer_mode);
    }

    #[test]
    fn signing_key_bytes_rejects_non_hex() {
        let mut config = Config::default();
        config.signing_key = "not hex".to_string();
        assert!(config.signing_key_bytes().is_err());
    }

    #[test]
    fn signing_key_bytes_decodes_the_default() {
        let config = Config::default();
        assert_eq!(config.signing_key_bytes().unwrap(), [0u8; 32]);
    }
}
