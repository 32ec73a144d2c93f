//! # Peer Sync Configuration
//!
//! Tunables for handshake admission, block ingestion and transaction
//! admission. Loaded from TOML by the node; every field has a default.

use std::net::SocketAddr;

use serde::Deserialize;
use thiserror::Error;

use crate::domain::parse_version;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse peer sync config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("nethash must be 64 hex chars, got {0:?}")]
    InvalidNethash(String),

    #[error("min_peer_version {0:?} is not major.minor.patch")]
    InvalidVersion(String),

    #[error("{0} must be greater than zero")]
    ZeroCapacity(&'static str),
}

/// Peer sync configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PeerSyncConfig {
    /// Network identifier every peer must present.
    pub nethash: String,

    /// Lowest peer protocol version considered compatible.
    pub min_peer_version: String,

    /// This node's public address. Handshakes presenting it are
    /// self-connections.
    pub own_address: Option<SocketAddr>,

    /// Maximum pending transactions per sender, counting the pool and the
    /// batch being admitted.
    pub max_pending_per_sender: usize,

    /// Largest transaction batch accepted from one request.
    pub max_transactions_per_batch: usize,

    /// Admitted transactions paying less than this are pooled but not relayed.
    pub min_relay_fee: u64,

    /// Upper bound on `vendor_data` length in bytes.
    pub max_vendor_data_bytes: usize,

    /// Number of recently handed-off block ids remembered for dedup.
    pub recent_block_cache_size: usize,

    /// Candidate ids considered per common-block request.
    pub max_common_block_ids: usize,

    /// Capacity of the channel-backed ledger handoff queue.
    pub ledger_queue_capacity: usize,
}

impl Default for PeerSyncConfig {
    fn default() -> Self {
        Self {
            nethash: "0".repeat(64),
            min_peer_version: "1.0.0".to_string(),
            own_address: None,
            max_pending_per_sender: 64,
            max_transactions_per_batch: 100,
            min_relay_fee: 1_000,
            max_vendor_data_bytes: 64,
            recent_block_cache_size: 1_024,
            max_common_block_ids: 10,
            ledger_queue_capacity: 256,
        }
    }
}

impl PeerSyncConfig {
    /// Small limits for tests.
    pub fn for_testing() -> Self {
        Self {
            nethash: "ab".repeat(32),
            min_peer_version: "1.0.0".to_string(),
            own_address: Some(SocketAddr::from(([10, 0, 0, 1], 4000))),
            max_pending_per_sender: 3,
            max_transactions_per_batch: 10,
            min_relay_fee: 100,
            max_vendor_data_bytes: 16,
            recent_block_cache_size: 8,
            max_common_block_ids: 5,
            ledger_queue_capacity: 4,
        }
    }

    /// Parse and validate a TOML document. Missing keys take defaults.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the core cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nethash.len() != 64 || !self.nethash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ConfigError::InvalidNethash(self.nethash.clone()));
        }
        if parse_version(&self.min_peer_version).is_none() {
            return Err(ConfigError::InvalidVersion(self.min_peer_version.clone()));
        }
        let capacities = [
            ("max_pending_per_sender", self.max_pending_per_sender),
            ("max_transactions_per_batch", self.max_transactions_per_batch),
            ("recent_block_cache_size", self.recent_block_cache_size),
            ("max_common_block_ids", self.max_common_block_ids),
            ("ledger_queue_capacity", self.ledger_queue_capacity),
        ];
        for (name, value) in capacities {
            if value == 0 {
                return Err(ConfigError::ZeroCapacity(name));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PeerSyncConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_pending_per_sender, 64);
        assert!(config.own_address.is_none());
    }

    #[test]
    fn test_testing_config_is_valid() {
        assert!(PeerSyncConfig::for_testing().validate().is_ok());
    }

    #[test]
    fn test_from_toml_partial() {
        let config = PeerSyncConfig::from_toml_str(
            r#"
            min_relay_fee = 5
            own_address = "192.168.1.7:7000"
            "#,
        )
        .unwrap();
        assert_eq!(config.min_relay_fee, 5);
        assert_eq!(config.own_address, Some("192.168.1.7:7000".parse().unwrap()));
        assert_eq!(config.max_common_block_ids, 10);
    }

    #[test]
    fn test_rejects_bad_nethash() {
        let err = PeerSyncConfig::from_toml_str(r#"nethash = "xyz""#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNethash(_)));
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let err = PeerSyncConfig::from_toml_str("ledger_queue_capacity = 0").unwrap_err();
        assert!(err.to_string().contains("ledger_queue_capacity"));
    }

    #[test]
    fn test_rejects_zero_batch_limit() {
        let err = PeerSyncConfig::from_toml_str("max_transactions_per_batch = 0").unwrap_err();
        assert!(matches!(err, ConfigError::ZeroCapacity("max_transactions_per_batch")));
    }

    #[test]
    fn test_rejects_unparsable_version() {
        let err = PeerSyncConfig::from_toml_str(r#"min_peer_version = "one""#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVersion(_)));
    }
}
