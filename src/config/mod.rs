//! Configuration for the wallet bridge

pub mod network;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{Error, Result};

// Re-export network config
pub use network::{Network, NetworkConfig};

/// Environment variable holding the hex-encoded private key
pub const PRIVATE_KEY_ENV: &str = "PRIVATE_KEY";

/// Defaults applied when generating a transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionDefaults {
    /// Maximum gas units the transaction may consume
    pub max_gas_amount: u64,
    /// Seconds from now until the transaction expires
    pub expiration_secs: u64,
    /// Fixed gas unit price (None = use the node's estimate)
    #[serde(default)]
    pub gas_unit_price: Option<u64>,
}

impl Default for TransactionDefaults {
    fn default() -> Self {
        Self {
            max_gas_amount: 200_000,
            expiration_secs: 20,
            gas_unit_price: None,
        }
    }
}

/// Polling behaviour while waiting for a submitted transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitConfig {
    pub timeout_secs: u64,
    pub poll_interval_ms: u64,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 20,
            poll_interval_ms: 500,
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Persistent store file (None = in-memory store)
    #[serde(default)]
    pub storage_path: Option<PathBuf>,
    /// Path to audit log file (null disables auditing)
    #[serde(default = "default_audit_log_path")]
    pub audit_log_path: Option<String>,
    /// Network used when no active network is stored
    pub default_network: String,
    /// Transaction generation defaults
    #[serde(default)]
    pub transaction: TransactionDefaults,
    /// Confirmation polling
    #[serde(default)]
    pub wait: WaitConfig,
    /// How long a cached balance stays fresh (seconds)
    #[serde(default = "default_balance_stale_secs")]
    pub balance_stale_secs: u64,
}

fn default_balance_stale_secs() -> u64 {
    10
}

fn default_audit_log_path() -> Option<String> {
    Some("audit.jsonl".to_string())
}

impl Config {
    /// Load config from a JSON file
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&content).map_err(|e| Error::Config(e.to_string()))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_path: None,
            audit_log_path: default_audit_log_path(),
            default_network: network::names::DEVNET.to_string(),
            transaction: TransactionDefaults::default(),
            wait: WaitConfig::default(),
            balance_stale_secs: default_balance_stale_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_deserialize_defaults() {
        let value = serde_json::json!({
            "default_network": "Testnet"
        });
        let parsed: Config = serde_json::from_value(value).expect("parse config");
        assert_eq!(parsed.default_network, "Testnet");
        assert!(parsed.storage_path.is_none());
        assert_eq!(parsed.transaction.max_gas_amount, 200_000);
        assert_eq!(parsed.transaction.expiration_secs, 20);
        assert_eq!(parsed.balance_stale_secs, 10);
        assert_eq!(parsed.audit_log_path, Config::default().audit_log_path);
    }

    #[test]
    fn config_null_audit_path_disables_audit() {
        let value = serde_json::json!({
            "default_network": "Devnet",
            "audit_log_path": null
        });
        let parsed: Config = serde_json::from_value(value).expect("parse config");
        assert!(parsed.audit_log_path.is_none());
    }

    #[test]
    fn config_deserialize_explicit() {
        let value = serde_json::json!({
            "storage_path": "/tmp/wallet.json",
            "audit_log_path": "audit.jsonl",
            "default_network": "Mainnet",
            "transaction": {
                "max_gas_amount": 5000,
                "expiration_secs": 60,
                "gas_unit_price": 150
            },
            "wait": { "timeout_secs": 5, "poll_interval_ms": 100 },
            "balance_stale_secs": 0
        });
        let parsed: Config = serde_json::from_value(value).expect("parse config");
        assert_eq!(parsed.storage_path, Some(PathBuf::from("/tmp/wallet.json")));
        assert_eq!(parsed.transaction.gas_unit_price, Some(150));
        assert_eq!(parsed.wait.poll_interval_ms, 100);
        assert_eq!(parsed.balance_stale_secs, 0);
    }

    #[tokio::test]
    async fn config_load_reports_missing_file() {
        let err = Config::load(Path::new("/definitely/not/here.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
