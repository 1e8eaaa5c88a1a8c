//! Node endpoint configuration
//!
//! The wallet knows a fixed set of networks. Each default endpoint can be
//! overridden from the environment, and users can add their own networks
//! (persisted in the extension store) which take precedence over defaults
//! with the same name.
//!
//! # Examples
//!
//! ```bash
//! # Point the built-in Testnet entry at a private fullnode
//! export APTOS_TESTNET_NODE_URL="https://my-node.example.com/v1"
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use url::Url;

use crate::storage::{get_string, keys, KeyValueStore};
use crate::{Error, Result};

/// A named node endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub name: String,
    pub node_url: Url,
}

impl Network {
    pub fn new(name: impl Into<String>, node_url: &str) -> Result<Self> {
        let node_url = Url::parse(node_url)
            .map_err(|e| Error::Config(format!("Invalid node URL {}: {}", node_url, e)))?;
        Ok(Self {
            name: name.into(),
            node_url,
        })
    }
}

/// Names of the built-in networks
pub mod names {
    pub const MAINNET: &str = "Mainnet";
    pub const TESTNET: &str = "Testnet";
    pub const DEVNET: &str = "Devnet";
    pub const LOCALHOST: &str = "Localhost";
}

/// Environment variable names
mod env_vars {
    pub const MAINNET_NODE_URL: &str = "APTOS_MAINNET_NODE_URL";
    pub const TESTNET_NODE_URL: &str = "APTOS_TESTNET_NODE_URL";
    pub const DEVNET_NODE_URL: &str = "APTOS_DEVNET_NODE_URL";
    pub const LOCAL_NODE_URL: &str = "APTOS_LOCAL_NODE_URL";
}

/// Public fullnode endpoints
mod default_urls {
    pub const MAINNET: &str = "https://fullnode.mainnet.aptoslabs.com/v1";
    pub const TESTNET: &str = "https://fullnode.testnet.aptoslabs.com/v1";
    pub const DEVNET: &str = "https://fullnode.devnet.aptoslabs.com/v1";
    pub const LOCALHOST: &str = "http://127.0.0.1:8080/v1";
}

/// The table of known networks, keyed by name
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    networks: BTreeMap<String, Network>,
}

impl NetworkConfig {
    /// Build the default table, applying per-network env overrides
    ///
    /// An override that does not parse as a URL is ignored with a warning.
    pub fn from_env() -> Self {
        let entries = [
            (names::MAINNET, env_vars::MAINNET_NODE_URL, default_urls::MAINNET),
            (names::TESTNET, env_vars::TESTNET_NODE_URL, default_urls::TESTNET),
            (names::DEVNET, env_vars::DEVNET_NODE_URL, default_urls::DEVNET),
            (names::LOCALHOST, env_vars::LOCAL_NODE_URL, default_urls::LOCALHOST),
        ];

        let mut networks = BTreeMap::new();
        for (name, var, fallback) in entries {
            let network = match std::env::var(var) {
                Ok(url) => match Network::new(name, &url) {
                    Ok(network) => {
                        tracing::debug!(network = name, "Using {} for node URL", var);
                        network
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Ignoring {}", var);
                        Self::builtin(name, fallback)
                    }
                },
                Err(_) => Self::builtin(name, fallback),
            };
            networks.insert(name.to_string(), network);
        }

        Self { networks }
    }

    fn builtin(name: &str, url: &str) -> Network {
        Network {
            name: name.to_string(),
            node_url: Url::parse(url).expect("built-in node URLs are valid"),
        }
    }

    /// Create with an explicit set of networks
    pub fn with_networks(networks: impl IntoIterator<Item = Network>) -> Self {
        Self {
            networks: networks.into_iter().map(|n| (n.name.clone(), n)).collect(),
        }
    }

    /// Merge user-defined networks over this table
    pub fn merged_with(&self, custom: impl IntoIterator<Item = Network>) -> Self {
        let mut networks = self.networks.clone();
        for network in custom {
            networks.insert(network.name.clone(), network);
        }
        Self { networks }
    }

    pub fn get(&self, name: &str) -> Option<&Network> {
        self.networks.get(name)
    }

    pub fn networks(&self) -> impl Iterator<Item = &Network> {
        self.networks.values()
    }

    /// Resolve the active network
    ///
    /// Falls back to `default_name`, then Devnet, when `active` is missing or
    /// unknown.
    pub fn resolve(&self, active: Option<&str>, default_name: &str) -> Result<Network> {
        if let Some(name) = active {
            if let Some(network) = self.get(name) {
                return Ok(network.clone());
            }
            tracing::warn!(network = name, "Active network is unknown, using default");
        }

        self.get(default_name)
            .or_else(|| self.get(names::DEVNET))
            .cloned()
            .ok_or_else(|| Error::Config(format!("Unknown network: {}", default_name)))
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// User-defined networks saved in the store
pub async fn custom_networks(store: &dyn KeyValueStore) -> Result<Vec<Network>> {
    match store.get(keys::CUSTOM_NETWORKS).await? {
        Some(value) => Ok(serde_json::from_value(value)?),
        None => Ok(Vec::new()),
    }
}

/// Add or replace a user-defined network
pub async fn save_custom_network(store: &dyn KeyValueStore, network: Network) -> Result<()> {
    let mut networks = custom_networks(store).await?;
    networks.retain(|n| n.name != network.name);
    networks.push(network);
    store
        .set(keys::CUSTOM_NETWORKS, serde_json::to_value(&networks)?)
        .await
}

/// Defaults merged with the user's networks
pub async fn known_networks(store: &dyn KeyValueStore, base: &NetworkConfig) -> Result<NetworkConfig> {
    Ok(base.merged_with(custom_networks(store).await?))
}

/// The network the wallet is currently pointed at
pub async fn active_network(
    store: &dyn KeyValueStore,
    base: &NetworkConfig,
    default_name: &str,
) -> Result<Network> {
    let active = get_string(store, keys::ACTIVE_NETWORK_NAME).await?;
    known_networks(store, base)
        .await?
        .resolve(active.as_deref(), default_name)
}

/// Switch the active network; the name must be known
pub async fn set_active_network(
    store: &dyn KeyValueStore,
    base: &NetworkConfig,
    name: &str,
) -> Result<Network> {
    let networks = known_networks(store, base).await?;
    let network = networks
        .get(name)
        .cloned()
        .ok_or_else(|| Error::InvalidArgument(format!("Unknown network: {}", name)))?;
    store
        .set(keys::ACTIVE_NETWORK_NAME, Value::String(name.to_string()))
        .await?;
    tracing::info!(network = name, url = %network.node_url, "Switched active network");
    Ok(network)
}
