//! Shared wallet state
//!
//! Everything the dapp API and the CLI need in order to resolve the active
//! account and network and to reach a node.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::accounts::{self, ActiveAccount};
use crate::client::{ChainClient, ClientFactory};
use crate::config::{network, Config, Network, NetworkConfig};
use crate::storage::{KeyValueStore, SessionStore};
use crate::transfer::{CoinTransfer, QueryCache, TransactionFlow};
use crate::wallet::TransactionBuilder;
use crate::Result;

pub struct WalletContext {
    config: Config,
    store: Arc<dyn KeyValueStore>,
    session: SessionStore,
    networks: NetworkConfig,
    clients: Arc<dyn ClientFactory>,
    /// One query cache per network name
    caches: Mutex<HashMap<String, Arc<QueryCache>>>,
}

impl WalletContext {
    pub fn new(
        config: Config,
        store: Arc<dyn KeyValueStore>,
        session: SessionStore,
        networks: NetworkConfig,
        clients: Arc<dyn ClientFactory>,
    ) -> Self {
        Self {
            config,
            store,
            session,
            networks,
            clients,
            caches: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn networks(&self) -> &NetworkConfig {
        &self.networks
    }

    pub async fn active_account(&self) -> Result<Option<ActiveAccount>> {
        accounts::active_account(self.store.as_ref()).await
    }

    pub async fn active_network(&self) -> Result<Network> {
        network::active_network(
            self.store.as_ref(),
            &self.networks,
            &self.config.default_network,
        )
        .await
    }

    pub async fn client(&self) -> Result<Arc<dyn ChainClient>> {
        let network = self.active_network().await?;
        Ok(self.clients.connect(&network))
    }

    pub async fn transaction_builder(&self) -> Result<TransactionBuilder> {
        Ok(TransactionBuilder::new(
            self.client().await?,
            self.config.transaction.clone(),
            self.config.wait.clone(),
        ))
    }

    async fn cache_for(&self, network: &Network) -> Arc<QueryCache> {
        let stale_after = Duration::from_secs(self.config.balance_stale_secs);
        self.caches
            .lock()
            .await
            .entry(network.name.clone())
            .or_insert_with(|| Arc::new(QueryCache::new(stale_after)))
            .clone()
    }

    /// Transfer flow bound to the active network
    pub async fn coin_transfer(&self) -> Result<CoinTransfer> {
        let network = self.active_network().await?;
        let client = self.clients.connect(&network);
        let builder = TransactionBuilder::new(
            client.clone(),
            self.config.transaction.clone(),
            self.config.wait.clone(),
        );
        let cache = self.cache_for(&network).await;
        Ok(CoinTransfer::new(TransactionFlow::new(builder, cache), client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::network::names;
    use crate::storage::MemoryStore;
    use crate::testing::{FakeChain, FixedClient};

    fn context() -> WalletContext {
        let networks = NetworkConfig::with_networks([
            Network::new(names::DEVNET, "https://fullnode.devnet.aptoslabs.com/v1").unwrap(),
            Network::new(names::TESTNET, "https://fullnode.testnet.aptoslabs.com/v1").unwrap(),
        ]);
        WalletContext::new(
            Config::default(),
            Arc::new(MemoryStore::new()),
            SessionStore::new(),
            networks,
            Arc::new(FixedClient(Arc::new(FakeChain::new()))),
        )
    }

    #[tokio::test]
    async fn caches_are_per_network() {
        let ctx = context();
        let devnet = ctx.active_network().await.unwrap();
        assert_eq!(devnet.name, names::DEVNET);

        let a = ctx.cache_for(&devnet).await;
        let b = ctx.cache_for(&devnet).await;
        assert!(Arc::ptr_eq(&a, &b));

        network::set_active_network(ctx.store().as_ref(), ctx.networks(), names::TESTNET)
            .await
            .unwrap();
        let testnet = ctx.active_network().await.unwrap();
        let c = ctx.cache_for(&testnet).await;
        assert!(!Arc::ptr_eq(&a, &c));
    }
}
