//! Blockchain client seam
//!
//! Everything that talks to a node goes through `ChainClient`. Transaction
//! encoding, simulation and execution are the node's business; this crate
//! only moves payloads and signatures around.

mod rest;
mod types;

pub use rest::RestClient;
pub use types::{
    u64_string, AccountData, Ed25519Signature, EntryFunctionPayload, GasEstimate, LedgerInfo,
    PendingTransaction, RawTransaction, SignedTransaction, TransactionStatus, UserTransaction,
};

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::Network;
use crate::Result;

/// Coin type of the native gas token
pub const APTOS_COIN: &str = "0x1::aptos_coin::AptosCoin";

#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn ledger_info(&self) -> Result<LedgerInfo>;

    /// Look up an account, `None` if it does not exist on chain
    async fn account(&self, address: &str) -> Result<Option<AccountData>>;

    /// Balance of `coin_type` held by `address` (0 when no coin store exists)
    async fn coin_balance(&self, address: &str, coin_type: &str) -> Result<u64>;

    async fn estimate_gas_price(&self) -> Result<GasEstimate>;

    /// Ask the node for the bytes to sign for `raw`
    async fn encode_submission(&self, raw: &RawTransaction) -> Result<Vec<u8>>;

    async fn submit_transaction(&self, signed: &SignedTransaction) -> Result<PendingTransaction>;

    async fn simulate_transaction(&self, signed: &SignedTransaction) -> Result<UserTransaction>;

    async fn transaction_by_hash(&self, hash: &str) -> Result<Option<TransactionStatus>>;
}

/// Produces a client for the active network
pub trait ClientFactory: Send + Sync {
    fn connect(&self, network: &Network) -> Arc<dyn ChainClient>;
}

/// REST clients sharing one HTTP connection pool
#[derive(Debug, Clone, Default)]
pub struct RestClientFactory {
    http: reqwest::Client,
}

impl RestClientFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClientFactory for RestClientFactory {
    fn connect(&self, network: &Network) -> Arc<dyn ChainClient> {
        Arc::new(RestClient::with_client(
            self.http.clone(),
            network.node_url.clone(),
        ))
    }
}
