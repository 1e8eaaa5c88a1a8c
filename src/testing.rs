//! Test doubles shared by the unit tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::accounts::{normalize_address, set_active_account};
use crate::api::DappApi;
use crate::client::{
    AccountData, ChainClient, ClientFactory, GasEstimate, LedgerInfo, PendingTransaction, RawTransaction,
    SignedTransaction, TransactionStatus, UserTransaction,
};
use crate::config::network::names;
use crate::config::{Config, Network, NetworkConfig};
use crate::context::WalletContext;
use crate::origin::ActiveTab;
use crate::permissions::{Permissions, StaticPrompter};
use crate::storage::{KeyValueStore, MemoryStore, SessionStore};
use crate::wallet::LocalSigner;
use crate::{Error, Result};
use secrecy::SecretString;

// Test private key (DO NOT use in production!)
pub const TEST_KEY: &str = "0x9bf49a6a0755f953811fce125f2683d50429c3bb49e074147e0089a52eae155f";

/// Hostname of the tab `TestWallet` starts on
pub const TEST_ORIGIN: &str = "dapp.example";

#[derive(Default)]
struct ChainState {
    accounts: HashMap<String, (u64, u64)>,
    simulated: Vec<SignedTransaction>,
    submitted: Vec<SignedTransaction>,
    simulation_failure: Option<String>,
    execution_failure: Option<String>,
    submission_failure: Option<String>,
    never_commit: bool,
}

/// In-memory node
#[derive(Default)]
pub struct FakeChain {
    state: Mutex<ChainState>,
    balance_queries: AtomicUsize,
    account_queries: AtomicUsize,
}

impl FakeChain {
    pub const GAS_ESTIMATE: u64 = 100;
    pub const GAS_USED: u64 = 9;
    pub const CHAIN_ID: u8 = 4;

    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_account(&self, address: &str, sequence_number: u64, balance: u64) {
        self.state
            .lock()
            .await
            .accounts
            .insert(normalize_address(address), (sequence_number, balance));
    }

    pub async fn fail_simulation(&self, vm_status: &str) {
        self.state.lock().await.simulation_failure = Some(vm_status.to_string());
    }

    pub async fn fail_execution(&self, vm_status: &str) {
        self.state.lock().await.execution_failure = Some(vm_status.to_string());
    }

    pub async fn fail_submission(&self, message: &str) {
        self.state.lock().await.submission_failure = Some(message.to_string());
    }

    /// Report every submitted transaction as pending forever
    pub async fn never_commit(&self) {
        self.state.lock().await.never_commit = true;
    }

    pub async fn simulated(&self) -> Vec<SignedTransaction> {
        self.state.lock().await.simulated.clone()
    }

    pub async fn submitted(&self) -> Vec<SignedTransaction> {
        self.state.lock().await.submitted.clone()
    }

    pub fn balance_queries(&self) -> usize {
        self.balance_queries.load(Ordering::SeqCst)
    }

    pub fn account_queries(&self) -> usize {
        self.account_queries.load(Ordering::SeqCst)
    }

    /// Bytes the fake node hands out for signing
    pub fn signing_message(raw: &RawTransaction) -> Vec<u8> {
        let mut message = b"TEST_SIGNING_MESSAGE::".to_vec();
        message.extend(serde_json::to_vec(raw).unwrap_or_default());
        message
    }

    fn hash_of(index: usize) -> String {
        format!("0x{:064x}", index + 1)
    }
}

#[async_trait]
impl ChainClient for FakeChain {
    async fn ledger_info(&self) -> Result<LedgerInfo> {
        Ok(LedgerInfo {
            chain_id: Self::CHAIN_ID,
            ledger_version: 1,
            ledger_timestamp: 0,
        })
    }

    async fn account(&self, address: &str) -> Result<Option<AccountData>> {
        self.account_queries.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().await;
        Ok(state
            .accounts
            .get(&normalize_address(address))
            .map(|(sequence_number, _)| AccountData {
                sequence_number: *sequence_number,
                authentication_key: normalize_address(address),
            }))
    }

    async fn coin_balance(&self, address: &str, _coin_type: &str) -> Result<u64> {
        self.balance_queries.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().await;
        Ok(state
            .accounts
            .get(&normalize_address(address))
            .map(|(_, balance)| *balance)
            .unwrap_or(0))
    }

    async fn estimate_gas_price(&self) -> Result<GasEstimate> {
        Ok(GasEstimate {
            gas_estimate: Self::GAS_ESTIMATE,
            prioritized_gas_estimate: None,
        })
    }

    async fn encode_submission(&self, raw: &RawTransaction) -> Result<Vec<u8>> {
        Ok(Self::signing_message(raw))
    }

    async fn submit_transaction(&self, signed: &SignedTransaction) -> Result<PendingTransaction> {
        let mut state = self.state.lock().await;
        if let Some(message) = &state.submission_failure {
            return Err(Error::Node {
                status: 400,
                message: message.clone(),
            });
        }
        state.submitted.push(signed.clone());
        Ok(PendingTransaction {
            hash: Self::hash_of(state.submitted.len() - 1),
            sender: signed.raw.sender.clone(),
            sequence_number: signed.raw.sequence_number,
        })
    }

    async fn simulate_transaction(&self, signed: &SignedTransaction) -> Result<UserTransaction> {
        let mut state = self.state.lock().await;
        state.simulated.push(signed.clone());
        let (success, vm_status) = match &state.simulation_failure {
            Some(status) => (false, status.clone()),
            None => (true, "Executed successfully".to_string()),
        };
        Ok(UserTransaction {
            hash: "0x0".to_string(),
            version: 0,
            success,
            vm_status,
            gas_used: Self::GAS_USED,
            gas_unit_price: signed.raw.gas_unit_price,
        })
    }

    async fn transaction_by_hash(&self, hash: &str) -> Result<Option<TransactionStatus>> {
        let state = self.state.lock().await;
        let index = (0..state.submitted.len()).find(|i| Self::hash_of(*i) == hash);
        if index.is_some() && state.never_commit {
            return Ok(Some(TransactionStatus::Pending));
        }
        Ok(index.map(|i| {
            let (success, vm_status) = match &state.execution_failure {
                Some(status) => (false, status.clone()),
                None => (true, "Executed successfully".to_string()),
            };
            TransactionStatus::Committed(UserTransaction {
                hash: hash.to_string(),
                version: i as u64 + 100,
                success,
                vm_status,
                gas_used: Self::GAS_USED,
                gas_unit_price: state.submitted[i].raw.gas_unit_price,
            })
        }))
    }
}

/// Hands out the same fake node for every network
pub struct FixedClient(pub Arc<FakeChain>);

impl ClientFactory for FixedClient {
    fn connect(&self, _network: &Network) -> Arc<dyn ChainClient> {
        self.0.clone()
    }
}

/// A dapp API wired to in-memory state and a fake node
pub struct TestWallet {
    pub api: DappApi,
    pub ctx: Arc<WalletContext>,
    pub chain: Arc<FakeChain>,
    pub tab: ActiveTab,
    pub prompter: Arc<StaticPrompter>,
    pub permissions: Permissions,
    pub session: SessionStore,
    pub signer: LocalSigner,
}

impl TestWallet {
    /// With `with_account`, the test key is active, unlocked and funded
    pub async fn new(prompter: StaticPrompter, with_account: bool) -> Self {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let session = SessionStore::new();
        let chain = Arc::new(FakeChain::new());
        let signer = LocalSigner::from_hex(TEST_KEY).unwrap();

        if with_account {
            set_active_account(store.as_ref(), &signer.account())
                .await
                .unwrap();
            session
                .unlock(signer.address(), SecretString::from(TEST_KEY.to_string()))
                .await;
            chain.add_account(signer.address(), 3, 1_000_000).await;
        }

        let networks = NetworkConfig::with_networks([Network::new(
            names::DEVNET,
            "https://fullnode.devnet.aptoslabs.com/v1",
        )
        .unwrap()]);
        let ctx = Arc::new(WalletContext::new(
            Config::default(),
            store.clone(),
            session.clone(),
            networks,
            Arc::new(FixedClient(chain.clone())),
        ));

        let tab = ActiveTab::new();
        tab.set_url(Some(format!("https://{}/swap?x=1", TEST_ORIGIN)))
            .await;

        let prompter = Arc::new(prompter);
        let permissions = Permissions::new(store, prompter.clone());
        let api = DappApi::new(ctx.clone(), Arc::new(tab.clone()), permissions.clone());

        Self {
            api,
            ctx,
            chain,
            tab,
            prompter,
            permissions,
            session,
            signer,
        }
    }

    /// Account set up and `TEST_ORIGIN` already connected
    pub async fn connected(prompter: StaticPrompter) -> Self {
        let wallet = Self::new(prompter, true).await;
        wallet
            .permissions
            .add_domain(TEST_ORIGIN, wallet.signer.address())
            .await
            .unwrap();
        wallet
    }
}
