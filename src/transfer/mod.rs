//! Coin transfer
//!
//! The transfer form simulates the transfer as the user types and submits it
//! on confirm. Which entry function is used depends on whether the recipient
//! account already exists: `0x1::aptos_account::transfer` creates it,
//! `0x1::coin::transfer` requires it.

mod flow;
mod query_cache;

pub use flow::TransactionFlow;
pub use query_cache::{QueryCache, QueryKey};

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::accounts::{is_valid_address, ActiveAccount};
use crate::client::{ChainClient, EntryFunctionPayload, UserTransaction, APTOS_COIN};
use crate::wallet::{LocalSigner, SimulationResult};
use crate::{Error, Result};

/// Transfer form input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferParams {
    pub recipient: String,
    /// Amount in octas
    pub amount: u64,
    pub does_recipient_exist: bool,
}

impl TransferParams {
    fn validate(&self) -> Result<()> {
        if !is_valid_address(&self.recipient) {
            return Err(Error::InvalidArgument(format!(
                "Invalid recipient address: {}",
                self.recipient
            )));
        }
        if self.amount == 0 {
            return Err(Error::InvalidArgument(
                "Transfer amount must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// `0x1::coin::transfer<AptosCoin>`; the recipient must already exist
pub fn coin_transfer_payload(recipient: &str, amount: u64) -> EntryFunctionPayload {
    EntryFunctionPayload {
        function: "0x1::coin::transfer".to_string(),
        type_arguments: vec![APTOS_COIN.to_string()],
        arguments: vec![json!(recipient), json!(amount.to_string())],
    }
}

/// `0x1::aptos_account::transfer`, which creates the recipient if needed
pub fn account_transfer_payload(recipient: &str, amount: u64) -> EntryFunctionPayload {
    EntryFunctionPayload {
        function: "0x1::aptos_account::transfer".to_string(),
        type_arguments: vec![],
        arguments: vec![json!(recipient), json!(amount.to_string())],
    }
}

/// Pick the payload builder for `params`
pub fn build_transfer_payload(params: &TransferParams) -> Result<EntryFunctionPayload> {
    params.validate()?;
    Ok(if params.does_recipient_exist {
        coin_transfer_payload(&params.recipient, params.amount)
    } else {
        account_transfer_payload(&params.recipient, params.amount)
    })
}

/// Transfer flow plus the cached queries the form reads
#[derive(Clone)]
pub struct CoinTransfer {
    flow: TransactionFlow,
    client: Arc<dyn ChainClient>,
}

impl CoinTransfer {
    pub fn new(flow: TransactionFlow, client: Arc<dyn ChainClient>) -> Self {
        Self { flow, client }
    }

    fn cache(&self) -> &Arc<QueryCache> {
        self.flow.cache()
    }

    /// Native coin balance of `address` (cached)
    pub async fn balance(&self, address: &str) -> Result<u64> {
        let client = self.client.clone();
        let owned = address.to_string();
        self.cache()
            .get_or_fetch(QueryKey::coin_balance(address), move || async move {
                client.coin_balance(&owned, APTOS_COIN).await
            })
            .await
    }

    /// Whether `address` exists on chain (cached)
    pub async fn recipient_exists(&self, address: &str) -> Result<bool> {
        let client = self.client.clone();
        let owned = address.to_string();
        self.cache()
            .get_or_fetch(QueryKey::account_exists(address), move || async move {
                Ok(client.account(&owned).await?.is_some())
            })
            .await
    }

    /// Build params, looking up whether the recipient exists
    pub async fn params(&self, recipient: &str, amount: u64) -> Result<TransferParams> {
        Ok(TransferParams {
            recipient: recipient.to_string(),
            amount,
            does_recipient_exist: self.recipient_exists(recipient).await?,
        })
    }

    pub async fn simulate(
        &self,
        sender: &ActiveAccount,
        params: &TransferParams,
    ) -> Result<SimulationResult> {
        self.flow
            .simulate(sender, || build_transfer_payload(params))
            .await
    }

    /// Submit the transfer; invalidates the sender's cached balance
    pub async fn submit(
        &self,
        signer: &LocalSigner,
        params: &TransferParams,
    ) -> Result<UserTransaction> {
        let mut invalidate = vec![
            QueryKey::coin_balance(signer.address()),
            QueryKey::coin_balance(&params.recipient),
        ];
        if !params.does_recipient_exist {
            invalidate.push(QueryKey::account_exists(&params.recipient));
        }

        self.flow
            .submit(signer, || build_transfer_payload(params), &invalidate)
            .await
    }
}
