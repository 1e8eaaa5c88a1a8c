//! Transaction generation, signing and submission
//!
//! Follows the wallet's usual sequence: fetch the sender's sequence number,
//! pick a gas price, build the raw transaction, have the node encode the
//! signing message, sign it locally, submit.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use crate::client::{
    ChainClient, Ed25519Signature, EntryFunctionPayload, PendingTransaction, RawTransaction,
    SignedTransaction, TransactionStatus, UserTransaction,
};
use crate::config::{TransactionDefaults, WaitConfig};
use crate::wallet::LocalSigner;
use crate::{Error, Result};

#[derive(Clone)]
pub struct TransactionBuilder {
    client: Arc<dyn ChainClient>,
    defaults: TransactionDefaults,
    wait: WaitConfig,
}

impl TransactionBuilder {
    pub fn new(client: Arc<dyn ChainClient>, defaults: TransactionDefaults, wait: WaitConfig) -> Self {
        Self {
            client,
            defaults,
            wait,
        }
    }

    pub fn client(&self) -> &Arc<dyn ChainClient> {
        &self.client
    }

    /// Build an unsigned transaction for `sender`
    pub async fn generate_transaction(
        &self,
        sender: &str,
        payload: EntryFunctionPayload,
    ) -> Result<RawTransaction> {
        let account = self.client.account(sender).await?.ok_or_else(|| {
            Error::TransactionFailure(format!("Sender account {} does not exist", sender))
        })?;

        let gas_unit_price = match self.defaults.gas_unit_price {
            Some(price) => price,
            None => self.client.estimate_gas_price().await?.gas_estimate,
        };

        let expiration =
            (Utc::now().timestamp().max(0) as u64).saturating_add(self.defaults.expiration_secs);

        tracing::debug!(
            sender = sender,
            sequence_number = account.sequence_number,
            gas_unit_price = gas_unit_price,
            function = %payload.function,
            "Generated transaction"
        );

        Ok(RawTransaction {
            sender: sender.to_string(),
            sequence_number: account.sequence_number,
            max_gas_amount: self.defaults.max_gas_amount,
            gas_unit_price,
            expiration_timestamp_secs: expiration,
            payload,
        })
    }

    /// Sign `raw` with `signer`
    pub async fn sign_transaction(
        &self,
        signer: &LocalSigner,
        raw: RawTransaction,
    ) -> Result<SignedTransaction> {
        let message = self.client.encode_submission(&raw).await?;
        let signature = Ed25519Signature {
            public_key: signer.public_key_hex(),
            signature: signer.sign_hex(&message),
        };
        Ok(SignedTransaction { raw, signature })
    }

    pub async fn submit(&self, signed: &SignedTransaction) -> Result<PendingTransaction> {
        let pending = self.client.submit_transaction(signed).await?;
        tracing::info!(hash = %pending.hash, sender = %pending.sender, "Submitted transaction");
        Ok(pending)
    }

    /// Poll until `hash` is committed
    pub async fn wait_for_transaction(&self, hash: &str) -> Result<UserTransaction> {
        let timeout = Duration::from_secs(self.wait.timeout_secs);
        let interval = Duration::from_millis(self.wait.poll_interval_ms.max(1));

        tokio::time::timeout(timeout, self.poll_until_committed(hash, interval))
            .await
            .map_err(|_| {
                Error::TransactionFailure(format!(
                    "Timed out after {}s waiting for {}",
                    timeout.as_secs(),
                    hash
                ))
            })?
    }

    async fn poll_until_committed(&self, hash: &str, interval: Duration) -> Result<UserTransaction> {
        loop {
            match self.client.transaction_by_hash(hash).await? {
                Some(TransactionStatus::Committed(txn)) => return Ok(txn),
                Some(TransactionStatus::Pending) | None => {
                    tokio::time::sleep(interval).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeChain, TEST_KEY};
    use crate::transfer::coin_transfer_payload;

    fn builder(chain: Arc<FakeChain>, wait: WaitConfig) -> TransactionBuilder {
        TransactionBuilder::new(chain, TransactionDefaults::default(), wait)
    }

    #[tokio::test]
    async fn generate_uses_sequence_number_and_gas_estimate() {
        let chain = Arc::new(FakeChain::new());
        let signer = LocalSigner::from_hex(TEST_KEY).unwrap();
        chain.add_account(signer.address(), 12, 1_000).await;

        let raw = builder(chain.clone(), WaitConfig::default())
            .generate_transaction(signer.address(), coin_transfer_payload("0x2", 10))
            .await
            .unwrap();

        assert_eq!(raw.sequence_number, 12);
        assert_eq!(raw.gas_unit_price, FakeChain::GAS_ESTIMATE);
        assert_eq!(raw.max_gas_amount, 200_000);
        assert!(raw.expiration_timestamp_secs > Utc::now().timestamp() as u64);
    }

    #[tokio::test]
    async fn generate_saturates_huge_expiration() {
        let chain = Arc::new(FakeChain::new());
        chain.add_account("0x1", 0, 0).await;
        let defaults = TransactionDefaults {
            expiration_secs: u64::MAX,
            ..TransactionDefaults::default()
        };

        let raw = TransactionBuilder::new(chain, defaults, WaitConfig::default())
            .generate_transaction("0x1", coin_transfer_payload("0x2", 10))
            .await
            .unwrap();
        assert_eq!(raw.expiration_timestamp_secs, u64::MAX);
    }

    #[tokio::test]
    async fn generate_prefers_configured_gas_price() {
        let chain = Arc::new(FakeChain::new());
        chain.add_account("0x1", 0, 0).await;
        let defaults = TransactionDefaults {
            gas_unit_price: Some(7),
            ..TransactionDefaults::default()
        };

        let raw = TransactionBuilder::new(chain, defaults, WaitConfig::default())
            .generate_transaction("0x1", coin_transfer_payload("0x2", 10))
            .await
            .unwrap();
        assert_eq!(raw.gas_unit_price, 7);
    }

    #[tokio::test]
    async fn generate_fails_for_unknown_sender() {
        let chain = Arc::new(FakeChain::new());
        let err = builder(chain, WaitConfig::default())
            .generate_transaction("0x9", coin_transfer_payload("0x2", 10))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TransactionFailure(_)));
    }

    #[tokio::test]
    async fn sign_produces_verifiable_signature() {
        let chain = Arc::new(FakeChain::new());
        let signer = LocalSigner::from_hex(TEST_KEY).unwrap();
        chain.add_account(signer.address(), 0, 0).await;
        let builder = builder(chain, WaitConfig::default());

        let raw = builder
            .generate_transaction(signer.address(), coin_transfer_payload("0x2", 10))
            .await
            .unwrap();
        let signed = builder.sign_transaction(&signer, raw.clone()).await.unwrap();

        let message = FakeChain::signing_message(&raw);
        let sig_bytes = hex::decode(signed.signature.signature.trim_start_matches("0x")).unwrap();
        let signature = ed25519_dalek::Signature::from_slice(&sig_bytes).unwrap();
        assert!(signer.verify(&message, &signature));
        assert_eq!(signed.signature.public_key, signer.public_key_hex());
    }

    #[tokio::test]
    async fn wait_times_out_on_unknown_hash() {
        let chain = Arc::new(FakeChain::new());
        let wait = WaitConfig {
            timeout_secs: 0,
            poll_interval_ms: 1,
        };
        let err = builder(chain, wait)
            .wait_for_transaction("0xdead")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Timed out"));
    }
}
