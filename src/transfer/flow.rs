//! Simulate-then-submit flow for any entry function payload

use std::sync::Arc;

use super::{QueryCache, QueryKey};
use crate::accounts::ActiveAccount;
use crate::client::{EntryFunctionPayload, UserTransaction};
use crate::wallet::{LocalSigner, SimulationResult, TransactionBuilder, TransactionSimulator};
use crate::{Error, Result};

#[derive(Clone)]
pub struct TransactionFlow {
    builder: TransactionBuilder,
    simulator: TransactionSimulator,
    cache: Arc<QueryCache>,
}

impl TransactionFlow {
    pub fn new(builder: TransactionBuilder, cache: Arc<QueryCache>) -> Self {
        let simulator = TransactionSimulator::new(builder.client().clone());
        Self {
            builder,
            simulator,
            cache,
        }
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    /// Simulate the payload produced by `payload` as `sender`
    pub async fn simulate<F>(&self, sender: &ActiveAccount, payload: F) -> Result<SimulationResult>
    where
        F: FnOnce() -> Result<EntryFunctionPayload>,
    {
        let raw = self
            .builder
            .generate_transaction(&sender.address, payload()?)
            .await?;
        self.simulator.simulate(raw, &sender.public_key).await
    }

    /// Sign, submit and wait for the payload produced by `payload`
    ///
    /// Every key in `invalidate` is dropped as soon as the node accepts the
    /// transaction, before waiting for it. This holds even when the wait
    /// times out or execution fails, since gas is charged either way.
    pub async fn submit<F>(
        &self,
        signer: &LocalSigner,
        payload: F,
        invalidate: &[QueryKey],
    ) -> Result<UserTransaction>
    where
        F: FnOnce() -> Result<EntryFunctionPayload>,
    {
        let raw = self
            .builder
            .generate_transaction(signer.address(), payload()?)
            .await?;
        let signed = self.builder.sign_transaction(signer, raw).await?;
        let pending = self.builder.submit(&signed).await?;

        for key in invalidate {
            self.cache.invalidate(key).await;
        }

        let committed = self.builder.wait_for_transaction(&pending.hash).await?;

        if !committed.success {
            tracing::warn!(
                hash = %committed.hash,
                vm_status = %committed.vm_status,
                "Transaction committed with failure"
            );
            return Err(Error::TransactionFailure(committed.vm_status));
        }

        tracing::info!(
            hash = %committed.hash,
            version = committed.version,
            gas_used = committed.gas_used,
            "Transaction committed"
        );
        Ok(committed)
    }
}
