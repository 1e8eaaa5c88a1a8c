//! Transaction simulation before signing
//!
//! Runs a transaction through the node's simulation endpoint to:
//! - Catch Move aborts early with a readable reason
//! - Report gas usage and the expected fee
//!
//! SECURITY NOTE:
//! - Simulation never signs; it sends an all-zero signature with the
//!   sender's public key, which the endpoint requires.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::client::{ChainClient, Ed25519Signature, RawTransaction, SignedTransaction};
use crate::Result;

/// Result of simulating a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Whether the simulation succeeded
    pub success: bool,
    /// Gas units consumed
    pub gas_used: u64,
    /// Gas unit price the transaction was built with
    pub gas_unit_price: u64,
    /// Raw VM status string
    pub vm_status: String,
    /// Short abort reason (if failed)
    pub abort_reason: Option<String>,
}

impl SimulationResult {
    /// Expected fee in octas
    pub fn estimated_fee(&self) -> u64 {
        self.gas_used.saturating_mul(self.gas_unit_price)
    }
}

/// Transaction simulator using the node's simulate endpoint
#[derive(Clone)]
pub struct TransactionSimulator {
    client: Arc<dyn ChainClient>,
}

impl TransactionSimulator {
    pub fn new(client: Arc<dyn ChainClient>) -> Self {
        Self { client }
    }

    /// Simulate `raw` as if sent by the holder of `public_key`
    pub async fn simulate(&self, raw: RawTransaction, public_key: &str) -> Result<SimulationResult> {
        let gas_unit_price = raw.gas_unit_price;
        let unsigned = SignedTransaction {
            raw,
            signature: Ed25519Signature::zeroed(public_key),
        };

        let txn = self.client.simulate_transaction(&unsigned).await?;
        let abort_reason = if txn.success {
            None
        } else {
            Some(Self::parse_abort_reason(&txn.vm_status))
        };

        tracing::debug!(
            success = txn.success,
            gas_used = txn.gas_used,
            vm_status = %txn.vm_status,
            "Simulated transaction"
        );

        Ok(SimulationResult {
            success: txn.success,
            gas_used: txn.gas_used,
            gas_unit_price: if txn.gas_unit_price > 0 {
                txn.gas_unit_price
            } else {
                gas_unit_price
            },
            vm_status: txn.vm_status,
            abort_reason,
        })
    }

    /// Extract the short abort reason from a VM status
    ///
    /// `Move abort in 0x1::coin: EINSUFFICIENT_BALANCE(0x10006): Not enough coins`
    /// becomes `EINSUFFICIENT_BALANCE`. Anything unrecognised is returned whole.
    pub fn parse_abort_reason(vm_status: &str) -> String {
        if let Some(rest) = vm_status.strip_prefix("Move abort in ") {
            if let Some((_, detail)) = rest.split_once(": ") {
                let name = detail.split(['(', ':']).next().unwrap_or(detail).trim();
                if !name.is_empty() {
                    return name.to_string();
                }
            }
            return vm_status.to_string();
        }

        // Out of gas and friends carry no module
        if vm_status.starts_with("Out of gas") {
            return "OUT_OF_GAS".to_string();
        }

        vm_status.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::EntryFunctionPayload;
    use crate::testing::FakeChain;

    fn raw(sender: &str) -> RawTransaction {
        RawTransaction {
            sender: sender.to_string(),
            sequence_number: 0,
            max_gas_amount: 200_000,
            gas_unit_price: 100,
            expiration_timestamp_secs: 0,
            payload: EntryFunctionPayload {
                function: "0x1::coin::transfer".to_string(),
                type_arguments: vec![],
                arguments: vec![],
            },
        }
    }

    #[test]
    fn test_estimated_fee() {
        let result = SimulationResult {
            success: true,
            gas_used: 9,
            gas_unit_price: 100,
            vm_status: "Executed successfully".to_string(),
            abort_reason: None,
        };
        assert_eq!(result.estimated_fee(), 900);
    }

    #[test]
    fn test_parse_abort_reason() {
        let status = "Move abort in 0x1::coin: EINSUFFICIENT_BALANCE(0x10006): Not enough coins to complete transaction";
        assert_eq!(
            TransactionSimulator::parse_abort_reason(status),
            "EINSUFFICIENT_BALANCE"
        );

        let status = "Move abort in 0x1::aptos_account: ECOIN_STORE_NOT_PUBLISHED(0x60005): ";
        assert_eq!(
            TransactionSimulator::parse_abort_reason(status),
            "ECOIN_STORE_NOT_PUBLISHED"
        );

        assert_eq!(
            TransactionSimulator::parse_abort_reason("Out of gas"),
            "OUT_OF_GAS"
        );
        assert_eq!(
            TransactionSimulator::parse_abort_reason("SEQUENCE_NUMBER_TOO_OLD"),
            "SEQUENCE_NUMBER_TOO_OLD"
        );
    }

    #[tokio::test]
    async fn test_simulate_sends_zeroed_signature() {
        let chain = Arc::new(FakeChain::new());
        let simulator = TransactionSimulator::new(chain.clone());

        let result = simulator.simulate(raw("0x1"), "0xab").await.unwrap();
        assert!(result.success);
        assert_eq!(result.gas_used, FakeChain::GAS_USED);

        let sent = chain.simulated().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].signature, Ed25519Signature::zeroed("0xab"));
    }

    #[tokio::test]
    async fn test_simulate_reports_abort() {
        let chain = Arc::new(FakeChain::new());
        chain
            .fail_simulation("Move abort in 0x1::coin: EINSUFFICIENT_BALANCE(0x10006): ")
            .await;
        let simulator = TransactionSimulator::new(chain);

        let result = simulator.simulate(raw("0x1"), "0xab").await.unwrap();
        assert!(!result.success);
        assert_eq!(result.abort_reason.as_deref(), Some("EINSUFFICIENT_BALANCE"));
    }
}
