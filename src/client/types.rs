//! Node API types
//!
//! Shapes follow the node's JSON transaction API. Unsigned 64-bit values are
//! carried as decimal strings on the wire.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Serde helpers for u64 values encoded as decimal strings
pub mod u64_string {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum StringOrNumber {
            String(String),
            Number(u64),
        }

        match StringOrNumber::deserialize(deserializer)? {
            StringOrNumber::String(s) => s.parse().map_err(de::Error::custom),
            StringOrNumber::Number(n) => Ok(n),
        }
    }
}

/// An entry function call
///
/// This crate never looks inside a payload beyond building transfer payloads;
/// dapp-supplied payloads are passed to the node unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "entry_function_payload")]
pub struct EntryFunctionPayload {
    pub function: String,
    #[serde(default)]
    pub type_arguments: Vec<String>,
    #[serde(default)]
    pub arguments: Vec<Value>,
}

/// Node ledger summary (`GET /`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerInfo {
    pub chain_id: u8,
    #[serde(with = "u64_string")]
    pub ledger_version: u64,
    #[serde(with = "u64_string")]
    pub ledger_timestamp: u64,
}

/// On-chain account (`GET /accounts/{address}`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountData {
    #[serde(with = "u64_string")]
    pub sequence_number: u64,
    pub authentication_key: String,
}

/// Gas price estimate (`GET /estimate_gas_price`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GasEstimate {
    pub gas_estimate: u64,
    #[serde(default)]
    pub prioritized_gas_estimate: Option<u64>,
}

/// An unsigned transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTransaction {
    pub sender: String,
    #[serde(with = "u64_string")]
    pub sequence_number: u64,
    #[serde(with = "u64_string")]
    pub max_gas_amount: u64,
    #[serde(with = "u64_string")]
    pub gas_unit_price: u64,
    #[serde(with = "u64_string")]
    pub expiration_timestamp_secs: u64,
    pub payload: EntryFunctionPayload,
}

/// Single-key Ed25519 authenticator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "ed25519_signature")]
pub struct Ed25519Signature {
    pub public_key: String,
    pub signature: String,
}

impl Ed25519Signature {
    /// All-zero signature accepted by the simulation endpoint
    pub fn zeroed(public_key: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
            signature: format!("0x{}", "00".repeat(64)),
        }
    }
}

/// A transaction ready for submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedTransaction {
    #[serde(flatten)]
    pub raw: RawTransaction,
    pub signature: Ed25519Signature,
}

/// Response to a submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingTransaction {
    pub hash: String,
    pub sender: String,
    #[serde(with = "u64_string")]
    pub sequence_number: u64,
}

/// A committed (or simulated) user transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserTransaction {
    pub hash: String,
    #[serde(default, with = "u64_string")]
    pub version: u64,
    pub success: bool,
    pub vm_status: String,
    #[serde(with = "u64_string")]
    pub gas_used: u64,
    #[serde(with = "u64_string")]
    pub gas_unit_price: u64,
}

/// Lookup result for `GET /transactions/by_hash/{hash}`
#[derive(Debug, Clone)]
pub enum TransactionStatus {
    Pending,
    Committed(UserTransaction),
}
