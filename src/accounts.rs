//! Active account records
//!
//! The active account is an address + public key pair persisted in the
//! extension store. The dapp API only reads it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha3::{Digest, Sha3_256};

use crate::storage::{get_string, keys, KeyValueStore};
use crate::Result;

/// Scheme byte appended to an Ed25519 public key when deriving the address
const ED25519_SCHEME: u8 = 0x00;

/// The account dapps see
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveAccount {
    pub address: String,
    pub public_key: String,
}

/// Load the active account, or `None` if either half is missing
pub async fn active_account(store: &dyn KeyValueStore) -> Result<Option<ActiveAccount>> {
    let address = get_string(store, keys::ACTIVE_ACCOUNT_ADDRESS).await?;
    let public_key = get_string(store, keys::ACTIVE_ACCOUNT_PUBLIC_KEY).await?;

    Ok(match (address, public_key) {
        (Some(address), Some(public_key)) => Some(ActiveAccount {
            address,
            public_key,
        }),
        _ => None,
    })
}

pub async fn set_active_account(store: &dyn KeyValueStore, account: &ActiveAccount) -> Result<()> {
    store
        .set(
            keys::ACTIVE_ACCOUNT_ADDRESS,
            Value::String(normalize_address(&account.address)),
        )
        .await?;
    store
        .set(
            keys::ACTIVE_ACCOUNT_PUBLIC_KEY,
            Value::String(account.public_key.clone()),
        )
        .await
}

pub async fn clear_active_account(store: &dyn KeyValueStore) -> Result<()> {
    store.remove(keys::ACTIVE_ACCOUNT_ADDRESS).await?;
    store.remove(keys::ACTIVE_ACCOUNT_PUBLIC_KEY).await
}

/// Derive the account address of a single-key Ed25519 account
pub fn derive_address(public_key: &[u8; 32]) -> String {
    let mut hasher = Sha3_256::new();
    hasher.update(public_key);
    hasher.update([ED25519_SCHEME]);
    format!("0x{}", hex::encode(hasher.finalize()))
}

/// Lowercase, `0x`-prefixed, left-padded to 32 bytes
///
/// Short forms like `0x1` become `0x000…001`.
pub fn normalize_address(address: &str) -> String {
    let trimmed = address.trim();
    let hex_part = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed)
        .to_lowercase();
    format!("0x{:0>64}", hex_part)
}

/// Whether `address` is a well-formed account address
pub fn is_valid_address(address: &str) -> bool {
    let hex_part = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .unwrap_or(address);
    !hex_part.is_empty() && hex_part.len() <= 64 && hex_part.bytes().all(|b| b.is_ascii_hexdigit())
}
