//! Session store for decrypted private keys
//!
//! SECURITY: keys live here only while the wallet is unlocked.
//! - Held as `SecretString`, never serialized
//! - `Debug` lists addresses only
//! - `lock()` drops every key

use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::accounts::normalize_address;
use crate::wallet::LocalSigner;
use crate::Result;

#[derive(Clone, Default)]
pub struct SessionStore {
    keys: Arc<RwLock<HashMap<String, SecretString>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the private key for `address` available for signing
    pub async fn unlock(&self, address: &str, private_key: SecretString) {
        self.keys
            .write()
            .await
            .insert(normalize_address(address), private_key);
    }

    /// Forget every key
    pub async fn lock(&self) {
        self.keys.write().await.clear();
    }

    pub async fn is_unlocked(&self, address: &str) -> bool {
        self.keys
            .read()
            .await
            .contains_key(&normalize_address(address))
    }

    /// Build a signer for `address`, if its key is unlocked
    pub async fn signer(&self, address: &str) -> Result<Option<LocalSigner>> {
        let keys = self.keys.read().await;
        match keys.get(&normalize_address(address)) {
            Some(secret) => LocalSigner::from_hex(secret.expose_secret()).map(Some),
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.keys.try_read().map(|k| k.len()).unwrap_or_default();
        f.debug_struct("SessionStore")
            .field("unlocked_keys", &count)
            .finish()
    }
}
