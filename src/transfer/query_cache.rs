//! Query cache
//!
//! Caches read queries (balances, account existence) for a short time so the
//! transfer form does not hit the node on every keystroke. Writes invalidate
//! the entries they affect.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::accounts::normalize_address;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    AccountCoinBalance(String),
    AccountExists(String),
}

impl QueryKey {
    pub fn coin_balance(address: &str) -> Self {
        QueryKey::AccountCoinBalance(normalize_address(address))
    }

    pub fn account_exists(address: &str) -> Self {
        QueryKey::AccountExists(normalize_address(address))
    }
}

struct CachedEntry {
    value: Value,
    fetched_at: Instant,
}

pub struct QueryCache {
    entries: RwLock<HashMap<QueryKey, CachedEntry>>,
    stale_after: Duration,
}

impl QueryCache {
    pub fn new(stale_after: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            stale_after,
        }
    }

    /// Fresh cached value for `key`
    pub async fn get<T: DeserializeOwned>(&self, key: &QueryKey) -> Option<T> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if entry.fetched_at.elapsed() > self.stale_after {
            return None;
        }
        serde_json::from_value(entry.value.clone()).ok()
    }

    pub async fn set<T: Serialize>(&self, key: QueryKey, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.entries.write().await.insert(
            key,
            CachedEntry {
                value,
                fetched_at: Instant::now(),
            },
        );
        Ok(())
    }

    /// Drop `key`; returns whether an entry was present
    pub async fn invalidate(&self, key: &QueryKey) -> bool {
        let removed = self.entries.write().await.remove(key).is_some();
        tracing::debug!(key = ?key, removed = removed, "Invalidated query");
        removed
    }

    /// Cached value, or the result of `fetch` (which is then cached)
    pub async fn get_or_fetch<T, F, Fut>(&self, key: QueryKey, fetch: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(value) = self.get(&key).await {
            return Ok(value);
        }
        let value = fetch().await?;
        self.set(key, &value).await?;
        Ok(value)
    }
}
