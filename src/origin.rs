//! Requesting origin resolution
//!
//! A request is attributed to the page in the active tab; its hostname is the
//! key permissions are granted under.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use url::Url;

use crate::{Error, Result};

#[async_trait]
pub trait OriginResolver: Send + Sync {
    /// Hostname of the page making the current request
    async fn current_origin(&self) -> Result<String>;
}

/// The browser's active tab
#[derive(Debug, Clone, Default)]
pub struct ActiveTab {
    url: Arc<RwLock<Option<String>>>,
}

impl ActiveTab {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_url(&self, url: Option<String>) {
        *self.url.write().await = url;
    }
}

#[async_trait]
impl OriginResolver for ActiveTab {
    async fn current_origin(&self) -> Result<String> {
        let url = self.url.read().await.clone();
        let url = url.ok_or_else(|| Error::Unauthorized("no active tab".to_string()))?;
        hostname(&url)
    }
}

/// Hostname of `url`
pub fn hostname(url: &str) -> Result<String> {
    let parsed =
        Url::parse(url).map_err(|e| Error::Unauthorized(format!("invalid tab URL {}: {}", url, e)))?;
    parsed
        .host_str()
        .map(str::to_string)
        .ok_or_else(|| Error::Unauthorized(format!("tab URL {} has no host", url)))
}
