//! REST client for a fullnode
//!
//! Read-only queries plus JSON transaction submission. Errors reported by the
//! node are surfaced as `Error::Node` with the node's message.

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::{
    AccountData, ChainClient, GasEstimate, LedgerInfo, PendingTransaction, RawTransaction,
    SignedTransaction, TransactionStatus, UserTransaction,
};
use crate::{Error, Result};

/// Error body returned by the node API
#[derive(Debug, Deserialize)]
struct NodeError {
    message: String,
    #[serde(default)]
    error_code: Option<String>,
}

pub struct RestClient {
    http: reqwest::Client,
    base_url: Url,
}

impl RestClient {
    pub fn new(node_url: Url) -> Self {
        Self::with_client(reqwest::Client::new(), node_url)
    }

    pub fn with_client(http: reqwest::Client, node_url: Url) -> Self {
        // Url::join drops the last segment unless the base ends with '/'
        let mut base_url = node_url;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| Error::Config(format!("Invalid endpoint {}: {}", path, e)))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint(path)?;
        tracing::debug!(url = %url, "GET");
        let response = self.http.get(url).send().await?;
        Self::parse(response).await
    }

    async fn post_json<T: DeserializeOwned>(&self, path: &str, body: &impl serde::Serialize) -> Result<T> {
        let url = self.endpoint(path)?;
        tracing::debug!(url = %url, "POST");
        let response = self.http.post(url).json(body).send().await?;
        Self::parse(response).await
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let text = response.text().await.unwrap_or_default();
        Err(Self::node_error(status, &text))
    }

    fn node_error(status: StatusCode, body: &str) -> Error {
        let message = match serde_json::from_str::<NodeError>(body) {
            Ok(err) => match err.error_code {
                Some(code) => format!("{} ({})", err.message, code),
                None => err.message,
            },
            Err(_) => body.to_string(),
        };
        Error::Node {
            status: status.as_u16(),
            message,
        }
    }

    fn is_not_found(err: &Error) -> bool {
        matches!(err, Error::Node { status: 404, .. })
    }
}

#[async_trait]
impl ChainClient for RestClient {
    async fn ledger_info(&self) -> Result<LedgerInfo> {
        self.get_json("").await
    }

    async fn account(&self, address: &str) -> Result<Option<AccountData>> {
        match self.get_json(&format!("accounts/{}", address)).await {
            Ok(account) => Ok(Some(account)),
            Err(e) if Self::is_not_found(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn coin_balance(&self, address: &str, coin_type: &str) -> Result<u64> {
        let path = format!(
            "accounts/{}/resource/0x1::coin::CoinStore<{}>",
            address, coin_type
        );
        let resource: Value = match self.get_json(&path).await {
            Ok(resource) => resource,
            Err(e) if Self::is_not_found(&e) => return Ok(0),
            Err(e) => return Err(e),
        };

        let value = resource["data"]["coin"]["value"]
            .as_str()
            .ok_or_else(|| Error::Node {
                status: 200,
                message: format!("CoinStore for {} has no coin value", address),
            })?;
        value
            .parse()
            .map_err(|e| Error::InvalidArgument(format!("Invalid coin value {}: {}", value, e)))
    }

    async fn estimate_gas_price(&self) -> Result<GasEstimate> {
        self.get_json("estimate_gas_price").await
    }

    async fn encode_submission(&self, raw: &RawTransaction) -> Result<Vec<u8>> {
        let encoded: String = self.post_json("transactions/encode_submission", raw).await?;
        let hex_part = encoded.strip_prefix("0x").unwrap_or(&encoded);
        hex::decode(hex_part)
            .map_err(|e| Error::InvalidArgument(format!("Invalid signing message: {}", e)))
    }

    async fn submit_transaction(&self, signed: &SignedTransaction) -> Result<PendingTransaction> {
        self.post_json("transactions", signed).await
    }

    async fn simulate_transaction(&self, signed: &SignedTransaction) -> Result<UserTransaction> {
        let mut results: Vec<UserTransaction> =
            self.post_json("transactions/simulate", signed).await?;
        results
            .pop()
            .ok_or_else(|| Error::Simulation("node returned no simulation result".to_string()))
    }

    async fn transaction_by_hash(&self, hash: &str) -> Result<Option<TransactionStatus>> {
        let value: Value = match self.get_json(&format!("transactions/by_hash/{}", hash)).await {
            Ok(value) => value,
            Err(e) if Self::is_not_found(&e) => return Ok(None),
            Err(e) => return Err(e),
        };

        if value["type"] == "pending_transaction" {
            return Ok(Some(TransactionStatus::Pending));
        }
        let committed: UserTransaction = serde_json::from_value(value)?;
        Ok(Some(TransactionStatus::Committed(committed)))
    }
}
