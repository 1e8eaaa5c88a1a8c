//! Bridge runner
//!
//! Serves newline-delimited JSON requests from the browser extension. Each
//! line carries the URL of the tab that made the request; the runner points
//! the active tab at it, dispatches the request and writes one response line.
//! Requests are handled strictly one at a time.

use serde::Deserialize;
use std::time::Instant;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{info, warn};
use ts_rs::TS;

use crate::api::DappApi;
use crate::audit::AuditLog;
use crate::bridge::{self, BridgeError, DappRequest, DappResponse};
use crate::origin::{hostname, ActiveTab};
use crate::Result;

/// One request line as sent by the extension
#[derive(Debug, Clone, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BridgeMessage {
    #[serde(flatten)]
    pub request: DappRequest,
    /// URL of the page making the request
    #[serde(default)]
    pub tab_url: Option<String>,
}

pub struct BridgeRunner {
    api: DappApi,
    tab: ActiveTab,
    audit: Option<AuditLog>,
}

impl BridgeRunner {
    /// `tab` must be the origin resolver `api` was built with
    pub fn new(api: DappApi, tab: ActiveTab) -> Self {
        Self {
            api,
            tab,
            audit: None,
        }
    }

    pub fn with_audit_log(mut self, audit: AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Serve until `reader` is exhausted; returns the number of requests answered
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<usize>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!("Bridge runner started");
        let mut lines = reader.lines();
        let mut handled = 0;

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<BridgeMessage>(line) {
                Ok(message) => self.handle_message(message).await,
                Err(e) => {
                    warn!(error = %e, "Malformed bridge request");
                    DappResponse::from_result(
                        String::new(),
                        Err(BridgeError::InvalidParams(e.to_string())),
                    )
                }
            };

            let mut out = serde_json::to_string(&response)?;
            out.push('\n');
            writer.write_all(out.as_bytes()).await?;
            writer.flush().await?;
            handled += 1;
        }

        info!(handled = handled, "Bridge input closed");
        Ok(handled)
    }

    async fn handle_message(&self, message: BridgeMessage) -> DappResponse {
        let BridgeMessage { request, tab_url } = message;
        let origin = tab_url.as_deref().and_then(|url| hostname(url).ok());
        self.tab.set_url(tab_url).await;

        if let Some(audit) = &self.audit {
            audit
                .request_started(&request.id, &request.method, origin.as_deref())
                .await;
        }

        let started = Instant::now();
        let result = bridge::handle(&self.api, &request.method, &request.args).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(_) => info!(
                request_id = %request.id,
                method = %request.method,
                origin = ?origin,
                duration_ms = duration_ms,
                "Request completed"
            ),
            Err(e) => warn!(
                request_id = %request.id,
                method = %request.method,
                origin = ?origin,
                code = e.code(),
                error = %e.detail(),
                "Request failed"
            ),
        }

        if let Some(audit) = &self.audit {
            audit
                .request_completed(
                    &request.id,
                    &request.method,
                    origin.as_deref(),
                    result.as_ref().map(|_| ()),
                    duration_ms,
                )
                .await;
        }

        DappResponse::from_result(request.id, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::INVALID_PARAMS_CODE;
    use crate::permissions::StaticPrompter;
    use crate::testing::TestWallet;
    use serde_json::Value;

    fn runner(wallet: &TestWallet) -> BridgeRunner {
        BridgeRunner::new(wallet.api.clone(), wallet.tab.clone())
    }

    fn responses(output: &[u8]) -> Vec<Value> {
        std::str::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_serves_requests_in_order() {
        let wallet = TestWallet::new(StaticPrompter::approve_all(), true).await;
        let input = tokio_test::io::Builder::new()
            .read(b"{\"id\":\"1\",\"method\":\"connect\",\"tabUrl\":\"https://dapp.example/\"}\n")
            .read(b"\n")
            .read(b"{\"id\":\"2\",\"method\":\"isConnected\",\"tabUrl\":\"https://dapp.example/x\"}\n")
            .read(b"{\"id\":\"3\",\"method\":\"isConnected\",\"tabUrl\":\"https://other.example/\"}\n")
            .build();
        let mut output = Vec::new();

        let handled = runner(&wallet)
            .serve(tokio::io::BufReader::new(input), &mut output)
            .await
            .unwrap();
        assert_eq!(handled, 3);

        let responses = responses(&output);
        assert_eq!(responses[0]["id"], "1");
        assert_eq!(responses[0]["result"]["address"], wallet.signer.address());
        assert_eq!(responses[1]["result"], true);
        assert_eq!(responses[2]["result"], false);
    }

    #[tokio::test]
    async fn test_missing_tab_url_is_unauthorized() {
        let wallet = TestWallet::connected(StaticPrompter::approve_all()).await;
        let input: &[u8] = b"{\"id\":\"1\",\"method\":\"account\"}\n";
        let mut output = Vec::new();

        runner(&wallet).serve(input, &mut output).await.unwrap();
        assert_eq!(responses(&output)[0]["error"]["code"], 4100);
    }

    #[tokio::test]
    async fn test_malformed_line_gets_error_response() {
        let wallet = TestWallet::connected(StaticPrompter::approve_all()).await;
        let input: &[u8] = b"not json\n{\"id\":\"2\",\"method\":\"account\",\"tabUrl\":\"https://dapp.example\"}\n";
        let mut output = Vec::new();

        let handled = runner(&wallet).serve(input, &mut output).await.unwrap();
        assert_eq!(handled, 2);

        let responses = responses(&output);
        assert_eq!(responses[0]["error"]["code"], INVALID_PARAMS_CODE);
        assert_eq!(responses[1]["result"]["address"], wallet.signer.address());
    }

    #[tokio::test]
    async fn test_requests_are_audited() {
        let wallet = TestWallet::connected(StaticPrompter::deny_all()).await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let runner = runner(&wallet).with_audit_log(AuditLog::new(&path));

        let input: &[u8] = b"{\"id\":\"9\",\"method\":\"signMessage\",\"args\":\"hi\",\"tabUrl\":\"https://dapp.example\"}\n";
        let mut output = Vec::new();
        runner.serve(input, &mut output).await.unwrap();

        let entries: Vec<Value> = std::fs::read_to_string(&path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1]["request_id"], "9");
        assert_eq!(entries[1]["origin"], "dapp.example");
        assert_eq!(entries[1]["error_code"], 4001);
    }
}
