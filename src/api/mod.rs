//! Public API exposed to dapps
//!
//! Every method runs the same guard ladder before doing anything:
//! 1. an active account must exist (`NoAccounts`)
//! 2. the requesting origin must resolve and be connected (`Unauthorized`)
//! 3. signing methods additionally need the user's approval (`UserRejection`)
//!
//! Failures from the node are reported as `TransactionFailure`. Nothing is
//! retried; the first failing step ends the call.

mod message;

pub use message::{
    MessageContext, SignMessagePayload, SignMessageRequest, SignMessageResponse, SignedMessage,
    MESSAGE_PREFIX,
};

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::accounts::ActiveAccount;
use crate::client::{EntryFunctionPayload, PendingTransaction, SignedTransaction};
use crate::context::WalletContext;
use crate::error::{DappError, DappErrorKind};
use crate::origin::OriginResolver;
use crate::permissions::{PermissionKind, Permissions};
use crate::wallet::LocalSigner;
use crate::Error;

pub type DappResult<T> = std::result::Result<T, DappError>;

/// Network description returned to dapps
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkInfo {
    pub name: String,
    pub url: String,
}

#[derive(Clone)]
pub struct DappApi {
    ctx: Arc<WalletContext>,
    origin: Arc<dyn OriginResolver>,
    permissions: Permissions,
}

impl DappApi {
    pub fn new(
        ctx: Arc<WalletContext>,
        origin: Arc<dyn OriginResolver>,
        permissions: Permissions,
    ) -> Self {
        Self {
            ctx,
            origin,
            permissions,
        }
    }

    /// Ask to connect; prompts unless the origin is already connected
    pub async fn connect(&self) -> DappResult<ActiveAccount> {
        let account = self.require_account().await?;
        let origin = self.require_origin().await?;

        if self.is_allowed(&origin, &account.address).await? {
            return Ok(account);
        }

        self.require_approval(&origin, &account.address, PermissionKind::Connect, None)
            .await?;
        self.permissions
            .add_domain(&origin, &account.address)
            .await
            .map_err(|e| storage_failure(DappErrorKind::Unauthorized, e))?;
        Ok(account)
    }

    pub async fn disconnect(&self) -> DappResult<()> {
        let account = self.require_account().await?;
        let origin = self.require_origin().await?;
        self.permissions
            .remove_domain(&origin, &account.address)
            .await
            .map_err(|e| storage_failure(DappErrorKind::Unauthorized, e))
    }

    /// `false` when there is no active account
    pub async fn is_connected(&self) -> DappResult<bool> {
        let account = match self.require_account().await {
            Ok(account) => account,
            Err(e) if e.kind == DappErrorKind::NoAccounts => return Ok(false),
            Err(e) => return Err(e),
        };
        let origin = self.require_origin().await?;
        self.is_allowed(&origin, &account.address).await
    }

    pub async fn account(&self) -> DappResult<ActiveAccount> {
        let account = self.require_account().await?;
        let origin = self.require_origin().await?;
        self.require_authorized(&origin, &account.address).await?;
        Ok(account)
    }

    pub async fn network(&self) -> DappResult<NetworkInfo> {
        let account = self.require_account().await?;
        let origin = self.require_origin().await?;
        self.require_authorized(&origin, &account.address).await?;

        let network = self
            .ctx
            .active_network()
            .await
            .map_err(|e| storage_failure(DappErrorKind::TransactionFailure, e))?;
        Ok(NetworkInfo {
            name: network.name,
            url: network.node_url.to_string(),
        })
    }

    /// Sign without submitting
    pub async fn sign_transaction(
        &self,
        payload: EntryFunctionPayload,
    ) -> DappResult<SignedTransaction> {
        let (_, signer) = self
            .authorize_signing(PermissionKind::SignTransaction, payload_detail(&payload))
            .await?;

        let builder = self.ctx.transaction_builder().await.map_err(transaction_failure)?;
        let raw = builder
            .generate_transaction(signer.address(), payload)
            .await
            .map_err(transaction_failure)?;
        builder
            .sign_transaction(&signer, raw)
            .await
            .map_err(transaction_failure)
    }

    pub async fn sign_and_submit_transaction(
        &self,
        payload: EntryFunctionPayload,
    ) -> DappResult<PendingTransaction> {
        let (_, signer) = self
            .authorize_signing(
                PermissionKind::SignAndSubmitTransaction,
                payload_detail(&payload),
            )
            .await?;

        let builder = self.ctx.transaction_builder().await.map_err(transaction_failure)?;
        let raw = builder
            .generate_transaction(signer.address(), payload)
            .await
            .map_err(transaction_failure)?;
        let signed = builder
            .sign_transaction(&signer, raw)
            .await
            .map_err(transaction_failure)?;
        builder.submit(&signed).await.map_err(transaction_failure)
    }

    pub async fn sign_message(&self, request: SignMessageRequest) -> DappResult<SignedMessage> {
        let detail = match &request {
            SignMessageRequest::Plain(message) => serde_json::json!({ "message": message }),
            SignMessageRequest::Structured(payload) => {
                serde_json::to_value(payload).unwrap_or(Value::Null)
            }
        };
        let (origin, signer) = self
            .authorize_signing(PermissionKind::SignMessage, Some(detail))
            .await?;

        match request {
            SignMessageRequest::Plain(message) => Ok(SignedMessage::Signature(hex::encode(
                signer.sign(message.as_bytes()).to_bytes(),
            ))),
            SignMessageRequest::Structured(payload) => {
                let chain_id = if payload.chain_id {
                    let client = self.ctx.client().await.map_err(transaction_failure)?;
                    Some(
                        client
                            .ledger_info()
                            .await
                            .map_err(transaction_failure)?
                            .chain_id,
                    )
                } else {
                    None
                };

                let ctx = MessageContext {
                    address: signer.address(),
                    application: &origin,
                    chain_id,
                };
                let full_message = payload.full_message(&ctx);
                let signature = hex::encode(signer.sign(full_message.as_bytes()).to_bytes());
                Ok(SignedMessage::Structured(payload.response(&ctx, signature)))
            }
        }
    }

    /// Guards shared by the signing methods; returns the origin and signer
    async fn authorize_signing(
        &self,
        kind: PermissionKind,
        detail: Option<Value>,
    ) -> DappResult<(String, LocalSigner)> {
        let account = self.require_account().await?;
        let origin = self.require_origin().await?;
        self.require_authorized(&origin, &account.address).await?;
        self.require_approval(&origin, &account.address, kind, detail)
            .await?;
        let signer = self.require_signer(&account).await?;
        Ok((origin, signer))
    }

    async fn require_account(&self) -> DappResult<ActiveAccount> {
        match self.ctx.active_account().await {
            Ok(Some(account)) => Ok(account),
            Ok(None) => Err(DappError::no_accounts()),
            Err(e) => Err(storage_failure(DappErrorKind::NoAccounts, e)),
        }
    }

    async fn require_origin(&self) -> DappResult<String> {
        self.origin.current_origin().await.map_err(|e| {
            debug!(error = %e, "Could not resolve requesting origin");
            DappError::with_detail(DappErrorKind::Unauthorized, e.to_string())
        })
    }

    async fn is_allowed(&self, origin: &str, address: &str) -> DappResult<bool> {
        self.permissions
            .is_domain_allowed(origin, address)
            .await
            .map_err(|e| storage_failure(DappErrorKind::Unauthorized, e))
    }

    async fn require_authorized(&self, origin: &str, address: &str) -> DappResult<()> {
        if self.is_allowed(origin, address).await? {
            Ok(())
        } else {
            Err(DappError::unauthorized())
        }
    }

    async fn require_approval(
        &self,
        origin: &str,
        address: &str,
        kind: PermissionKind,
        detail: Option<Value>,
    ) -> DappResult<()> {
        match self
            .permissions
            .request_permission(origin, address, kind, detail)
            .await
        {
            Ok(true) => Ok(()),
            Ok(false) => Err(DappError::user_rejection()),
            Err(e) => {
                warn!(error = %e, kind = kind.name(), "Permission prompt failed");
                Err(DappError::with_detail(
                    DappErrorKind::UserRejection,
                    e.to_string(),
                ))
            }
        }
    }

    /// The active account's key must be unlocked in the session
    async fn require_signer(&self, account: &ActiveAccount) -> DappResult<LocalSigner> {
        match self.ctx.session().signer(&account.address).await {
            Ok(Some(signer)) => Ok(signer),
            Ok(None) => Err(DappError::with_detail(
                DappErrorKind::NoAccounts,
                "wallet is locked",
            )),
            Err(e) => Err(storage_failure(DappErrorKind::NoAccounts, e)),
        }
    }
}

fn payload_detail(payload: &EntryFunctionPayload) -> Option<Value> {
    serde_json::to_value(payload).ok()
}

fn transaction_failure(e: Error) -> DappError {
    warn!(error = %e, "Transaction failed");
    DappError::transaction_failure(e.to_string())
}

fn storage_failure(kind: DappErrorKind, e: Error) -> DappError {
    warn!(error = %e, kind = kind.name(), "Wallet state unavailable");
    DappError::with_detail(kind, e.to_string())
}
