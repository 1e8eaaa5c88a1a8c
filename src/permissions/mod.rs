//! Domain permission grants
//!
//! A grant maps (origin, account address, permission kind) to an allow/deny
//! decision. The table is persisted in the extension store under
//! `domainPermissions` as `{ origin: { address: { kind: bool } } }`.
//!
//! An origin is "connected" for an account when its `connect` grant is true.
//! Signing kinds are normally decided by prompting on every request; an
//! explicit stored decision for the exact triple short-circuits the prompt.

mod prompt;

pub use prompt::{PermissionPrompter, PermissionRequest, StaticPrompter, TerminalPrompter};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::accounts::normalize_address;
use crate::storage::{keys, KeyValueStore};
use crate::Result;

/// What a dapp is asking to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionKind {
    Connect,
    SignTransaction,
    SignAndSubmitTransaction,
    SignMessage,
}

impl PermissionKind {
    pub fn name(&self) -> &'static str {
        match self {
            PermissionKind::Connect => "connect",
            PermissionKind::SignTransaction => "signTransaction",
            PermissionKind::SignAndSubmitTransaction => "signAndSubmitTransaction",
            PermissionKind::SignMessage => "signMessage",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "connect" => Some(PermissionKind::Connect),
            "signTransaction" => Some(PermissionKind::SignTransaction),
            "signAndSubmitTransaction" => Some(PermissionKind::SignAndSubmitTransaction),
            "signMessage" => Some(PermissionKind::SignMessage),
            _ => None,
        }
    }

    pub const ALL: [PermissionKind; 4] = [
        PermissionKind::Connect,
        PermissionKind::SignTransaction,
        PermissionKind::SignAndSubmitTransaction,
        PermissionKind::SignMessage,
    ];
}

type AccountGrants = BTreeMap<PermissionKind, bool>;
type GrantTable = BTreeMap<String, BTreeMap<String, AccountGrants>>;

/// Persisted permission table plus the prompt used to extend it
#[derive(Clone)]
pub struct Permissions {
    store: Arc<dyn KeyValueStore>,
    prompter: Arc<dyn PermissionPrompter>,
}

impl Permissions {
    pub fn new(store: Arc<dyn KeyValueStore>, prompter: Arc<dyn PermissionPrompter>) -> Self {
        Self { store, prompter }
    }

    async fn load(&self) -> Result<GrantTable> {
        match self.store.get(keys::DOMAIN_PERMISSIONS).await? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(GrantTable::new()),
        }
    }

    async fn save(&self, table: &GrantTable) -> Result<()> {
        self.store
            .set(keys::DOMAIN_PERMISSIONS, serde_json::to_value(table)?)
            .await
    }

    /// Stored decision for the triple, if any
    pub async fn decision(
        &self,
        origin: &str,
        address: &str,
        kind: PermissionKind,
    ) -> Result<Option<bool>> {
        let table = self.load().await?;
        Ok(table
            .get(origin)
            .and_then(|accounts| accounts.get(&normalize_address(address)))
            .and_then(|grants| grants.get(&kind))
            .copied())
    }

    pub async fn set_decision(
        &self,
        origin: &str,
        address: &str,
        kind: PermissionKind,
        allowed: bool,
    ) -> Result<()> {
        let mut table = self.load().await?;
        table
            .entry(origin.to_string())
            .or_default()
            .entry(normalize_address(address))
            .or_default()
            .insert(kind, allowed);
        self.save(&table).await
    }

    /// Whether `origin` is connected for `address`
    pub async fn is_domain_allowed(&self, origin: &str, address: &str) -> Result<bool> {
        Ok(self
            .decision(origin, address, PermissionKind::Connect)
            .await?
            .unwrap_or(false))
    }

    pub async fn add_domain(&self, origin: &str, address: &str) -> Result<()> {
        info!(origin = origin, address = address, "Connected domain");
        self.set_decision(origin, address, PermissionKind::Connect, true)
            .await
    }

    /// Drop every grant `origin` holds for `address`
    pub async fn remove_domain(&self, origin: &str, address: &str) -> Result<()> {
        let mut table = self.load().await?;
        let address = normalize_address(address);
        let Some(accounts) = table.get_mut(origin) else {
            return Ok(());
        };
        if accounts.remove(&address).is_none() {
            return Ok(());
        }
        if accounts.is_empty() {
            table.remove(origin);
        }
        info!(origin = origin, address = %address, "Disconnected domain");
        self.save(&table).await
    }

    /// Origins connected for `address`
    pub async fn connected_domains(&self, address: &str) -> Result<Vec<String>> {
        let address = normalize_address(address);
        let table = self.load().await?;
        Ok(table
            .into_iter()
            .filter(|(_, accounts)| {
                accounts
                    .get(&address)
                    .and_then(|grants| grants.get(&PermissionKind::Connect))
                    .copied()
                    .unwrap_or(false)
            })
            .map(|(origin, _)| origin)
            .collect())
    }

    /// Ask for `kind`, consulting a stored decision before prompting
    pub async fn request_permission(
        &self,
        origin: &str,
        address: &str,
        kind: PermissionKind,
        detail: Option<Value>,
    ) -> Result<bool> {
        if let Some(allowed) = self.decision(origin, address, kind).await? {
            debug!(
                origin = origin,
                kind = kind.name(),
                allowed = allowed,
                "Using stored permission decision"
            );
            return Ok(allowed);
        }

        let request = PermissionRequest::new(kind, origin, address, detail);
        let approved = self.prompter.prompt(&request).await?;
        info!(
            request_id = %request.id,
            origin = origin,
            kind = kind.name(),
            approved = approved,
            "Permission prompt answered"
        );
        Ok(approved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn permissions(prompter: StaticPrompter) -> (Permissions, Arc<StaticPrompter>) {
        let prompter = Arc::new(prompter);
        let store = Arc::new(MemoryStore::new());
        (Permissions::new(store, prompter.clone()), prompter)
    }

    #[test]
    fn kind_names_roundtrip() {
        for kind in PermissionKind::ALL {
            assert_eq!(PermissionKind::parse(kind.name()), Some(kind));
        }
        assert_eq!(PermissionKind::parse("transfer"), None);
    }

    #[tokio::test]
    async fn unknown_domain_is_not_allowed() {
        let (permissions, _) = permissions(StaticPrompter::deny_all());
        assert!(!permissions
            .is_domain_allowed("dapp.example", "0x1")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn add_and_remove_domain() {
        let (permissions, _) = permissions(StaticPrompter::deny_all());
        permissions.add_domain("dapp.example", "0x1").await.unwrap();
        permissions
            .set_decision("dapp.example", "0x1", PermissionKind::SignMessage, true)
            .await
            .unwrap();

        assert!(permissions
            .is_domain_allowed("dapp.example", "0x01")
            .await
            .unwrap());
        assert!(!permissions
            .is_domain_allowed("dapp.example", "0x2")
            .await
            .unwrap());
        assert_eq!(
            permissions.connected_domains("0x1").await.unwrap(),
            vec!["dapp.example".to_string()]
        );

        permissions
            .remove_domain("dapp.example", "0x1")
            .await
            .unwrap();
        assert!(!permissions
            .is_domain_allowed("dapp.example", "0x1")
            .await
            .unwrap());
        assert_eq!(
            permissions
                .decision("dapp.example", "0x1", PermissionKind::SignMessage)
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn stored_decision_skips_prompt() {
        let (permissions, prompter) = permissions(StaticPrompter::approve_all());
        permissions
            .set_decision("dapp.example", "0x1", PermissionKind::SignMessage, false)
            .await
            .unwrap();

        let allowed = permissions
            .request_permission("dapp.example", "0x1", PermissionKind::SignMessage, None)
            .await
            .unwrap();
        assert!(!allowed);
        assert_eq!(prompter.prompt_count(), 0);
    }

    #[tokio::test]
    async fn prompt_decides_without_stored_decision() {
        let (permissions, prompter) =
            permissions(StaticPrompter::approving([PermissionKind::Connect]));

        assert!(permissions
            .request_permission("dapp.example", "0x1", PermissionKind::Connect, None)
            .await
            .unwrap());
        assert!(!permissions
            .request_permission("dapp.example", "0x1", PermissionKind::SignTransaction, None)
            .await
            .unwrap());
        assert_eq!(prompter.prompt_count(), 2);
        // Prompt answers are not persisted
        assert_eq!(
            permissions
                .decision("dapp.example", "0x1", PermissionKind::Connect)
                .await
                .unwrap(),
            None
        );
    }
}
