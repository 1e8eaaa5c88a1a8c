//! Aptos dapp wallet bridge
//!
//! The wallet side of the dapp provider API:
//! - Tracks the active account and network
//! - Grants and revokes per-domain permissions
//! - Signs and submits transactions and messages on behalf of connected dapps
//! - Transfers the native coin with cached balance queries
//!
//! # Security Model
//!
//! - A dapp sees nothing until its domain has been connected by the user
//! - Every signing request is approved by the user unless a decision is stored
//! - Private keys live only in the in-memory session and never reach a dapp
//! - Every dapp request is written to an audit trail

pub mod accounts;
pub mod api;
pub mod audit;
pub mod bridge;
pub mod client;
pub mod config;
pub mod context;
pub mod origin;
pub mod permissions;
pub mod runner;
pub mod storage;
pub mod transfer;
pub mod wallet;

mod error;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use api::DappApi;
pub use config::{Config, Network, NetworkConfig, PRIVATE_KEY_ENV};
pub use context::WalletContext;
pub use error::{DappError, DappErrorKind, Error, Result};
pub use runner::BridgeRunner;
