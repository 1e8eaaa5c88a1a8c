//! Error types for the wallet bridge
//!
//! `Error` covers everything that can go wrong inside the crate. Dapps only
//! ever see a `DappError`, whose kind is one of four fixed values.

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("No active account")]
    NoAccounts,

    #[error("Origin not authorized: {0}")]
    Unauthorized(String),

    #[error("Transaction failed: {0}")]
    TransactionFailure(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Node returned {status}: {message}")]
    Node { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transaction simulation failed: {0}")]
    Simulation(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// The error kinds surfaced to a calling dapp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DappErrorKind {
    NoAccounts,
    UserRejection,
    Unauthorized,
    TransactionFailure,
}

impl DappErrorKind {
    pub fn code(&self) -> i32 {
        match self {
            DappErrorKind::NoAccounts => 4000,
            DappErrorKind::UserRejection => 4001,
            DappErrorKind::Unauthorized => 4100,
            DappErrorKind::TransactionFailure => -30000,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DappErrorKind::NoAccounts => "No Accounts",
            DappErrorKind::UserRejection => "User Rejection",
            DappErrorKind::Unauthorized => "Unauthorized",
            DappErrorKind::TransactionFailure => "Transaction Failed",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            DappErrorKind::NoAccounts => "No accounts found",
            DappErrorKind::UserRejection => "The user rejected the request",
            DappErrorKind::Unauthorized => {
                "The requested method and/or account has not been authorized by the user."
            }
            DappErrorKind::TransactionFailure => "The transaction failed to submit",
        }
    }
}

/// Error returned by every public API method
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{} ({})", kind.message(), kind.code())]
pub struct DappError {
    pub kind: DappErrorKind,
    /// Underlying cause, kept for the audit trail
    pub detail: Option<String>,
}

impl DappError {
    pub fn new(kind: DappErrorKind) -> Self {
        Self { kind, detail: None }
    }

    pub fn with_detail(kind: DappErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: Some(detail.into()),
        }
    }

    pub fn no_accounts() -> Self {
        Self::new(DappErrorKind::NoAccounts)
    }

    pub fn unauthorized() -> Self {
        Self::new(DappErrorKind::Unauthorized)
    }

    pub fn user_rejection() -> Self {
        Self::new(DappErrorKind::UserRejection)
    }

    pub fn transaction_failure(detail: impl Into<String>) -> Self {
        Self::with_detail(DappErrorKind::TransactionFailure, detail)
    }
}
