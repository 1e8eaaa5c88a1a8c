//! Signing and transaction plumbing
//!
//! This module handles private key use and the generate/sign/submit sequence.
//! Private keys NEVER leave `LocalSigner` and are NEVER handed to a dapp.

mod signer;
mod simulator;
mod transaction;

pub use signer::LocalSigner;
pub use simulator::{SimulationResult, TransactionSimulator};
pub use transaction::TransactionBuilder;
