//! Message signing payloads
//!
//! Dapps either pass a bare string (signed as-is) or a structured request
//! whose signed text is assembled by the wallet:
//!
//! ```text
//! APTOS
//! address: 0x…        (if requested)
//! application: …      (if requested)
//! chainId: …          (if requested)
//! message: …
//! nonce: …
//! ```

use serde::{Deserialize, Serialize};

pub const MESSAGE_PREFIX: &str = "APTOS";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SignMessageRequest {
    Plain(String),
    Structured(SignMessagePayload),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignMessagePayload {
    pub message: String,
    pub nonce: String,
    /// Include the signer's address in the signed text
    #[serde(default)]
    pub address: bool,
    /// Include the requesting application's origin
    #[serde(default)]
    pub application: bool,
    /// Include the active chain id
    #[serde(default)]
    pub chain_id: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignMessageResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u8>,
    pub full_message: String,
    pub message: String,
    pub nonce: String,
    pub prefix: String,
    pub signature: String,
}

/// Result of `signMessage`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SignedMessage {
    /// Hex signature of a plain string
    Signature(String),
    Structured(SignMessageResponse),
}

/// Values the wallet fills into a structured message
pub struct MessageContext<'a> {
    pub address: &'a str,
    pub application: &'a str,
    pub chain_id: Option<u8>,
}

impl SignMessagePayload {
    /// Assemble the text that gets signed
    pub fn full_message(&self, ctx: &MessageContext<'_>) -> String {
        let mut text = format!("{}\n", MESSAGE_PREFIX);
        if self.address {
            text.push_str(&format!("address: {}\n", ctx.address));
        }
        if self.application {
            text.push_str(&format!("application: {}\n", ctx.application));
        }
        if self.chain_id {
            if let Some(chain_id) = ctx.chain_id {
                text.push_str(&format!("chainId: {}\n", chain_id));
            }
        }
        text.push_str(&format!("message: {}\nnonce: {}", self.message, self.nonce));
        text
    }

    pub fn response(&self, ctx: &MessageContext<'_>, signature: String) -> SignMessageResponse {
        SignMessageResponse {
            address: self.address.then(|| ctx.address.to_string()),
            application: self.application.then(|| ctx.application.to_string()),
            chain_id: if self.chain_id { ctx.chain_id } else { None },
            full_message: self.full_message(ctx),
            message: self.message.clone(),
            nonce: self.nonce.clone(),
            prefix: MESSAGE_PREFIX.to_string(),
            signature,
        }
    }
}
