//! Wire protocol between the browser extension and the wallet
//!
//! Requests name a dapp API method and carry its arguments as JSON. The
//! TypeScript bindings for these types are generated with ts-rs.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use ts_rs::TS;

use crate::api::{DappApi, SignMessageRequest};
use crate::client::EntryFunctionPayload;
use crate::error::DappError;

pub mod methods {
    pub const CONNECT: &str = "connect";
    pub const DISCONNECT: &str = "disconnect";
    pub const IS_CONNECTED: &str = "isConnected";
    pub const ACCOUNT: &str = "account";
    pub const NETWORK: &str = "network";
    pub const SIGN_TRANSACTION: &str = "signTransaction";
    pub const SIGN_AND_SUBMIT_TRANSACTION: &str = "signAndSubmitTransaction";
    pub const SIGN_MESSAGE: &str = "signMessage";

    pub const ALL: [&str; 8] = [
        CONNECT,
        DISCONNECT,
        IS_CONNECTED,
        ACCOUNT,
        NETWORK,
        SIGN_TRANSACTION,
        SIGN_AND_SUBMIT_TRANSACTION,
        SIGN_MESSAGE,
    ];
}

pub const UNSUPPORTED_METHOD_CODE: i32 = 4200;
pub const INVALID_PARAMS_CODE: i32 = 4300;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DappRequest {
    pub id: String,
    pub method: String,
    #[serde(default)]
    #[ts(type = "any")]
    pub args: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DappErrorBody {
    pub code: i32,
    pub name: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DappResponse {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(type = "any")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub error: Option<DappErrorBody>,
}

/// Why a request produced no result
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    #[error("Unsupported Method: {0}")]
    UnsupportedMethod(String),

    #[error("Invalid Params: {0}")]
    InvalidParams(String),

    #[error(transparent)]
    Dapp(#[from] DappError),
}

impl BridgeError {
    pub fn code(&self) -> i32 {
        match self {
            Self::UnsupportedMethod(_) => UNSUPPORTED_METHOD_CODE,
            Self::InvalidParams(_) => INVALID_PARAMS_CODE,
            Self::Dapp(e) => e.kind.code(),
        }
    }

    /// Body sent back to the dapp; never includes the underlying cause
    pub fn body(&self) -> DappErrorBody {
        match self {
            Self::UnsupportedMethod(_) => DappErrorBody {
                code: UNSUPPORTED_METHOD_CODE,
                name: "UnsupportedMethod".to_string(),
                message: "Unsupported Method".to_string(),
            },
            Self::InvalidParams(_) => DappErrorBody {
                code: INVALID_PARAMS_CODE,
                name: "InvalidParams".to_string(),
                message: "Invalid Params".to_string(),
            },
            Self::Dapp(e) => DappErrorBody {
                code: e.kind.code(),
                name: e.kind.name().to_string(),
                message: e.kind.message().to_string(),
            },
        }
    }

    /// Full description for logs and the audit trail
    pub fn detail(&self) -> String {
        match self {
            Self::Dapp(e) => match &e.detail {
                Some(detail) => format!("{}: {}", e, detail),
                None => e.to_string(),
            },
            other => other.to_string(),
        }
    }
}

impl DappResponse {
    pub fn from_result(id: impl Into<String>, result: Result<Value, BridgeError>) -> Self {
        let id = id.into();
        match result {
            Ok(value) => Self {
                id,
                result: Some(value),
                error: None,
            },
            Err(e) => Self {
                id,
                result: None,
                error: Some(e.body()),
            },
        }
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(args: &Value) -> Result<T, BridgeError> {
    serde_json::from_value(args.clone()).map_err(|e| BridgeError::InvalidParams(e.to_string()))
}

fn to_result<T: Serialize>(value: T) -> Result<Value, BridgeError> {
    serde_json::to_value(value)
        .map_err(|e| BridgeError::Dapp(DappError::transaction_failure(e.to_string())))
}

/// Run one method against the API
pub async fn handle(api: &DappApi, method: &str, args: &Value) -> Result<Value, BridgeError> {
    debug!(method = method, "Dispatching dapp request");
    match method {
        methods::CONNECT => to_result(api.connect().await?),
        methods::DISCONNECT => {
            api.disconnect().await?;
            Ok(Value::Null)
        }
        methods::IS_CONNECTED => to_result(api.is_connected().await?),
        methods::ACCOUNT => to_result(api.account().await?),
        methods::NETWORK => to_result(api.network().await?),
        methods::SIGN_TRANSACTION => {
            let payload: EntryFunctionPayload = parse_args(args)?;
            to_result(api.sign_transaction(payload).await?)
        }
        methods::SIGN_AND_SUBMIT_TRANSACTION => {
            let payload: EntryFunctionPayload = parse_args(args)?;
            to_result(api.sign_and_submit_transaction(payload).await?)
        }
        methods::SIGN_MESSAGE => {
            let request: SignMessageRequest = parse_args(args)?;
            to_result(api.sign_message(request).await?)
        }
        other => Err(BridgeError::UnsupportedMethod(other.to_string())),
    }
}

pub async fn dispatch(api: &DappApi, request: &DappRequest) -> DappResponse {
    let result = handle(api, &request.method, &request.args).await;
    DappResponse::from_result(request.id.clone(), result)
}
