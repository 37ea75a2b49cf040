use std::fmt;

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// EIP-1193 provider error codes that change how a failure is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorCode {
    UserRejected,
    Unauthorized,
    UnsupportedMethod,
    Disconnected,
    ChainDisconnected,
    Other(i64),
}

impl ProviderErrorCode {
    pub fn from_code(code: i64) -> Self {
        match code {
            4001 => Self::UserRejected,
            4100 => Self::Unauthorized,
            4200 => Self::UnsupportedMethod,
            4900 => Self::Disconnected,
            4901 => Self::ChainDisconnected,
            other => Self::Other(other),
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Self::UserRejected => 4001,
            Self::Unauthorized => 4100,
            Self::UnsupportedMethod => 4200,
            Self::Disconnected => 4900,
            Self::ChainDisconnected => 4901,
            Self::Other(code) => code,
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("user rejected the request: {message}")]
    UserRejected { message: String },
    #[error("wallet rpc error {code}: {message}")]
    Rpc {
        code: ProviderErrorCode,
        message: String,
    },
    #[error("wallet transport failure: {0}")]
    Transport(String),
    #[error("malformed wallet response: {0}")]
    MalformedResponse(String),
    #[error("wallet has no authorized account")]
    NoAuthorizedAccount,
    #[error("transaction {hash} not confirmed within {timeout_ms} ms")]
    ConfirmationTimeout { hash: B256, timeout_ms: u64 },
    #[error("transaction {hash} was dropped or replaced")]
    TransactionDropped { hash: B256 },
}

impl BridgeError {
    pub fn from_rpc(code: i64, message: impl Into<String>) -> Self {
        let message = message.into();
        match ProviderErrorCode::from_code(code) {
            ProviderErrorCode::UserRejected => Self::UserRejected { message },
            code => Self::Rpc { code, message },
        }
    }

    pub fn is_user_rejection(&self) -> bool {
        matches!(self, Self::UserRejected { .. })
    }
}
