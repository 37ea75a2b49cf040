use alloy_primitives::{Address, B256, U256, U64};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcMethod {
    Accounts,
    RequestAccounts,
    ChainId,
    GetBalance,
    SendTransaction,
    GetTransactionReceipt,
    GetTransactionByHash,
    BlockNumber,
}

impl RpcMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accounts => "eth_accounts",
            Self::RequestAccounts => "eth_requestAccounts",
            Self::ChainId => "eth_chainId",
            Self::GetBalance => "eth_getBalance",
            Self::SendTransaction => "eth_sendTransaction",
            Self::GetTransactionReceipt => "eth_getTransactionReceipt",
            Self::GetTransactionByHash => "eth_getTransactionByHash",
            Self::BlockNumber => "eth_blockNumber",
        }
    }

    /// Whether the wallet may show a permission prompt for this call.
    pub fn may_prompt(&self) -> bool {
        matches!(self, Self::RequestAccounts | Self::SendTransaction)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'static str,
    pub params: Value,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: RpcMethod, params: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method: method.as_str(),
            params,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub error: Option<JsonRpcErrorObject>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
}

/// Plain Ether transfer as submitted by the donate screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferRequest {
    pub to: Address,
    pub value: U256,
}

/// `eth_sendTransaction` parameter object.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionObject {
    pub from: Address,
    pub to: Address,
    pub value: U256,
}

/// Handle for a submitted transaction that has not been confirmed yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PendingTransfer {
    pub hash: B256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub transaction_hash: B256,
    pub block_number: u64,
    pub from: Address,
    pub to: Option<Address>,
    pub gas_used: u64,
    pub status: bool,
}

impl Receipt {
    pub fn confirmations_at(&self, head: u64) -> u64 {
        head.saturating_add(1).saturating_sub(self.block_number)
    }
}

/// Receipt as returned by `eth_getTransactionReceipt`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcReceipt {
    pub transaction_hash: B256,
    #[serde(default)]
    pub block_number: Option<U64>,
    pub from: Address,
    #[serde(default)]
    pub to: Option<Address>,
    #[serde(default)]
    pub gas_used: Option<U64>,
    #[serde(default)]
    pub status: Option<U64>,
}

impl RpcReceipt {
    /// `None` while the transaction is still pending.
    pub fn into_receipt(self) -> Option<Receipt> {
        let block_number = self.block_number?.to::<u64>();
        Some(Receipt {
            transaction_hash: self.transaction_hash,
            block_number,
            from: self.from,
            to: self.to,
            gas_used: self.gas_used.map(|gas| gas.to::<u64>()).unwrap_or_default(),
            status: self.status.map(|status| status == U64::from(1)).unwrap_or(true),
        })
    }
}
