//! Wallet bridge that speaks EIP-1193 shaped JSON-RPC over HTTP.
//!
//! A configured endpoint stands in for the injected wallet object: account
//! access, chain queries and `eth_sendTransaction` all go to the same node,
//! which is expected to hold the keys (a local dev node or a wallet daemon).

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use shared::{
    domain::{Address, NetworkInfo, B256, U256, U64},
    error::BridgeError,
    protocol::{
        JsonRpcRequest, JsonRpcResponse, PendingTransfer, Receipt, RpcMethod, RpcReceipt,
        TransactionObject, TransferRequest,
    },
};
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};
use url::Url;
use wallet_bridge::{WalletBridge, WalletEnvironment, WalletProvider, WalletSigner};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(4);

pub struct JsonRpcClient {
    http: Client,
    endpoint: Url,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(endpoint: Url, request_timeout: Duration) -> Result<Self, BridgeError> {
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(request_timeout)
            .build()
            .map_err(|err| BridgeError::Transport(format!("failed to build http client: {err}")))?;
        Ok(Self {
            http,
            endpoint,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub async fn call<T: DeserializeOwned>(
        &self,
        method: RpcMethod,
        params: Value,
    ) -> Result<T, BridgeError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        debug!(method = method.as_str(), id, prompts = method.may_prompt(), "json-rpc call");

        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&JsonRpcRequest::new(id, method, params))
            .send()
            .await
            .map_err(|err| BridgeError::Transport(format!("{} failed: {err}", method.as_str())))?;

        let status = response.status();
        let body: JsonRpcResponse = match response.json().await {
            Ok(body) => body,
            Err(err) if status.is_success() => {
                return Err(BridgeError::MalformedResponse(format!(
                    "{}: {err}",
                    method.as_str()
                )))
            }
            Err(_) => {
                return Err(BridgeError::Transport(format!(
                    "{} returned {status}",
                    method.as_str()
                )))
            }
        };

        if let Some(error) = body.error {
            return Err(BridgeError::from_rpc(error.code, error.message));
        }
        serde_json::from_value(body.result)
            .map_err(|err| BridgeError::MalformedResponse(format!("{}: {err}", method.as_str())))
    }
}

pub struct JsonRpcWalletBridge {
    client: Arc<JsonRpcClient>,
    poll_interval: Duration,
}

impl JsonRpcWalletBridge {
    pub fn new(client: JsonRpcClient, poll_interval: Duration) -> Self {
        Self {
            client: Arc::new(client),
            poll_interval,
        }
    }
}

#[async_trait]
impl WalletBridge for JsonRpcWalletBridge {
    async fn list_authorized_accounts(&self) -> Result<Vec<Address>, BridgeError> {
        self.client.call(RpcMethod::Accounts, json!([])).await
    }

    async fn request_account_access(&self) -> Result<Vec<Address>, BridgeError> {
        self.client.call(RpcMethod::RequestAccounts, json!([])).await
    }

    fn create_provider(&self) -> Result<Arc<dyn WalletProvider>, BridgeError> {
        Ok(Arc::new(JsonRpcProvider {
            client: Arc::clone(&self.client),
            poll_interval: self.poll_interval,
        }))
    }
}

pub struct JsonRpcProvider {
    client: Arc<JsonRpcClient>,
    poll_interval: Duration,
}

impl JsonRpcProvider {
    async fn head(&self) -> Result<u64, BridgeError> {
        let head: U64 = self.client.call(RpcMethod::BlockNumber, json!([])).await?;
        Ok(head.to::<u64>())
    }

    async fn receipt(&self, hash: B256) -> Result<Option<Receipt>, BridgeError> {
        let raw: Option<RpcReceipt> = self
            .client
            .call(RpcMethod::GetTransactionReceipt, json!([hash]))
            .await?;
        Ok(raw.and_then(RpcReceipt::into_receipt))
    }

    async fn is_known(&self, hash: B256) -> Result<bool, BridgeError> {
        let transaction: Option<Value> = self
            .client
            .call(RpcMethod::GetTransactionByHash, json!([hash]))
            .await?;
        Ok(transaction.is_some())
    }

    async fn poll_confirmations(
        &self,
        hash: B256,
        confirmations: u64,
    ) -> Result<Receipt, BridgeError> {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut mined = false;

        loop {
            ticker.tick().await;
            match self.receipt(hash).await? {
                Some(receipt) => {
                    mined = true;
                    let depth = receipt.confirmations_at(self.head().await?);
                    if depth >= confirmations.max(1) {
                        return Ok(receipt);
                    }
                    debug!(%hash, depth, confirmations, "waiting for more blocks");
                }
                None if mined => {
                    warn!(%hash, "receipt disappeared; transaction reorged out");
                    return Err(BridgeError::TransactionDropped { hash });
                }
                None => {
                    if !self.is_known(hash).await? {
                        return Err(BridgeError::TransactionDropped { hash });
                    }
                    debug!(%hash, "transaction pending");
                }
            }
        }
    }
}

#[async_trait]
impl WalletProvider for JsonRpcProvider {
    fn create_signer(&self) -> Result<Arc<dyn WalletSigner>, BridgeError> {
        Ok(Arc::new(JsonRpcSigner {
            client: Arc::clone(&self.client),
        }))
    }

    async fn get_network(&self) -> Result<NetworkInfo, BridgeError> {
        let chain_id: U64 = self.client.call(RpcMethod::ChainId, json!([])).await?;
        Ok(NetworkInfo::from_chain_id(chain_id.to::<u64>()))
    }

    async fn get_balance(&self, account: Address) -> Result<U256, BridgeError> {
        self.client
            .call(RpcMethod::GetBalance, json!([account, "latest"]))
            .await
    }

    async fn await_confirmation(
        &self,
        transfer: PendingTransfer,
        confirmations: u64,
        timeout: Duration,
    ) -> Result<Receipt, BridgeError> {
        tokio::time::timeout(timeout, self.poll_confirmations(transfer.hash, confirmations))
            .await
            .map_err(|_| BridgeError::ConfirmationTimeout {
                hash: transfer.hash,
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            })?
    }
}

/// Signs with the node's first authorized account.
pub struct JsonRpcSigner {
    client: Arc<JsonRpcClient>,
}

#[async_trait]
impl WalletSigner for JsonRpcSigner {
    async fn submit_transfer(
        &self,
        request: TransferRequest,
    ) -> Result<PendingTransfer, BridgeError> {
        let accounts: Vec<Address> = self.client.call(RpcMethod::Accounts, json!([])).await?;
        let from = accounts
            .first()
            .copied()
            .ok_or(BridgeError::NoAuthorizedAccount)?;
        let transaction = serde_json::to_value(TransactionObject {
            from,
            to: request.to,
            value: request.value,
        })
        .map_err(|err| BridgeError::MalformedResponse(err.to_string()))?;

        let hash: B256 = self
            .client
            .call(RpcMethod::SendTransaction, Value::Array(vec![transaction]))
            .await?;
        debug!(%hash, %from, "transaction submitted");
        Ok(PendingTransfer { hash })
    }
}

/// Detection boundary for the JSON-RPC bridge: an endpoint means a wallet.
#[derive(Debug, Clone)]
pub struct JsonRpcEnvironment {
    endpoint: Option<Url>,
    request_timeout: Duration,
    poll_interval: Duration,
}

impl JsonRpcEnvironment {
    pub fn new(endpoint: Option<Url>) -> Self {
        Self {
            endpoint,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn endpoint(&self) -> Option<&Url> {
        self.endpoint.as_ref()
    }
}

impl WalletEnvironment for JsonRpcEnvironment {
    fn detect_wallet(&self) -> Option<Arc<dyn WalletBridge>> {
        let endpoint = self.endpoint.clone()?;
        match JsonRpcClient::new(endpoint, self.request_timeout) {
            Ok(client) => Some(Arc::new(JsonRpcWalletBridge::new(
                client,
                self.poll_interval,
            ))),
            Err(err) => {
                warn!(error = %err, "wallet endpoint configured but unusable");
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/rpc_bridge_tests.rs"]
mod tests;
