//! Seams to the injected wallet: detection, account access, read-only chain
//! queries and transaction signing.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use shared::{
    domain::{Address, NetworkInfo, U256},
    error::BridgeError,
    protocol::{PendingTransfer, Receipt, TransferRequest},
};

/// Where a screen looks for a wallet when it mounts.
pub trait WalletEnvironment: Send + Sync {
    fn detect_wallet(&self) -> Option<Arc<dyn WalletBridge>>;
}

#[async_trait]
pub trait WalletBridge: Send + Sync {
    /// Accounts the user already authorized. Never prompts.
    async fn list_authorized_accounts(&self) -> Result<Vec<Address>, BridgeError>;
    /// Asks the user for account access; may prompt and may be rejected.
    async fn request_account_access(&self) -> Result<Vec<Address>, BridgeError>;
    fn create_provider(&self) -> Result<Arc<dyn WalletProvider>, BridgeError>;
}

#[async_trait]
pub trait WalletProvider: Send + Sync {
    fn create_signer(&self) -> Result<Arc<dyn WalletSigner>, BridgeError>;
    async fn get_network(&self) -> Result<NetworkInfo, BridgeError>;
    /// Balance in wei.
    async fn get_balance(&self, account: Address) -> Result<U256, BridgeError>;
    async fn await_confirmation(
        &self,
        transfer: PendingTransfer,
        confirmations: u64,
        timeout: Duration,
    ) -> Result<Receipt, BridgeError>;
}

#[async_trait]
pub trait WalletSigner: Send + Sync {
    async fn submit_transfer(
        &self,
        request: TransferRequest,
    ) -> Result<PendingTransfer, BridgeError>;
}

/// Environment without any injected wallet.
pub struct AbsentEnvironment;

impl WalletEnvironment for AbsentEnvironment {
    fn detect_wallet(&self) -> Option<Arc<dyn WalletBridge>> {
        None
    }
}

/// Environment that always hands out the same bridge.
pub struct StaticEnvironment {
    bridge: Arc<dyn WalletBridge>,
}

impl StaticEnvironment {
    pub fn new(bridge: Arc<dyn WalletBridge>) -> Self {
        Self { bridge }
    }
}

impl WalletEnvironment for StaticEnvironment {
    fn detect_wallet(&self) -> Option<Arc<dyn WalletBridge>> {
        Some(Arc::clone(&self.bridge))
    }
}

impl<T> WalletEnvironment for Option<T>
where
    T: WalletEnvironment,
{
    fn detect_wallet(&self) -> Option<Arc<dyn WalletBridge>> {
        self.as_ref().and_then(|env| env.detect_wallet())
    }
}
