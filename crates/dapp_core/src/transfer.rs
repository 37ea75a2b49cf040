//! Ether transfer with a bounded wait for confirmations.

use std::time::Duration;

use shared::{
    domain::to_decimal_string,
    error::BridgeError,
    protocol::{Receipt, TransferRequest},
};
use thiserror::Error;
use tracing::{debug, info, warn};
use wallet_bridge::{WalletProvider, WalletSigner};

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("failed to submit transfer: {0}")]
    Submit(#[source] BridgeError),
    #[error("failed waiting for confirmations: {0}")]
    Confirmation(#[source] BridgeError),
    #[error("no confirmation within {} ms", .timeout.as_millis())]
    TimedOut { timeout: Duration },
}

/// Sends Ether and waits for `confirmations` blocks. Failures are logged and
/// reported as `None`; nothing is rethrown to the caller.
pub async fn send_ether_transaction(
    signer: &dyn WalletSigner,
    provider: &dyn WalletProvider,
    request: TransferRequest,
    confirmations: u64,
    timeout: Duration,
) -> Option<Receipt> {
    match try_send_ether_transaction(signer, provider, request, confirmations, timeout).await {
        Ok(receipt) => {
            info!(
                hash = %receipt.transaction_hash,
                block = receipt.block_number,
                status = receipt.status,
                "transfer confirmed"
            );
            Some(receipt)
        }
        Err(err) => {
            warn!(error = %err, to = %request.to, "ether transfer failed");
            None
        }
    }
}

pub async fn try_send_ether_transaction(
    signer: &dyn WalletSigner,
    provider: &dyn WalletProvider,
    request: TransferRequest,
    confirmations: u64,
    timeout: Duration,
) -> Result<Receipt, TransferError> {
    debug!(
        to = %request.to,
        value = %to_decimal_string(request.value),
        "submitting ether transfer"
    );
    let pending = signer
        .submit_transfer(request)
        .await
        .map_err(TransferError::Submit)?;
    debug!(hash = %pending.hash, confirmations, "waiting for confirmations");

    match tokio::time::timeout(
        timeout,
        provider.await_confirmation(pending, confirmations, timeout),
    )
    .await
    {
        Ok(outcome) => outcome.map_err(TransferError::Confirmation),
        Err(_) => Err(TransferError::TimedOut { timeout }),
    }
}
