use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::Notify;
use shared::{
    domain::{Address, NetworkInfo, B256, U256},
    error::BridgeError,
    protocol::{PendingTransfer, Receipt, TransferRequest},
};
use wallet_bridge::{
    StaticEnvironment, WalletBridge, WalletEnvironment, WalletProvider, WalletSigner,
};

pub(crate) const ALICE: Address = Address::new([0xab; 20]);
pub(crate) const BOB: Address = Address::new([0xb0; 20]);

pub(crate) fn ether(value: &str) -> U256 {
    shared::domain::from_decimal_string(value).expect("valid ether")
}

#[derive(Clone, Copy)]
pub(crate) enum Confirmation {
    Mined,
    Hang,
    Fail,
}

struct MockState {
    authorized: Vec<Address>,
    granted: Option<Vec<Address>>,
    provider_fails: bool,
    network: Option<NetworkInfo>,
    balance: Option<U256>,
    balances_by_account: Vec<(Address, U256)>,
    balance_gate: Mutex<Option<Arc<Notify>>>,
    confirmation: Confirmation,
    list_calls: AtomicUsize,
    request_calls: AtomicUsize,
    provider_calls: AtomicUsize,
    signer_calls: AtomicUsize,
    balance_calls: AtomicUsize,
    balance_accounts: Mutex<Vec<Address>>,
    submitted: Mutex<Vec<TransferRequest>>,
}

/// Wallet double that records how it was driven.
#[derive(Clone)]
pub(crate) struct MockWallet {
    state: Arc<MockState>,
}

impl MockWallet {
    pub(crate) fn new() -> Self {
        Self {
            state: Arc::new(MockState {
                authorized: Vec::new(),
                granted: Some(vec![ALICE]),
                provider_fails: false,
                network: Some(NetworkInfo::new("mainnet", 1)),
                balance: Some(ether("2.5")),
                balances_by_account: Vec::new(),
                balance_gate: Mutex::new(None),
                confirmation: Confirmation::Mined,
                list_calls: AtomicUsize::new(0),
                request_calls: AtomicUsize::new(0),
                provider_calls: AtomicUsize::new(0),
                signer_calls: AtomicUsize::new(0),
                balance_calls: AtomicUsize::new(0),
                balance_accounts: Mutex::new(Vec::new()),
                submitted: Mutex::new(Vec::new()),
            }),
        }
    }

    fn edit(mut self, f: impl FnOnce(&mut MockState)) -> Self {
        f(Arc::get_mut(&mut self.state).expect("configure before sharing"));
        self
    }

    pub(crate) fn with_authorized(self, accounts: Vec<Address>) -> Self {
        self.edit(|state| state.authorized = accounts)
    }

    pub(crate) fn granting(self, accounts: Vec<Address>) -> Self {
        self.edit(|state| state.granted = Some(accounts))
    }

    pub(crate) fn rejecting(self) -> Self {
        self.edit(|state| state.granted = None)
    }

    pub(crate) fn with_failing_provider(self) -> Self {
        self.edit(|state| state.provider_fails = true)
    }

    pub(crate) fn with_failing_network(self) -> Self {
        self.edit(|state| state.network = None)
    }

    pub(crate) fn with_failing_balance(self) -> Self {
        self.edit(|state| state.balance = None)
    }

    pub(crate) fn with_balance(self, balance: U256) -> Self {
        self.edit(|state| state.balance = Some(balance))
    }

    pub(crate) fn with_balance_for(self, account: Address, balance: U256) -> Self {
        self.edit(|state| state.balances_by_account.push((account, balance)))
    }

    /// The first balance lookup waits until `gate` is notified.
    pub(crate) fn with_balance_gate(self, gate: Arc<Notify>) -> Self {
        self.edit(|state| state.balance_gate = Mutex::new(Some(gate)))
    }

    pub(crate) fn with_confirmation(self, confirmation: Confirmation) -> Self {
        self.edit(|state| state.confirmation = confirmation)
    }

    pub(crate) fn environment(&self) -> Arc<dyn WalletEnvironment> {
        Arc::new(StaticEnvironment::new(Arc::new(self.clone())))
    }

    pub(crate) fn list_calls(&self) -> usize {
        self.state.list_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn request_calls(&self) -> usize {
        self.state.request_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn provider_calls(&self) -> usize {
        self.state.provider_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn signer_calls(&self) -> usize {
        self.state.signer_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn balance_calls(&self) -> usize {
        self.state.balance_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn balance_accounts(&self) -> Vec<Address> {
        self.state.balance_accounts.lock().expect("accounts").clone()
    }

    pub(crate) fn submitted(&self) -> Vec<TransferRequest> {
        self.state.submitted.lock().expect("submitted").clone()
    }
}

#[async_trait]
impl WalletBridge for MockWallet {
    async fn list_authorized_accounts(&self) -> Result<Vec<Address>, BridgeError> {
        self.state.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.state.authorized.clone())
    }

    async fn request_account_access(&self) -> Result<Vec<Address>, BridgeError> {
        self.state.request_calls.fetch_add(1, Ordering::SeqCst);
        self.state
            .granted
            .clone()
            .ok_or_else(|| BridgeError::from_rpc(4001, "User rejected the request."))
    }

    fn create_provider(&self) -> Result<Arc<dyn WalletProvider>, BridgeError> {
        self.state.provider_calls.fetch_add(1, Ordering::SeqCst);
        if self.state.provider_fails {
            return Err(BridgeError::Transport("provider unavailable".into()));
        }
        Ok(Arc::new(self.clone()))
    }
}

#[async_trait]
impl WalletProvider for MockWallet {
    fn create_signer(&self) -> Result<Arc<dyn WalletSigner>, BridgeError> {
        self.state.signer_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(self.clone()))
    }

    async fn get_network(&self) -> Result<NetworkInfo, BridgeError> {
        self.state
            .network
            .clone()
            .ok_or_else(|| BridgeError::from_rpc(4901, "chain disconnected"))
    }

    async fn get_balance(&self, account: Address) -> Result<U256, BridgeError> {
        self.state.balance_calls.fetch_add(1, Ordering::SeqCst);
        self.state
            .balance_accounts
            .lock()
            .expect("accounts")
            .push(account);
        let gate = self.state.balance_gate.lock().expect("gate").take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.state
            .balances_by_account
            .iter()
            .find(|(owner, _)| *owner == account)
            .map(|(_, balance)| *balance)
            .or(self.state.balance)
            .ok_or_else(|| BridgeError::MalformedResponse("balance".into()))
    }

    async fn await_confirmation(
        &self,
        transfer: PendingTransfer,
        _confirmations: u64,
        timeout: Duration,
    ) -> Result<Receipt, BridgeError> {
        match self.state.confirmation {
            Confirmation::Mined => Ok(Receipt {
                transaction_hash: transfer.hash,
                block_number: 42,
                from: ALICE,
                to: self.submitted().last().map(|request| request.to),
                gas_used: 21_000,
                status: true,
            }),
            Confirmation::Hang => std::future::pending().await,
            Confirmation::Fail => Err(BridgeError::ConfirmationTimeout {
                hash: transfer.hash,
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }
}

#[async_trait]
impl WalletSigner for MockWallet {
    async fn submit_transfer(
        &self,
        request: TransferRequest,
    ) -> Result<PendingTransfer, BridgeError> {
        self.state
            .submitted
            .lock()
            .expect("submitted")
            .push(request);
        Ok(PendingTransfer {
            hash: B256::repeat_byte(0x77),
        })
    }
}
