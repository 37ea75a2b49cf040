//! Per-screen stores. Every action sets exactly one field; ordering between
//! fields is the orchestrator's job, not the store's.

use std::{fmt, marker::PhantomData, sync::Arc};

use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::domain::{
    from_decimal_string, Address, DonationAmount, NetworkInfo, DEFAULT_DONATION_RECIPIENT, U256,
};
use thiserror::Error;
use tracing::debug;
use wallet_bridge::{WalletProvider, WalletSigner};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("unhandled action {0}")]
    UnknownAction(String),
    #[error("invalid payload for {action}: {reason}")]
    InvalidPayload { action: String, reason: String },
}

pub trait StoreAction: Sized {
    type State: Clone;

    const STORE: &'static str;

    fn name(&self) -> &'static str;
    fn from_named(name: &str, payload: Value) -> Result<Self, StoreError>;
    fn reduce(state: &Self::State, action: Self) -> Self::State;
}

pub struct Store<A: StoreAction> {
    state: A::State,
    _action: PhantomData<fn(A)>,
}

pub type ConnectionStore = Store<ConnectionAction>;
pub type IntentStore = Store<IntentAction>;

impl<A: StoreAction> Store<A> {
    pub fn new(state: A::State) -> Self {
        Self {
            state,
            _action: PhantomData,
        }
    }

    pub fn state(&self) -> &A::State {
        &self.state
    }

    pub fn dispatch(&mut self, action: A) {
        debug!(store = A::STORE, action = action.name(), "dispatch");
        self.state = A::reduce(&self.state, action);
    }

    /// Dispatches an action addressed by its snake_case name.
    pub fn dispatch_named(&mut self, name: &str, payload: Value) -> Result<(), StoreError> {
        let action = A::from_named(name, payload)?;
        self.dispatch(action);
        Ok(())
    }
}

fn decode<T: DeserializeOwned>(action: &str, payload: Value) -> Result<T, StoreError> {
    serde_json::from_value(payload).map_err(|err| StoreError::InvalidPayload {
        action: action.to_string(),
        reason: err.to_string(),
    })
}

#[derive(Clone)]
pub struct ConnectionState {
    pub wallet_available: bool,
    pub connected: bool,
    pub account: Address,
    pub provider: Option<Arc<dyn WalletProvider>>,
    pub signer: Option<Arc<dyn WalletSigner>>,
    pub network: Option<NetworkInfo>,
    pub balance: String,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self {
            wallet_available: false,
            connected: false,
            account: Address::ZERO,
            provider: None,
            signer: None,
            network: None,
            balance: "0".to_string(),
        }
    }
}

impl ConnectionState {
    /// Network and balance only mean something once this holds.
    pub fn has_account(&self) -> bool {
        self.connected && self.account != Address::ZERO
    }

    pub fn balance_wei(&self) -> U256 {
        from_decimal_string(&self.balance).unwrap_or_default()
    }
}

impl fmt::Debug for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionState")
            .field("wallet_available", &self.wallet_available)
            .field("connected", &self.connected)
            .field("account", &self.account)
            .field("provider", &self.provider.is_some())
            .field("signer", &self.signer.is_some())
            .field("network", &self.network)
            .field("balance", &self.balance)
            .finish()
    }
}

#[derive(Clone)]
pub enum ConnectionAction {
    SetWalletAvailable(bool),
    SetConnected(bool),
    SetAccount(Address),
    SetProvider(Option<Arc<dyn WalletProvider>>),
    SetSigner(Option<Arc<dyn WalletSigner>>),
    SetNetwork(Option<NetworkInfo>),
    SetBalance(String),
}

impl fmt::Debug for ConnectionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetWalletAvailable(v) => f.debug_tuple("SetWalletAvailable").field(v).finish(),
            Self::SetConnected(v) => f.debug_tuple("SetConnected").field(v).finish(),
            Self::SetAccount(v) => f.debug_tuple("SetAccount").field(v).finish(),
            Self::SetProvider(v) => f.debug_tuple("SetProvider").field(&v.is_some()).finish(),
            Self::SetSigner(v) => f.debug_tuple("SetSigner").field(&v.is_some()).finish(),
            Self::SetNetwork(v) => f.debug_tuple("SetNetwork").field(v).finish(),
            Self::SetBalance(v) => f.debug_tuple("SetBalance").field(v).finish(),
        }
    }
}

impl StoreAction for ConnectionAction {
    type State = ConnectionState;

    const STORE: &'static str = "connection";

    fn name(&self) -> &'static str {
        match self {
            Self::SetWalletAvailable(_) => "set_wallet_available",
            Self::SetConnected(_) => "set_connected",
            Self::SetAccount(_) => "set_account",
            Self::SetProvider(_) => "set_provider",
            Self::SetSigner(_) => "set_signer",
            Self::SetNetwork(_) => "set_network",
            Self::SetBalance(_) => "set_balance",
        }
    }

    /// Provider and signer handles belong to the orchestrator and have no name.
    fn from_named(name: &str, payload: Value) -> Result<Self, StoreError> {
        Ok(match name {
            "set_wallet_available" => Self::SetWalletAvailable(decode(name, payload)?),
            "set_connected" => Self::SetConnected(decode(name, payload)?),
            "set_account" => Self::SetAccount(decode(name, payload)?),
            "set_network" => Self::SetNetwork(decode(name, payload)?),
            "set_balance" => Self::SetBalance(decode(name, payload)?),
            other => return Err(StoreError::UnknownAction(other.to_string())),
        })
    }

    fn reduce(state: &ConnectionState, action: Self) -> ConnectionState {
        let mut next = state.clone();
        match action {
            Self::SetWalletAvailable(v) => next.wallet_available = v,
            Self::SetConnected(v) => next.connected = v,
            Self::SetAccount(v) => next.account = v,
            Self::SetProvider(v) => next.provider = v,
            Self::SetSigner(v) => next.signer = v,
            Self::SetNetwork(v) => next.network = v,
            Self::SetBalance(v) => next.balance = v,
        }
        next
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenIntent {
    pub is_connecting: bool,
    pub donate_amount: DonationAmount,
    /// Fixed for the lifetime of the screen.
    pub recipient: Address,
}

impl ScreenIntent {
    pub fn with_recipient(recipient: Address) -> Self {
        Self {
            is_connecting: false,
            donate_amount: DonationAmount::default(),
            recipient,
        }
    }
}

impl Default for ScreenIntent {
    fn default() -> Self {
        Self::with_recipient(DEFAULT_DONATION_RECIPIENT)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentAction {
    SetConnecting(bool),
    SetDonateAmount(DonationAmount),
}

impl StoreAction for IntentAction {
    type State = ScreenIntent;

    const STORE: &'static str = "intent";

    fn name(&self) -> &'static str {
        match self {
            Self::SetConnecting(_) => "set_connecting",
            Self::SetDonateAmount(_) => "set_donate_amount",
        }
    }

    fn from_named(name: &str, payload: Value) -> Result<Self, StoreError> {
        match name {
            "set_connecting" => Ok(Self::SetConnecting(decode(name, payload)?)),
            "set_donate_amount" => {
                let raw = match payload {
                    Value::String(raw) => raw,
                    Value::Number(raw) => raw.to_string(),
                    other => {
                        return Err(StoreError::InvalidPayload {
                            action: name.to_string(),
                            reason: format!("expected a decimal amount, got {other}"),
                        })
                    }
                };
                let amount = raw
                    .parse::<DonationAmount>()
                    .map_err(|err| StoreError::InvalidPayload {
                        action: name.to_string(),
                        reason: err.to_string(),
                    })?;
                Ok(Self::SetDonateAmount(amount))
            }
            other => Err(StoreError::UnknownAction(other.to_string())),
        }
    }

    fn reduce(state: &ScreenIntent, action: Self) -> ScreenIntent {
        let mut next = state.clone();
        match action {
            Self::SetConnecting(v) => next.is_connecting = v,
            Self::SetDonateAmount(v) => next.donate_amount = v,
        }
        next
    }
}
