//! Wallet connection and donation flow for a dapp screen.
//!
//! Each mounted [`Screen`] owns a connection store and an intent store. A
//! small set of named rules watches both stores and drives the injected
//! wallet through detection, account access, provider bring-up and balance
//! lookup. Failures never escape a rule; they show up as default state.

use std::{fmt, str::FromStr, time::Duration};

use shared::domain::{Address, DEFAULT_DONATION_RECIPIENT};

pub mod orchestrator;
pub mod rpc_bridge;
pub mod store;
pub mod transfer;
pub mod view;

#[cfg(test)]
mod test_support;

pub use orchestrator::{Rule, Screen};
pub use rpc_bridge::{JsonRpcEnvironment, JsonRpcWalletBridge};
pub use store::{
    ConnectionAction, ConnectionState, ConnectionStore, IntentAction, IntentStore, ScreenIntent,
    StoreError,
};
pub use transfer::{send_ether_transaction, TransferError};
pub use view::ScreenView;

pub const DEFAULT_CONFIRMATIONS: u64 = 3;
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_millis(120_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScreenKind {
    /// Read-only account and balance viewer.
    Viewer,
    /// Connect button, donation amount and donate action.
    Donate,
}

impl ScreenKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Donate => "donate",
        }
    }

    /// Interactive screens derive a signer and accept user intents.
    pub fn is_interactive(self) -> bool {
        matches!(self, Self::Donate)
    }
}

impl fmt::Display for ScreenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScreenKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "viewer" => Ok(Self::Viewer),
            "donate" => Ok(Self::Donate),
            other => Err(format!("unknown screen '{other}' (expected viewer or donate)")),
        }
    }
}

/// How an already-authorized account is looked up once a wallet is detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolveMode {
    /// `eth_accounts`; never prompts.
    #[default]
    Silent,
    /// `eth_requestAccounts`; prompts as soon as the wallet shows up.
    Prompt,
}

impl FromStr for ResolveMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "silent" => Ok(Self::Silent),
            "prompt" => Ok(Self::Prompt),
            other => Err(format!("unknown resolve mode '{other}' (expected silent or prompt)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenSettings {
    pub recipient: Address,
    pub confirmations: u64,
    pub confirmation_timeout: Duration,
    pub resolve_mode: ResolveMode,
}

impl Default for ScreenSettings {
    fn default() -> Self {
        Self {
            recipient: DEFAULT_DONATION_RECIPIENT,
            confirmations: DEFAULT_CONFIRMATIONS,
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
            resolve_mode: ResolveMode::default(),
        }
    }
}
