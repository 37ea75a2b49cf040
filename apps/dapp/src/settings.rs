use std::{collections::HashMap, fs, path::Path, str::FromStr, time::Duration};

use anyhow::Context;
use dapp_core::{
    rpc_bridge::{DEFAULT_POLL_INTERVAL, DEFAULT_REQUEST_TIMEOUT},
    JsonRpcEnvironment, ResolveMode, ScreenSettings, DEFAULT_CONFIRMATIONS,
    DEFAULT_CONFIRMATION_TIMEOUT,
};
use shared::domain::{Address, DEFAULT_DONATION_RECIPIENT};
use tracing::warn;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// JSON-RPC endpoint of the wallet node. `None` means no wallet.
    pub wallet_url: Option<String>,
    pub recipient: String,
    pub confirmations: u64,
    pub confirmation_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub request_timeout_ms: u64,
    pub resolve_mode: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            wallet_url: None,
            recipient: DEFAULT_DONATION_RECIPIENT.to_string(),
            confirmations: DEFAULT_CONFIRMATIONS,
            confirmation_timeout_ms: DEFAULT_CONFIRMATION_TIMEOUT.as_millis() as u64,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT.as_millis() as u64,
            resolve_mode: "silent".into(),
        }
    }
}

pub fn load_settings(path: &Path) -> Settings {
    let file = fs::read_to_string(path).ok();
    Settings::from_sources(file.as_deref(), |key| std::env::var(key).ok())
}

impl Settings {
    /// Defaults, then the flat toml file, then environment overrides.
    pub fn from_sources(file: Option<&str>, env: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::default();

        if let Some(raw) = file {
            match toml::from_str::<toml::Table>(raw) {
                Ok(table) => {
                    let file_cfg: HashMap<String, String> = table
                        .into_iter()
                        .map(|(key, value)| match value {
                            toml::Value::String(v) => (key, v),
                            other => (key, other.to_string()),
                        })
                        .collect();
                    settings.apply(|key| file_cfg.get(key).cloned());
                }
                Err(err) => warn!(error = %err, "ignoring unreadable settings file"),
            }
        }

        if let Some(v) = env("DAPP_WALLET_URL") {
            settings.wallet_url = Some(v).filter(|url| !url.trim().is_empty());
        }
        settings.apply(|key| env(&format!("APP__{}", key.to_ascii_uppercase())));
        settings
    }

    fn apply(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("wallet_url") {
            self.wallet_url = Some(v).filter(|url| !url.trim().is_empty());
        }
        if let Some(v) = lookup("recipient") {
            self.recipient = v;
        }
        if let Some(v) = lookup("resolve_mode") {
            self.resolve_mode = v;
        }
        set_number(&mut self.confirmations, "confirmations", lookup("confirmations"));
        set_number(
            &mut self.confirmation_timeout_ms,
            "confirmation_timeout_ms",
            lookup("confirmation_timeout_ms"),
        );
        set_number(
            &mut self.poll_interval_ms,
            "poll_interval_ms",
            lookup("poll_interval_ms"),
        );
        set_number(
            &mut self.request_timeout_ms,
            "request_timeout_ms",
            lookup("request_timeout_ms"),
        );
    }

    pub fn screen_settings(&self) -> anyhow::Result<ScreenSettings> {
        let recipient = Address::from_str(self.recipient.trim())
            .with_context(|| format!("invalid recipient address '{}'", self.recipient))?;
        let resolve_mode = ResolveMode::from_str(&self.resolve_mode).map_err(anyhow::Error::msg)?;
        Ok(ScreenSettings {
            recipient,
            confirmations: self.confirmations,
            confirmation_timeout: Duration::from_millis(self.confirmation_timeout_ms),
            resolve_mode,
        })
    }

    pub fn environment(&self) -> anyhow::Result<JsonRpcEnvironment> {
        let endpoint = self
            .wallet_url
            .as_deref()
            .map(|raw| Url::parse(raw).with_context(|| format!("invalid wallet url '{raw}'")))
            .transpose()?;
        Ok(JsonRpcEnvironment::new(endpoint)
            .with_request_timeout(Duration::from_millis(self.request_timeout_ms))
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms)))
    }
}

fn set_number(target: &mut u64, key: &str, raw: Option<String>) {
    let Some(raw) = raw else {
        return;
    };
    match raw.trim().parse::<u64>() {
        Ok(parsed) => *target = parsed,
        Err(_) => warn!(key, value = %raw, "ignoring non-numeric setting"),
    }
}
