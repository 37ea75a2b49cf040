//! Read-only projection of a screen's stores for whatever renders it.

use shared::domain::{Address, DonationAmount};

use crate::{
    store::{ConnectionState, ScreenIntent},
    ScreenKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletStatus {
    Injected,
    NotFound,
}

impl WalletStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Injected => "injected",
            Self::NotFound => "not found",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionBadge {
    Connected,
    Disconnected,
}

impl ConnectionBadge {
    pub fn label(self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountDetails {
    pub account: Address,
    pub balance: String,
    pub network_name: String,
    pub chain_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DonateForm {
    pub amount: DonationAmount,
    /// Upper bound of the amount field, the current balance.
    pub max: String,
    pub step: DonationAmount,
    pub precision: u8,
}

impl DonateForm {
    pub fn button_label(&self) -> String {
        format!("Donate {} ETH", self.amount)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenView {
    pub kind: ScreenKind,
    pub wallet: WalletStatus,
    /// Only shown once a wallet is available.
    pub badge: Option<ConnectionBadge>,
    pub details: Option<AccountDetails>,
    pub donate_form: Option<DonateForm>,
    pub show_connect: bool,
    pub connecting: bool,
}

impl ScreenView {
    pub fn project(kind: ScreenKind, connection: &ConnectionState, intent: &ScreenIntent) -> Self {
        let wallet = if connection.wallet_available {
            WalletStatus::Injected
        } else {
            WalletStatus::NotFound
        };
        let badge = connection.wallet_available.then_some(if connection.connected {
            ConnectionBadge::Connected
        } else {
            ConnectionBadge::Disconnected
        });

        let details = connection
            .network
            .as_ref()
            .filter(|_| connection.has_account())
            .map(|network| AccountDetails {
                account: connection.account,
                balance: connection.balance.clone(),
                network_name: network.name.clone(),
                chain_id: network.chain_id,
            });

        let donate_form = details
            .as_ref()
            .filter(|_| kind.is_interactive())
            .map(|details| DonateForm {
                amount: intent.donate_amount,
                max: details.balance.clone(),
                step: DonationAmount::STEP,
                precision: 2,
            });

        Self {
            kind,
            wallet,
            badge,
            details,
            donate_form,
            show_connect: kind.is_interactive()
                && connection.wallet_available
                && !connection.connected,
            connecting: intent.is_connecting,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::domain::NetworkInfo;

    fn connected_state() -> ConnectionState {
        ConnectionState {
            wallet_available: true,
            connected: true,
            account: Address::new([0x11; 20]),
            network: Some(NetworkInfo::new("mainnet", 1)),
            balance: "2.5".into(),
            ..ConnectionState::default()
        }
    }

    #[test]
    fn missing_wallet_hides_badge_and_connect() {
        let view = ScreenView::project(
            ScreenKind::Donate,
            &ConnectionState::default(),
            &ScreenIntent::default(),
        );
        assert_eq!(view.wallet.label(), "not found");
        assert!(view.badge.is_none());
        assert!(view.details.is_none());
        assert!(!view.show_connect);
    }

    #[test]
    fn disconnected_wallet_offers_connect() {
        let state = ConnectionState {
            wallet_available: true,
            ..ConnectionState::default()
        };
        let view = ScreenView::project(ScreenKind::Donate, &state, &ScreenIntent::default());
        assert_eq!(view.badge, Some(ConnectionBadge::Disconnected));
        assert!(view.show_connect);

        let viewer = ScreenView::project(ScreenKind::Viewer, &state, &ScreenIntent::default());
        assert!(!viewer.show_connect);
    }

    #[test]
    fn connected_donate_screen_shows_details_and_form() {
        let view = ScreenView::project(
            ScreenKind::Donate,
            &connected_state(),
            &ScreenIntent::default(),
        );
        assert_eq!(view.badge.map(ConnectionBadge::label), Some("connected"));
        let details = view.details.expect("details");
        assert_eq!(details.balance, "2.5");
        assert_eq!(details.network_name, "mainnet");
        assert_eq!(details.chain_id, 1);
        let form = view.donate_form.expect("form");
        assert_eq!(form.max, "2.5");
        assert_eq!(form.button_label(), "Donate 0.05 ETH");
    }

    #[test]
    fn zero_account_hides_details_even_with_network() {
        let state = ConnectionState {
            account: Address::ZERO,
            ..connected_state()
        };
        let view = ScreenView::project(ScreenKind::Viewer, &state, &ScreenIntent::default());
        assert!(view.details.is_none());
        assert!(view.donate_form.is_none());
    }
}
