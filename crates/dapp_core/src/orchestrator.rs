//! Rule engine that moves a screen from "no wallet" to "provider ready".
//!
//! Rules are re-evaluated after every store update. A rule fires when the
//! values in its trigger set changed since the last evaluation and its guard
//! holds. Rule bodies run cooperatively on the caller's task: they report
//! progress through the update channel and [`Screen::run_until_idle`]
//! applies those updates in order.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use futures::{future::BoxFuture, stream::FuturesUnordered, FutureExt, StreamExt};
use serde_json::Value;
use shared::{
    domain::{to_decimal_string, Address, AmountError, DonationAmount},
    error::BridgeError,
    protocol::{Receipt, TransferRequest},
};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use wallet_bridge::{WalletBridge, WalletEnvironment};

use crate::{
    store::{
        ConnectionAction, ConnectionState, ConnectionStore, IntentAction, IntentStore,
        ScreenIntent, StoreAction, StoreError,
    },
    transfer::send_ether_transaction,
    view::ScreenView,
    ResolveMode, ScreenKind, ScreenSettings,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    /// Looks for an injected wallet, once per mount.
    Detect,
    /// Picks up an account the user already authorized.
    ResolveExisting,
    /// Requests account access after the user asked to connect.
    UserConnect,
    /// Builds provider and signer, then loads network and balance.
    ProviderBringUp,
}

impl Rule {
    pub const ALL: [Rule; 4] = [
        Rule::Detect,
        Rule::ResolveExisting,
        Rule::UserConnect,
        Rule::ProviderBringUp,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Detect => "detect",
            Self::ResolveExisting => "resolve_existing",
            Self::UserConnect => "user_connect",
            Self::ProviderBringUp => "provider_bring_up",
        }
    }

    fn trigger(self, connection: &ConnectionState, intent: &ScreenIntent) -> Trigger {
        match self {
            Self::Detect => Trigger::Mount,
            Self::ResolveExisting => Trigger::WalletAvailable(connection.wallet_available),
            Self::UserConnect => Trigger::ConnectIntent {
                wallet_available: connection.wallet_available,
                connected: connection.connected,
                is_connecting: intent.is_connecting,
            },
            Self::ProviderBringUp => Trigger::Account {
                connected: connection.connected,
                account: connection.account,
            },
        }
    }
}

/// Snapshot of the values a rule depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Trigger {
    Mount,
    WalletAvailable(bool),
    ConnectIntent {
        wallet_available: bool,
        connected: bool,
        is_connecting: bool,
    },
    Account {
        connected: bool,
        account: Address,
    },
}

enum Update {
    Connection(ConnectionAction),
    Intent(IntentAction),
}

enum Step {
    Update(Update),
    Settled(Rule),
}

#[derive(Clone)]
struct Dispatcher {
    tx: mpsc::UnboundedSender<Update>,
}

impl Dispatcher {
    fn connection(&self, action: ConnectionAction) {
        let name = action.name();
        if self.tx.send(Update::Connection(action)).is_err() {
            debug!(action = name, "screen unmounted; dropping update");
        }
    }

    fn intent(&self, action: IntentAction) {
        let name = action.name();
        if self.tx.send(Update::Intent(action)).is_err() {
            debug!(action = name, "screen unmounted; dropping update");
        }
    }
}

/// One mounted screen: its stores, its rules and the wallet it found.
pub struct Screen {
    kind: ScreenKind,
    settings: ScreenSettings,
    environment: Arc<dyn WalletEnvironment>,
    bridge: Option<Arc<dyn WalletBridge>>,
    connection: ConnectionStore,
    intent: IntentStore,
    triggers: HashMap<Rule, Trigger>,
    in_flight: HashSet<Rule>,
    rerun: HashSet<Rule>,
    tasks: FuturesUnordered<BoxFuture<'static, Rule>>,
    dispatcher: Dispatcher,
    updates: mpsc::UnboundedReceiver<Update>,
    view: watch::Sender<ScreenView>,
}

impl Screen {
    /// Creates the stores with defaults and evaluates every rule once. Call
    /// [`Screen::run_until_idle`] to let the started work settle.
    pub fn mount(
        kind: ScreenKind,
        settings: ScreenSettings,
        environment: Arc<dyn WalletEnvironment>,
    ) -> Self {
        let (tx, updates) = mpsc::unbounded_channel();
        let connection = ConnectionStore::new(ConnectionState::default());
        let intent = IntentStore::new(ScreenIntent::with_recipient(settings.recipient));
        let (view, _) = watch::channel(ScreenView::project(
            kind,
            connection.state(),
            intent.state(),
        ));

        let mut screen = Self {
            kind,
            settings,
            environment,
            bridge: None,
            connection,
            intent,
            triggers: HashMap::new(),
            in_flight: HashSet::new(),
            rerun: HashSet::new(),
            tasks: FuturesUnordered::new(),
            dispatcher: Dispatcher { tx },
            updates,
            view,
        };
        info!(screen = %kind, "screen mounted");
        screen.evaluate_rules();
        screen
    }

    pub fn kind(&self) -> ScreenKind {
        self.kind
    }

    pub fn settings(&self) -> &ScreenSettings {
        &self.settings
    }

    pub fn connection(&self) -> &ConnectionState {
        self.connection.state()
    }

    pub fn intent(&self) -> &ScreenIntent {
        self.intent.state()
    }

    pub fn view(&self) -> ScreenView {
        ScreenView::project(self.kind, self.connection.state(), self.intent.state())
    }

    /// Receives a fresh projection after every state update.
    pub fn subscribe_view(&self) -> watch::Receiver<ScreenView> {
        self.view.subscribe()
    }

    /// No rule in flight and no update waiting to be applied.
    pub fn is_idle(&self) -> bool {
        self.tasks.is_empty() && self.updates.is_empty()
    }

    /// Connect button. Ignored when nothing can be connected.
    pub fn request_connect(&mut self) {
        let state = self.connection.state();
        if !self.kind.is_interactive() || !state.wallet_available || state.connected {
            debug!(screen = %self.kind, "connect request ignored");
            return;
        }
        self.apply(Update::Intent(IntentAction::SetConnecting(true)));
    }

    /// Amount field edit. Out-of-range input is clamped to `[0, balance]`.
    pub fn set_donate_amount(&mut self, input: &str) -> Result<DonationAmount, AmountError> {
        let amount = DonationAmount::parse_clamped(input, self.connection.state().balance_wei())?;
        self.update_donate_amount(amount);
        Ok(amount)
    }

    pub fn step_donate_amount_up(&mut self) -> DonationAmount {
        let amount = self
            .intent
            .state()
            .donate_amount
            .step_up(self.connection.state().balance_wei());
        self.update_donate_amount(amount);
        amount
    }

    pub fn step_donate_amount_down(&mut self) -> DonationAmount {
        let amount = self.intent.state().donate_amount.step_down();
        self.update_donate_amount(amount);
        amount
    }

    /// Intent events addressed by name, as a view layer would send them.
    pub fn dispatch_intent_named(&mut self, name: &str, payload: Value) -> Result<(), StoreError> {
        let action = match IntentAction::from_named(name, payload)? {
            IntentAction::SetDonateAmount(amount) => IntentAction::SetDonateAmount(
                amount.clamp_to(self.connection.state().balance_wei()),
            ),
            action => action,
        };
        if !self.kind.is_interactive() {
            debug!(screen = %self.kind, action = action.name(), "intent ignored");
            return Ok(());
        }
        self.apply(Update::Intent(action));
        Ok(())
    }

    fn update_donate_amount(&mut self, amount: DonationAmount) {
        if self.kind.is_interactive() {
            self.apply(Update::Intent(IntentAction::SetDonateAmount(amount)));
        }
    }

    /// Sends the current donation to the fixed recipient and waits for it to
    /// be confirmed. Returns `None` on any failure; state is left untouched.
    pub async fn donate(&self) -> Option<Receipt> {
        if !self.kind.is_interactive() {
            warn!(screen = %self.kind, "donations are not available on this screen");
            return None;
        }
        let state = self.connection.state();
        let (Some(signer), Some(provider)) = (state.signer.clone(), state.provider.clone()) else {
            warn!("donation requested before the wallet signer is ready");
            return None;
        };
        let intent = self.intent.state();
        let request = TransferRequest {
            to: intent.recipient,
            value: intent.donate_amount.wei(),
        };
        send_ether_transaction(
            signer.as_ref(),
            provider.as_ref(),
            request,
            self.settings.confirmations,
            self.settings.confirmation_timeout,
        )
        .await
    }

    /// Drives started rules until none is in flight and every update they
    /// produced has been applied.
    pub async fn run_until_idle(&mut self) {
        loop {
            while let Ok(update) = self.updates.try_recv() {
                self.apply(update);
            }
            if self.tasks.is_empty() {
                break;
            }

            let step = tokio::select! {
                biased;
                Some(update) = self.updates.recv() => Step::Update(update),
                Some(rule) = self.tasks.next() => Step::Settled(rule),
                else => break,
            };
            match step {
                Step::Update(update) => self.apply(update),
                Step::Settled(rule) => self.settle(rule),
            }
        }
    }

    /// Tears the screen down. Work still in flight is dropped.
    pub fn unmount(self) {
        info!(
            screen = %self.kind,
            abandoned = self.tasks.len(),
            "screen unmounted"
        );
    }

    fn apply(&mut self, update: Update) {
        match update {
            Update::Connection(action) => {
                let balance_changed = matches!(action, ConnectionAction::SetBalance(_));
                self.connection.dispatch(action);
                if balance_changed {
                    self.bound_donate_amount();
                }
            }
            Update::Intent(action) => self.intent.dispatch(action),
        }
        self.view.send_replace(self.view());
        self.evaluate_rules();
    }

    /// Keeps the donation within the balance after the balance moves.
    fn bound_donate_amount(&mut self) {
        if !self.kind.is_interactive() {
            return;
        }
        let current = self.intent.state().donate_amount;
        let bounded = current.clamp_to(self.connection.state().balance_wei());
        if bounded != current {
            debug!(from = %current, to = %bounded, "donation amount clamped to balance");
            self.intent.dispatch(IntentAction::SetDonateAmount(bounded));
        }
    }

    fn evaluate_rules(&mut self) {
        for rule in Rule::ALL {
            let trigger = rule.trigger(self.connection.state(), self.intent.state());
            if self.triggers.get(&rule) == Some(&trigger) {
                continue;
            }
            self.triggers.insert(rule, trigger);
            if !self.guard_holds(rule) {
                continue;
            }
            if self.in_flight.contains(&rule) {
                debug!(rule = rule.name(), "rule already in flight; coalescing");
                self.rerun.insert(rule);
                continue;
            }
            self.fire(rule);
        }
    }

    fn guard_holds(&self, rule: Rule) -> bool {
        let connection = self.connection.state();
        let intent = self.intent.state();
        match rule {
            Rule::Detect => true,
            Rule::ResolveExisting => connection.wallet_available,
            Rule::UserConnect => {
                self.kind.is_interactive()
                    && connection.wallet_available
                    && !connection.connected
                    && intent.is_connecting
            }
            Rule::ProviderBringUp => connection.has_account(),
        }
    }

    fn settle(&mut self, rule: Rule) {
        self.in_flight.remove(&rule);
        if self.rerun.remove(&rule) && self.guard_holds(rule) {
            self.fire(rule);
        }
    }

    fn fire(&mut self, rule: Rule) {
        debug!(rule = rule.name(), screen = %self.kind, "rule fired");
        let dispatcher = self.dispatcher.clone();

        if rule == Rule::Detect {
            self.bridge = self.environment.detect_wallet();
            let available = self.bridge.is_some();
            if available {
                info!("wallet detected");
            } else {
                info!("no wallet detected; connection features disabled");
            }
            dispatcher.connection(ConnectionAction::SetWalletAvailable(available));
            return;
        }

        let Some(bridge) = self.bridge.clone() else {
            warn!(rule = rule.name(), "rule fired without a detected wallet");
            return;
        };
        let task = match rule {
            Rule::Detect => return,
            Rule::ResolveExisting => {
                resolve_existing(bridge, self.settings.resolve_mode, dispatcher).boxed()
            }
            Rule::UserConnect => user_connect(bridge, dispatcher).boxed(),
            Rule::ProviderBringUp => provider_bring_up(
                bridge,
                self.connection.state().account,
                self.kind.is_interactive(),
                dispatcher,
            )
            .boxed(),
        };
        self.in_flight.insert(rule);
        self.tasks.push(task.map(move |()| rule).boxed());
    }
}

async fn resolve_existing(
    bridge: Arc<dyn WalletBridge>,
    mode: ResolveMode,
    dispatcher: Dispatcher,
) {
    let lookup = match mode {
        ResolveMode::Silent => bridge.list_authorized_accounts().await,
        ResolveMode::Prompt => bridge.request_account_access().await,
    };
    match lookup.map(|accounts| accounts.first().copied()) {
        Ok(Some(account)) => {
            info!(%account, "wallet already authorized");
            dispatcher.connection(ConnectionAction::SetConnected(true));
            dispatcher.connection(ConnectionAction::SetAccount(account));
        }
        Ok(None) => {
            debug!("no authorized account yet");
            dispatcher.connection(ConnectionAction::SetConnected(false));
        }
        Err(err) => {
            warn!(error = %err, "authorized account lookup failed");
            dispatcher.connection(ConnectionAction::SetConnected(false));
        }
    }
}

async fn user_connect(bridge: Arc<dyn WalletBridge>, dispatcher: Dispatcher) {
    let outcome = bridge
        .request_account_access()
        .await
        .and_then(|accounts| {
            accounts
                .first()
                .copied()
                .ok_or(BridgeError::NoAuthorizedAccount)
        });
    match outcome {
        Ok(account) => {
            info!(%account, "wallet connected");
            dispatcher.connection(ConnectionAction::SetConnected(true));
            dispatcher.connection(ConnectionAction::SetAccount(account));
        }
        Err(err) => {
            warn!(
                error = %err,
                rejected = err.is_user_rejection(),
                "connect to wallet failed"
            );
            dispatcher.connection(ConnectionAction::SetConnected(false));
            dispatcher.connection(ConnectionAction::SetAccount(Address::ZERO));
        }
    }
    dispatcher.intent(IntentAction::SetConnecting(false));
}

async fn provider_bring_up(
    bridge: Arc<dyn WalletBridge>,
    account: Address,
    derive_signer: bool,
    dispatcher: Dispatcher,
) {
    if let Err(err) = bring_up(bridge.as_ref(), account, derive_signer, &dispatcher).await {
        // Provider and signer stay as already set.
        warn!(error = %err, %account, "provider bring-up failed");
        dispatcher.connection(ConnectionAction::SetNetwork(None));
        dispatcher.connection(ConnectionAction::SetBalance(
            ConnectionState::default().balance,
        ));
    }
}

async fn bring_up(
    bridge: &dyn WalletBridge,
    account: Address,
    derive_signer: bool,
    dispatcher: &Dispatcher,
) -> Result<(), BridgeError> {
    let provider = bridge.create_provider()?;
    dispatcher.connection(ConnectionAction::SetProvider(Some(Arc::clone(&provider))));

    if derive_signer {
        let signer = provider.create_signer()?;
        dispatcher.connection(ConnectionAction::SetSigner(Some(signer)));
    }

    let network = provider.get_network().await?;
    debug!(name = %network.name, chain_id = network.chain_id, "network resolved");
    dispatcher.connection(ConnectionAction::SetNetwork(Some(network)));

    let balance = to_decimal_string(provider.get_balance(account).await?);
    debug!(%account, %balance, "balance loaded");
    dispatcher.connection(ConnectionAction::SetBalance(balance));
    Ok(())
}

#[cfg(test)]
#[path = "tests/orchestrator_tests.rs"]
mod tests;
