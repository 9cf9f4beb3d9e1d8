//! Application state for the wallet health dashboard.
//!
//! `WalletHealthHub` owns everything the presentation layer needs: network
//! mode, chain, the connected wallet, the mode-scoped working sets and the
//! order cache. Every user-facing action is a `&mut self` method here, so
//! only one runs at a time; failures are reported both as a `HubError` and
//! as a toast through the [`Notifier`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use solana_sdk::pubkey::Pubkey;
use tokio::sync::mpsc::UnboundedSender;
use tracing::info;
use wallet_health_types::{
    lamports_to_sol, BatchItemEvent, Chain, DcaFrequency, DustToken, ExplorerKind, NetworkMode, RecurringOrder,
    SpamToken, TriggerOrder,
};

use crate::chain::{ChainClient, RpcChainClient};
use crate::classifier::{classify_dust, classify_spam, load_strict_mints};
use crate::config::Settings;
use crate::error::{log_error, HubError, Result, ValidationErrorKind, WalletErrorKind};
use crate::jupiter_client::{
    mint_decimals, mint_symbol, ui_to_raw, CreateRecurringOrder, CreateTriggerOrder, JupiterClient,
    PendingOrderTransaction, SwapProvider, TokenDirectory,
};
use crate::monitoring::{Notifier, Toast};
use crate::orchestrator::{
    burn_live, burn_simulated, refuel_allowed, refuel_live, refuel_simulated, run_sequential, BatchReport,
    BurnOutcome, LiveSweeper, SimulatedSweeper, SweepDestination,
};
use crate::orders::{fetch_live_orders, shared_order_book, OrderBook, OrderPoller, OrderSource, SharedOrderBook};
use crate::simulation::{
    Clock, SimulatedDca, SimulatedLimitOrder, SimulationDelays, SimulationStore, SystemClock, REFUEL_OPTIONS,
};
use crate::wallet::WalletSigner;

/// Which panel of the dashboard is open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AppView {
    #[default]
    Home,
    DustSweeper,
    SolRefuel,
    SpamShield,
    LimitOrder,
    DcaWizard,
    ProTrader,
}

impl AppView {
    /// Views that show the order list and keep it fresh while open.
    pub fn shows_orders(&self) -> bool {
        matches!(self, AppView::LimitOrder | AppView::DcaWizard)
    }
}

impl fmt::Display for AppView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AppView::Home => "home",
            AppView::DustSweeper => "dust-sweeper",
            AppView::SolRefuel => "sol-refuel",
            AppView::SpamShield => "spam-shield",
            AppView::LimitOrder => "limit-order",
            AppView::DcaWizard => "dca-wizard",
            AppView::ProTrader => "pro-trader",
        };
        f.write_str(s)
    }
}

impl FromStr for AppView {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "home" => Ok(AppView::Home),
            "dust-sweeper" => Ok(AppView::DustSweeper),
            "sol-refuel" => Ok(AppView::SolRefuel),
            "spam-shield" => Ok(AppView::SpamShield),
            "limit-order" => Ok(AppView::LimitOrder),
            "dca-wizard" => Ok(AppView::DcaWizard),
            "pro-trader" => Ok(AppView::ProTrader),
            _ => Err(format!("Invalid view: {}", s)),
        }
    }
}

/// Network-facing services for one network mode.
#[derive(Clone)]
pub struct Backends {
    pub swaps: Arc<dyn SwapProvider>,
    pub tokens: Arc<dyn TokenDirectory>,
    pub orders: Arc<dyn OrderSource>,
    pub chain: Arc<dyn ChainClient>,
}

impl Backends {
    pub fn from_settings(settings: &Settings, mode: NetworkMode) -> Result<Self> {
        let jupiter = Arc::new(JupiterClient::from_settings(settings, mode)?);
        let chain = Arc::new(RpcChainClient::new(settings.rpc_url(mode)));
        Ok(Self {
            swaps: jupiter.clone(),
            tokens: jupiter.clone(),
            orders: jupiter,
            chain,
        })
    }
}

/// Builds the backends for a mode; called again on every mode switch.
pub trait BackendFactory: Send + Sync {
    fn build(&self, mode: NetworkMode) -> Result<Backends>;
}

impl<F> BackendFactory for F
where
    F: Fn(NetworkMode) -> Result<Backends> + Send + Sync,
{
    fn build(&self, mode: NetworkMode) -> Result<Backends> {
        self(mode)
    }
}

struct SettingsBackendFactory {
    settings: Settings,
}

impl BackendFactory for SettingsBackendFactory {
    fn build(&self, mode: NetworkMode) -> Result<Backends> {
        Backends::from_settings(&self.settings, mode)
    }
}

/// What an order create/cancel produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderReceipt {
    pub order_id: Option<String>,
    /// Absent for simulated actions that have no transaction.
    pub signature: Option<String>,
}

pub struct WalletHealthHub {
    settings: Settings,
    mode: NetworkMode,
    chain: Chain,
    view: AppView,
    wallet: Option<Arc<dyn WalletSigner>>,
    factory: Arc<dyn BackendFactory>,
    backends: Backends,
    simulation: Arc<SimulationStore>,
    notifier: Arc<dyn Notifier>,
    events: Option<UnboundedSender<BatchItemEvent>>,
    dust: Vec<DustToken>,
    spam: Vec<SpamToken>,
    sol_lamports: Option<u64>,
    orders: SharedOrderBook,
    poller: Option<OrderPoller>,
}

impl WalletHealthHub {
    pub fn new(settings: Settings, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let factory = Arc::new(SettingsBackendFactory {
            settings: settings.clone(),
        });
        Self::with_parts(settings, factory, Arc::new(SystemClock), notifier)
    }

    pub fn with_parts(
        settings: Settings,
        factory: Arc<dyn BackendFactory>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let mode = settings.network_mode;
        let backends = factory.build(mode)?;
        let simulation = Arc::new(SimulationStore::new(clock, SimulationDelays::from_settings(&settings)));
        info!(mode = %mode, "Wallet health hub initialized");

        Ok(Self {
            settings,
            mode,
            chain: Chain::default(),
            view: AppView::default(),
            wallet: None,
            factory,
            backends,
            simulation,
            notifier,
            events: None,
            dust: Vec::new(),
            spam: Vec::new(),
            sol_lamports: None,
            orders: shared_order_book(),
            poller: None,
        })
    }

    // --- Accessors ---

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn network_mode(&self) -> NetworkMode {
        self.mode
    }

    pub fn chain(&self) -> Chain {
        self.chain
    }

    pub fn active_view(&self) -> AppView {
        self.view
    }

    pub fn is_connected(&self) -> bool {
        self.wallet.is_some()
    }

    pub fn wallet_pubkey(&self) -> Option<Pubkey> {
        self.wallet.as_ref().map(|wallet| wallet.pubkey())
    }

    pub fn dust_tokens(&self) -> &[DustToken] {
        &self.dust
    }

    pub fn spam_tokens(&self) -> &[SpamToken] {
        &self.spam
    }

    pub fn sol_balance_lamports(&self) -> Option<u64> {
        self.sol_lamports
    }

    pub fn simulation(&self) -> &Arc<SimulationStore> {
        &self.simulation
    }

    pub fn is_polling(&self) -> bool {
        self.poller.as_ref().map(OrderPoller::is_running).unwrap_or(false)
    }

    pub async fn order_book(&self) -> OrderBook {
        self.orders.read().await.clone()
    }

    /// Streams per-item batch progress to `sender`.
    pub fn set_event_sender(&mut self, sender: Option<UnboundedSender<BatchItemEvent>>) {
        self.events = sender;
    }

    // --- Shell: mode, chain, view, wallet ---

    /// Switches network mode. Polling stops and every mode-scoped list is
    /// dropped before the new mode becomes visible.
    pub async fn set_network_mode(&mut self, mode: NetworkMode) -> Result<()> {
        if mode == self.mode {
            return Ok(());
        }
        let backends = self.factory.build(mode)?;
        self.stop_order_polling().await;
        self.clear_working_sets().await;

        self.backends = backends;
        self.mode = mode;
        info!(mode = %mode, rpc = self.settings.rpc_url(mode), "Network mode switched");

        self.sync_polling().await;
        Ok(())
    }

    pub fn set_chain(&mut self, chain: Chain) {
        if chain != self.chain {
            info!(?chain, "Chain switched");
            self.chain = chain;
            self.dust.clear();
        }
    }

    /// Opening an order view on mainnet with a wallet starts polling;
    /// leaving it stops polling.
    pub async fn set_active_view(&mut self, view: AppView) {
        self.view = view;
        self.sync_polling().await;
    }

    pub async fn connect_wallet(&mut self, wallet: Arc<dyn WalletSigner>) {
        info!(wallet = %wallet.pubkey(), "Wallet connected");
        self.stop_order_polling().await;
        self.wallet = Some(wallet);
        if self.mode.is_mainnet() {
            self.clear_working_sets().await;
        }
        self.sync_polling().await;
    }

    pub async fn disconnect_wallet(&mut self) {
        self.stop_order_polling().await;
        if let Some(wallet) = self.wallet.take() {
            info!(wallet = %wallet.pubkey(), "Wallet disconnected");
        }
        if self.mode.is_mainnet() {
            self.clear_working_sets().await;
        }
    }

    /// Stops background work. Call before dropping the hub.
    pub async fn shutdown(&mut self) {
        self.stop_order_polling().await;
    }

    async fn clear_working_sets(&mut self) {
        self.dust.clear();
        self.spam.clear();
        self.sol_lamports = None;
        self.orders.write().await.clear();
    }

    async fn sync_polling(&mut self) {
        let wanted = self.view.shows_orders() && self.mode.is_mainnet() && self.wallet.is_some();
        if wanted && !self.is_polling() {
            if let Err(e) = self.start_order_polling() {
                log_error(&e, "Failed to start order polling");
            }
        } else if !wanted && self.poller.is_some() {
            self.stop_order_polling().await;
        }
    }

    // --- Dust ---

    /// Rebuilds the dust list. Devnet and the EVM chains read mock data.
    pub async fn scan_dust(&mut self) -> Result<Vec<DustToken>> {
        if self.chain.is_evm() || self.mode.is_simulated() {
            self.dust = self.simulation.dust_tokens(self.chain);
            return Ok(self.dust.clone());
        }

        let wallet = self.require_wallet()?;
        let scanned = async {
            let holdings = self.backends.tokens.balances(&wallet.pubkey()).await?;
            let strict = load_strict_mints(self.backends.tokens.as_ref()).await;
            Ok::<_, HubError>(classify_dust(&holdings, &strict, self.settings.dust_threshold_usd))
        }
        .await;

        match scanned {
            Ok(dust) => {
                info!(count = dust.len(), "Dust scan complete");
                self.dust = dust;
                Ok(self.dust.clone())
            }
            Err(e) => {
                self.dust.clear();
                self.report_failure("Error Fetching Balances", &e, Some("Could not retrieve your token balances."));
                Err(e)
            }
        }
    }

    /// Sweeps the selected dust (all of it when `mints` is `None`) one token
    /// at a time, stopping at the first failure.
    pub async fn sweep_dust(&mut self, destination: SweepDestination, mints: Option<&[String]>) -> Result<BatchReport> {
        let items = select_items(&self.dust, mints, |token| &token.mint);
        if items.is_empty() {
            return Err(HubError::validation(
                ValidationErrorKind::NothingSelected,
                "No dust tokens selected to sweep.",
            ));
        }
        if self.chain.is_evm() && destination == SweepDestination::Usdc {
            return Err(HubError::validation(
                ValidationErrorKind::Unsupported,
                "EVM chains can only sweep into the native token.",
            ));
        }

        let live = self.mode.is_mainnet() && !self.chain.is_evm();
        let report = if live {
            let wallet = self.require_wallet()?;
            let sweeper = LiveSweeper::new(self.backends.swaps.as_ref(), wallet.as_ref(), destination);
            run_sequential("sweep", &items, &sweeper, self.events.clone()).await
        } else {
            let sweeper = SimulatedSweeper::new(&self.simulation, self.chain, destination);
            run_sequential("sweep", &items, &sweeper, self.events.clone()).await
        };

        let swept: Vec<&str> = items
            .iter()
            .take(report.succeeded())
            .map(|token| token.mint.as_str())
            .collect();
        self.dust.retain(|token| !swept.contains(&token.mint.as_str()));

        if let Some(failed) = &report.failure {
            self.report_failure(&format!("Sweep Failed for {}", failed.label), &failed.error, None);
        }
        if report.succeeded() > 0 {
            let symbol = destination.symbol(self.chain);
            let toast = if live {
                Toast::success(
                    "Sweep Complete!",
                    format!("Successfully swept {} tokens into {}.", report.summary(), symbol),
                )
            } else if self.chain.is_evm() {
                Toast::success(
                    "Dust Swept! (EVM Simulated)",
                    format!("You successfully converted {} tokens.", report.summary()),
                )
            } else {
                Toast::success(
                    "Dust Swept! (Testnet)",
                    format!("You successfully converted {} tokens and earned some {}.", report.summary(), symbol),
                )
            };
            self.notify_with_link(toast, report.last_signature());
        }

        Ok(report)
    }

    // --- Spam ---

    pub async fn scan_spam(&mut self) -> Result<Vec<SpamToken>> {
        if self.mode.is_simulated() {
            self.spam = self.simulation.spam_tokens();
            return Ok(self.spam.clone());
        }

        let wallet = self.require_wallet()?;
        let scanned = async {
            let accounts = self.backends.chain.get_token_accounts(&wallet.pubkey()).await?;
            let strict = load_strict_mints(self.backends.tokens.as_ref()).await;
            Ok::<_, HubError>(classify_spam(&accounts, &strict))
        }
        .await;

        match scanned {
            Ok(spam) => {
                info!(count = spam.len(), "Spam scan complete");
                self.spam = spam;
                Ok(self.spam.clone())
            }
            Err(e) => {
                self.spam.clear();
                self.report_failure("Error Scanning Tokens", &e, Some("Could not retrieve your token accounts."));
                Err(e)
            }
        }
    }

    /// "Scan for more" on the test network.
    pub fn add_more_spam(&mut self) -> Result<Vec<SpamToken>> {
        if self.mode.is_mainnet() {
            return Err(HubError::validation(
                ValidationErrorKind::Unsupported,
                "Adding mock spam is only available in Testnet Mode.",
            ));
        }
        let fresh = self.simulation.add_more_spam();
        self.spam.extend(fresh.iter().cloned());
        Ok(fresh)
    }

    /// Closes the selected spam accounts (all of them when `accounts` is
    /// `None`), reclaiming their rent.
    pub async fn burn_spam(&mut self, accounts: Option<&[String]>) -> Result<BurnOutcome> {
        let selected = select_items(&self.spam, accounts, |spam| &spam.token_account);

        let result = if self.mode.is_mainnet() {
            match self.require_wallet() {
                Ok(wallet) => {
                    burn_live(
                        self.backends.chain.as_ref(),
                        wallet.as_ref(),
                        &selected,
                        self.events.clone(),
                    )
                    .await
                }
                Err(e) => Err(e),
            }
        } else {
            burn_simulated(&self.simulation, &selected, self.events.clone()).await
        };

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                if !e.is_validation() {
                    self.report_failure("Burn Failed", &e, None);
                }
                return Err(e);
            }
        };

        self.spam.retain(|spam| !outcome.burned.contains(spam));

        if let Some(failed) = &outcome.report.failure {
            self.report_failure("Burn Failed", &failed.error, None);
        }
        if !outcome.burned.is_empty() {
            let recovered = lamports_to_sol(outcome.recovered_lamports);
            let title = if self.mode.is_mainnet() {
                "Spam Burned!"
            } else {
                "Spam Burned! (Testnet)"
            };
            let toast = Toast::success(
                title,
                format!(
                    "You burned {} spam tokens and recovered ~{:.5} SOL.",
                    outcome.burned.len(),
                    recovered
                ),
            );
            self.notify_with_link(toast, outcome.report.last_signature());
            self.refresh_sol_balance_quietly().await;
        }

        Ok(outcome)
    }

    // --- SOL refuel ---

    /// Current SOL balance. On mainnet without a wallet the balance is
    /// unknown.
    pub async fn refresh_sol_balance(&mut self) -> Result<Option<u64>> {
        self.sol_lamports = if self.mode.is_simulated() {
            Some(self.simulation.sol_lamports())
        } else {
            match &self.wallet {
                Some(wallet) => Some(self.backends.chain.get_balance(&wallet.pubkey()).await?),
                None => None,
            }
        };
        Ok(self.sol_lamports)
    }

    async fn refresh_sol_balance_quietly(&mut self) {
        if let Err(e) = self.refresh_sol_balance().await {
            log_error(&e, "Failed to refresh SOL balance");
        }
    }

    pub fn needs_refuel(&self) -> bool {
        refuel_allowed(self.mode, self.sol_lamports)
    }

    /// Runs one of the fixed refuel options (0-based index).
    pub async fn refuel(&mut self, option_index: usize) -> Result<BatchReport> {
        let option = REFUEL_OPTIONS.get(option_index).copied().ok_or_else(|| {
            HubError::validation(
                ValidationErrorKind::InvalidInput,
                format!("Invalid selection: refuel option {} does not exist.", option_index + 1),
            )
        })?;

        let report = if self.mode.is_mainnet() {
            let wallet = self.require_wallet()?;
            if self.sol_lamports.is_none() {
                self.sol_lamports = Some(self.backends.chain.get_balance(&wallet.pubkey()).await?);
            }
            if !self.needs_refuel() {
                return Err(HubError::validation(
                    ValidationErrorKind::InvalidInput,
                    "Your SOL balance is healthy; refuel is only needed below 0.05 SOL.",
                ));
            }
            refuel_live(self.backends.swaps.as_ref(), wallet.as_ref(), option, self.events.clone()).await
        } else {
            refuel_simulated(&self.simulation, option, self.events.clone()).await
        };

        match &report.failure {
            Some(failed) => self.report_failure("Refuel Failed", &failed.error, None),
            None => {
                let toast = if self.mode.is_mainnet() {
                    Toast::success("Refuel Successful!", format!("Swapped {} for SOL.", option.label()))
                } else {
                    Toast::success("Refuel Successful! (Testnet)", "Your SOL balance has been topped up.")
                };
                self.notify_with_link(toast, report.last_signature());
                self.refresh_sol_balance_quietly().await;
            }
        }

        Ok(report)
    }

    // --- Limit orders ---

    pub async fn create_limit_order(
        &mut self,
        input_mint: &str,
        output_mint: &str,
        making_ui_amount: f64,
        taking_ui_amount: f64,
    ) -> Result<OrderReceipt> {
        ensure_distinct(input_mint, output_mint)?;
        let making_amount = to_raw(input_mint, making_ui_amount)?;
        let taking_amount = to_raw(output_mint, taking_ui_amount)?;

        if self.mode.is_simulated() {
            let order = self.simulation.create_limit_order(SimulatedLimitOrder {
                input_mint: input_mint.to_string(),
                output_mint: output_mint.to_string(),
                making_amount,
                taking_amount,
            })?;
            self.orders.write().await.limit_orders = self.simulation.limit_orders();
            self.notifier.notify(Toast::success(
                "Order Created (Testnet)",
                "Your new limit order has been saved for this session.",
            ));
            return Ok(OrderReceipt {
                order_id: Some(order.id),
                signature: None,
            });
        }

        let wallet = self.require_wallet()?;
        let request = CreateTriggerOrder {
            maker: wallet.pubkey(),
            input_mint: input_mint.to_string(),
            output_mint: output_mint.to_string(),
            making_amount,
            taking_amount,
        };
        let result = async {
            let pending = self.backends.orders.create_trigger_order(&request).await?;
            let (signed, request_id, order_id) = sign_pending(wallet.as_ref(), pending).await?;
            let signature = self.backends.orders.execute_trigger(&signed, &request_id).await?;
            Ok::<_, HubError>(OrderReceipt {
                order_id,
                signature: Some(signature),
            })
        }
        .await;

        match result {
            Ok(receipt) => {
                self.notify_with_link(
                    Toast::success("Limit Order Created!", "Your order is now active on-chain."),
                    receipt.signature.as_deref(),
                );
                self.refresh_orders_quietly().await;
                Ok(receipt)
            }
            Err(e) => {
                self.report_failure("Order Creation Failed", &e, None);
                Err(e)
            }
        }
    }

    pub async fn cancel_limit_order(&mut self, order_id: &str) -> Result<OrderReceipt> {
        if self.mode.is_simulated() {
            self.simulation.cancel_limit_order(order_id)?;
            self.orders.write().await.limit_orders = self.simulation.limit_orders();
            self.notifier.notify(Toast::info(
                "Order Cancelled (Testnet)",
                "The simulated order has been removed.",
            ));
            return Ok(OrderReceipt {
                order_id: Some(order_id.to_string()),
                signature: None,
            });
        }

        let wallet = self.require_wallet()?;
        let result = async {
            let pending = self
                .backends
                .orders
                .cancel_trigger_order(&wallet.pubkey(), order_id)
                .await?;
            let (signed, request_id, _) = sign_pending(wallet.as_ref(), pending).await?;
            self.backends.orders.execute_trigger(&signed, &request_id).await
        }
        .await;

        match result {
            Ok(signature) => {
                self.notify_with_link(
                    Toast::success("Order Cancelled", "Your limit order has been cancelled."),
                    Some(&signature),
                );
                self.refresh_orders_quietly().await;
                Ok(OrderReceipt {
                    order_id: Some(order_id.to_string()),
                    signature: Some(signature),
                })
            }
            Err(e) => {
                self.report_failure("Cancellation Failed", &e, None);
                Err(e)
            }
        }
    }

    pub async fn refresh_limit_orders(&mut self) -> Result<Vec<TriggerOrder>> {
        let orders = if self.mode.is_simulated() {
            self.simulation.limit_orders()
        } else {
            let wallet = self.require_wallet()?;
            self.backends.orders.open_trigger_orders(&wallet.pubkey()).await?
        };
        let mut book = self.orders.write().await;
        book.limit_orders = orders.clone();
        book.last_refreshed = Some(Utc::now());
        Ok(orders)
    }

    // --- DCA ---

    /// Schedules `number_of_orders` buys of `amount_per_order` (UI units of
    /// the input token) each.
    pub async fn schedule_dca(
        &mut self,
        input_mint: &str,
        output_mint: &str,
        amount_per_order: f64,
        number_of_orders: u32,
        frequency: DcaFrequency,
        start_at: Option<DateTime<Utc>>,
    ) -> Result<OrderReceipt> {
        ensure_distinct(input_mint, output_mint)?;
        let per_order = to_raw(input_mint, amount_per_order)?;
        let buy_symbol = mint_symbol(output_mint).unwrap_or(output_mint).to_string();
        let scheduled = Toast::success(
            if self.mode.is_mainnet() {
                "DCA Scheduled!"
            } else {
                "DCA Scheduled (Simulated)"
            },
            format!(
                "Your new {} schedule to buy {} has been created.",
                frequency.to_string().to_lowercase(),
                buy_symbol
            ),
        );

        if self.mode.is_simulated() {
            let created = self
                .simulation
                .create_dca(SimulatedDca {
                    input_mint: input_mint.to_string(),
                    output_mint: output_mint.to_string(),
                    in_amount_per_cycle: per_order,
                    number_of_orders,
                    frequency,
                    start_at,
                })
                .await?;
            self.orders.write().await.dca_orders = self.simulation.dca_orders();
            self.notifier.notify(scheduled);
            return Ok(OrderReceipt {
                order_id: Some(created.id),
                signature: None,
            });
        }

        let wallet = self.require_wallet()?;
        let request = CreateRecurringOrder {
            user: wallet.pubkey(),
            input_mint: input_mint.to_string(),
            output_mint: output_mint.to_string(),
            in_amount: per_order.saturating_mul(number_of_orders as u64),
            number_of_orders,
            frequency,
            start_at,
        };
        request.validate()?;

        let result = async {
            let pending = self.backends.orders.create_recurring_order(&request).await?;
            let (signed, request_id, order_id) = sign_pending(wallet.as_ref(), pending).await?;
            let signature = self.backends.orders.execute_recurring(&signed, &request_id).await?;
            Ok::<_, HubError>(OrderReceipt {
                order_id,
                signature: Some(signature),
            })
        }
        .await;

        match result {
            Ok(receipt) => {
                self.notify_with_link(scheduled, receipt.signature.as_deref());
                self.refresh_orders_quietly().await;
                Ok(receipt)
            }
            Err(e) => {
                self.report_failure("DCA Scheduling Failed", &e, None);
                Err(e)
            }
        }
    }

    pub async fn cancel_dca(&mut self, order_id: &str) -> Result<OrderReceipt> {
        let cancelled = Toast::error("DCA Schedule Cancelled", "The selected schedule has been cancelled.");

        if self.mode.is_simulated() {
            self.simulation.cancel_dca(order_id)?;
            self.orders.write().await.dca_orders = self.simulation.dca_orders();
            self.notifier.notify(cancelled);
            return Ok(OrderReceipt {
                order_id: Some(order_id.to_string()),
                signature: None,
            });
        }

        let wallet = self.require_wallet()?;
        let result = async {
            let pending = self
                .backends
                .orders
                .cancel_recurring_order(&wallet.pubkey(), order_id)
                .await?;
            let (signed, request_id, _) = sign_pending(wallet.as_ref(), pending).await?;
            self.backends.orders.execute_recurring(&signed, &request_id).await
        }
        .await;

        match result {
            Ok(signature) => {
                self.notify_with_link(cancelled, Some(&signature));
                self.refresh_orders_quietly().await;
                Ok(OrderReceipt {
                    order_id: Some(order_id.to_string()),
                    signature: Some(signature),
                })
            }
            Err(e) => {
                self.report_failure("Cancellation Failed", &e, None);
                Err(e)
            }
        }
    }

    pub async fn refresh_dca(&mut self) -> Result<Vec<RecurringOrder>> {
        let orders = if self.mode.is_simulated() {
            self.simulation.dca_orders()
        } else {
            let wallet = self.require_wallet()?;
            self.backends.orders.active_recurring_orders(&wallet.pubkey()).await?
        };
        let mut book = self.orders.write().await;
        book.dca_orders = orders.clone();
        book.last_refreshed = Some(Utc::now());
        Ok(orders)
    }

    /// When `order` next runs, by the hub's clock.
    pub fn next_dca_run(&self, order: &RecurringOrder) -> DateTime<Utc> {
        order.next_run(self.simulation.clock().now())
    }

    async fn refresh_orders_quietly(&mut self) {
        let Some(wallet) = self.wallet.clone() else {
            return;
        };
        match fetch_live_orders(self.backends.orders.as_ref(), &wallet.pubkey()).await {
            Ok(fresh) => *self.orders.write().await = fresh,
            Err(e) => log_error(&e, "Failed to refresh orders"),
        }
    }

    // --- Polling ---

    /// Starts the background order refresh. Mainnet with a wallet only.
    pub fn start_order_polling(&mut self) -> Result<()> {
        if self.mode.is_simulated() {
            return Err(HubError::validation(
                ValidationErrorKind::Unsupported,
                "Order polling only runs in Mainnet Mode.",
            ));
        }
        let wallet = self.require_wallet()?;
        if self.is_polling() {
            return Ok(());
        }
        self.poller = Some(OrderPoller::spawn(
            self.backends.orders.clone(),
            wallet.pubkey(),
            self.orders.clone(),
            self.settings.order_poll_interval(),
        ));
        Ok(())
    }

    pub async fn stop_order_polling(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.stop().await;
        }
    }

    // --- Pro trader ---

    pub fn pro_trader_notify(&self) {
        self.notifier.notify(Toast::info(
            "Coming Soon!",
            "Advanced trading features are under development. Stay tuned for updates!",
        ));
    }

    // --- Helpers ---

    fn require_wallet(&self) -> Result<Arc<dyn WalletSigner>> {
        self.wallet
            .clone()
            .ok_or_else(|| HubError::wallet(WalletErrorKind::NotConnected, "Wallet not connected"))
    }

    /// Explorer links only make sense for real transactions.
    fn notify_with_link(&self, toast: Toast, signature: Option<&str>) {
        let toast = match signature {
            Some(signature) if self.mode.is_mainnet() => {
                toast.with_link(self.mode.explorer_url(signature, ExplorerKind::Tx))
            }
            _ => toast,
        };
        self.notifier.notify(toast);
    }

    fn report_failure(&self, title: &str, error: &HubError, description: Option<&str>) {
        log_error(error, title);
        let description = description
            .map(str::to_string)
            .unwrap_or_else(|| error.user_message());
        self.notifier.notify(Toast::error(title, description));
    }
}

impl fmt::Debug for WalletHealthHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletHealthHub")
            .field("mode", &self.mode)
            .field("chain", &self.chain)
            .field("view", &self.view)
            .field("wallet", &self.wallet_pubkey())
            .field("dust", &self.dust.len())
            .field("spam", &self.spam.len())
            .finish()
    }
}

/// Keeps the working-set order; `None` selects everything.
fn select_items<T, F>(items: &[T], keys: Option<&[String]>, key: F) -> Vec<T>
where
    T: Clone,
    F: Fn(&T) -> &String,
{
    match keys {
        None => items.to_vec(),
        Some(keys) => items
            .iter()
            .filter(|item| keys.contains(key(item)))
            .cloned()
            .collect(),
    }
}

fn ensure_distinct(input_mint: &str, output_mint: &str) -> Result<()> {
    if input_mint == output_mint {
        return Err(HubError::validation(
            ValidationErrorKind::InvalidInput,
            "Input and output tokens must differ.",
        ));
    }
    Ok(())
}

fn to_raw(mint: &str, ui_amount: f64) -> Result<u64> {
    let decimals = mint_decimals(mint).ok_or_else(|| {
        HubError::validation(
            ValidationErrorKind::Unsupported,
            format!("Unsupported token {}; choose SOL, USDC or JUP.", mint),
        )
    })?;
    let raw = if ui_amount.is_finite() && ui_amount > 0.0 {
        ui_to_raw(ui_amount, decimals)
    } else {
        0
    };
    if raw == 0 {
        return Err(HubError::validation(
            ValidationErrorKind::AmountTooLow,
            "Amount must be greater than zero.",
        ));
    }
    Ok(raw)
}

async fn sign_pending(
    wallet: &dyn WalletSigner,
    pending: PendingOrderTransaction,
) -> Result<(solana_sdk::transaction::VersionedTransaction, String, Option<String>)> {
    if !wallet.supports_signing() {
        return Err(HubError::wallet(
            WalletErrorKind::SigningUnsupported,
            "Wallet does not support signing transactions.",
        ));
    }
    let signed = wallet.sign_transaction(pending.transaction).await?;
    Ok((signed, pending.request_id, pending.order_id))
}

/// Display helper for CLI and logs.
pub fn format_sol(lamports: Option<u64>) -> String {
    match lamports {
        Some(lamports) => format!("{:.4} SOL", lamports_to_sol(lamports)),
        None => "N/A".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jupiter_client::{JUP_MINT, SOL_MINT, USDC_MINT};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_view_round_trip_names() {
        assert_eq!("limit-order".parse::<AppView>().unwrap(), AppView::LimitOrder);
        assert_eq!(AppView::ProTrader.to_string(), "pro-trader");
        assert!(AppView::DcaWizard.shows_orders());
        assert!(!AppView::SpamShield.shows_orders());
    }

    #[test]
    fn test_to_raw() {
        assert_eq!(to_raw(SOL_MINT, 1.0).unwrap(), 1_000_000_000);
        assert_eq!(to_raw(USDC_MINT, 150.0).unwrap(), 150_000_000);
        assert!(to_raw(JUP_MINT, 0.0).unwrap_err().is_validation());
        assert!(to_raw(JUP_MINT, f64::NAN).is_err());
        assert!(to_raw("UnknownMint", 1.0).is_err());
    }

    #[test]
    fn test_select_items_keeps_order() {
        let items = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let keys = vec!["c".to_string(), "a".to_string()];
        assert_eq!(select_items(&items, Some(keys.as_slice()), |s| s), vec!["a".to_string(), "c".to_string()]);
        assert_eq!(select_items(&items, None, |s| s).len(), 3);
    }

    #[test]
    fn test_format_sol() {
        assert_eq!(format_sol(Some(10_000_000)), "0.0100 SOL");
        assert_eq!(format_sol(None), "N/A");
    }
}
