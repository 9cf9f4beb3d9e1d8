//! In-memory stand-in for the chain and the aggregator on the test network.
//!
//! Every mutation waits on the injected [`Clock`] before it touches state, so
//! callers see the same latency shape as a real transaction. The lock is
//! only ever taken for short synchronous sections, never across a sleep.

pub mod clock;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, info};
use uuid::Uuid;
use wallet_health_types::{
    sol_to_lamports, Chain, DcaFrequency, DustToken, OrderStatus, RecurringOrder, SpamToken, TriggerOrder,
    PLACEHOLDER_ICON,
};

pub use clock::{Clock, ManualClock, SystemClock};

use crate::config::Settings;
use crate::error::{HubError, Result, ValidationErrorKind};
use crate::jupiter_client::{mint_symbol, JUP_MINT, SOL_MINT, USDC_MINT};

/// Rent returned when one token account is closed.
pub const SOL_RECOVERY_PER_ACCOUNT_LAMPORTS: u64 = 2_039_280;

/// Mock SOL price used to credit simulated sweeps.
pub const SIM_SOL_PRICE_USD: f64 = 150.0;

/// Maker recorded on orders created against the simulation.
pub const SIMULATED_MAKER: &str = "simulated-user";

const SEED_SOL_LAMPORTS: u64 = 10_000_000;
const SEED_USDC_RAW: u64 = 50_000_000;
const SEED_JUP_RAW: u64 = 20_000_000;

/// A fixed "spend X to get ~Y SOL" refuel choice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefuelOption {
    pub input_mint: &'static str,
    pub input_symbol: &'static str,
    /// Base units of the input mint.
    pub input_amount: u64,
    pub input_decimals: u8,
    pub estimated_sol: f64,
}

impl RefuelOption {
    pub fn input_ui_amount(&self) -> f64 {
        self.input_amount as f64 / 10f64.powi(self.input_decimals as i32)
    }

    pub fn estimated_lamports(&self) -> u64 {
        sol_to_lamports(self.estimated_sol)
    }

    pub fn label(&self) -> String {
        format!(
            "{} {} → ~{} SOL",
            self.input_ui_amount(),
            self.input_symbol,
            self.estimated_sol
        )
    }
}

pub const REFUEL_OPTIONS: [RefuelOption; 3] = [
    RefuelOption {
        input_mint: USDC_MINT,
        input_symbol: "USDC",
        input_amount: 1_000_000,
        input_decimals: 6,
        estimated_sol: 0.007,
    },
    RefuelOption {
        input_mint: USDC_MINT,
        input_symbol: "USDC",
        input_amount: 2_000_000,
        input_decimals: 6,
        estimated_sol: 0.014,
    },
    RefuelOption {
        input_mint: JUP_MINT,
        input_symbol: "JUP",
        input_amount: 5_000_000,
        input_decimals: 6,
        estimated_sol: 0.035,
    },
];

/// Artificial latency per simulated mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationDelays {
    pub sweep: Duration,
    pub burn: Duration,
    pub refuel: Duration,
    pub dca: Duration,
}

impl Default for SimulationDelays {
    fn default() -> Self {
        Self {
            sweep: Duration::from_millis(1500),
            burn: Duration::from_millis(1500),
            refuel: Duration::from_millis(2000),
            dca: Duration::from_millis(1500),
        }
    }
}

impl SimulationDelays {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            sweep: Duration::from_millis(settings.sweep_delay_ms),
            burn: Duration::from_millis(settings.burn_delay_ms),
            refuel: Duration::from_millis(settings.refuel_delay_ms),
            dca: Duration::from_millis(settings.dca_delay_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationState {
    pub sol_lamports: u64,
    /// Base-unit balances of non-native mints.
    pub token_balances: HashMap<String, u64>,
    pub dust: HashMap<Chain, Vec<DustToken>>,
    pub spam: Vec<SpamToken>,
    pub limit_orders: Vec<TriggerOrder>,
    pub dca_orders: Vec<RecurringOrder>,
    spam_batches: u32,
}

fn mock_dust(mint: &str, symbol: &str, raw_amount: u64, ui_amount: f64, decimals: u8, price: f64) -> DustToken {
    let usd_value = ui_amount * price;
    DustToken {
        mint: mint.to_string(),
        symbol: symbol.to_string(),
        raw_amount,
        ui_amount,
        decimals,
        logo_uri: Some(PLACEHOLDER_ICON.to_string()),
        usd_value,
        sol_value: Some(usd_value / SIM_SOL_PRICE_USD),
    }
}

fn mock_spam(batch: u32, count: u32) -> Vec<SpamToken> {
    (0..count)
        .map(|i| {
            let mint = format!("SpamAirdrop{:02}{:02}xxxxxxxxxxxxxxxxxxxxxxxxxxxxxx", batch, i);
            let account = format!("SpamAccount{:02}{:02}yyyyyyyyyyyyyyyyyyyyyyyyyyyyyy", batch, i);
            SpamToken::new(mint, account)
        })
        .collect()
}

impl SimulationState {
    /// Fixed sample data the test network starts from.
    pub fn seeded() -> Self {
        let solana_dust = vec![
            mock_dust("lowb-mint-addr", "LOWB", 120, 0.0012, 5, 50.0),
            mock_dust("tiny-mint-addr", "TINY", 50, 0.0005, 5, 100.0),
            mock_dust("kuzu-mint-addr", "屑", 1_530, 1.53, 3, 0.2),
            mock_dust("peanut-mint-addr", "PEANUT", 10_200, 10.2, 3, 0.04),
        ];
        let evm_dust = vec![
            mock_dust("pepe-eth-addr", "PEPE", 100_000_000, 10_000.0, 4, 0.00001),
            mock_dust("akita-eth-addr", "AKITA", 5_000_000_000, 50_000.0, 5, 0.000002),
        ];

        let now = Utc::now();
        Self {
            sol_lamports: SEED_SOL_LAMPORTS,
            token_balances: HashMap::from([
                (USDC_MINT.to_string(), SEED_USDC_RAW),
                (JUP_MINT.to_string(), SEED_JUP_RAW),
            ]),
            dust: HashMap::from([
                (Chain::Solana, solana_dust),
                (Chain::Ethereum, evm_dust.clone()),
                (Chain::Polygon, evm_dust),
            ]),
            spam: mock_spam(0, 3),
            limit_orders: vec![TriggerOrder {
                id: "sim-limit-1".to_string(),
                maker: SIMULATED_MAKER.to_string(),
                input_mint: SOL_MINT.to_string(),
                output_mint: USDC_MINT.to_string(),
                making_amount: 1_000_000_000,
                taking_amount: 150_000_000,
                status: OrderStatus::Open,
                created_at: Some(now),
            }],
            dca_orders: vec![
                RecurringOrder {
                    id: "sim-dca-1".to_string(),
                    user: SIMULATED_MAKER.to_string(),
                    input_mint: USDC_MINT.to_string(),
                    output_mint: SOL_MINT.to_string(),
                    in_amount_per_cycle: 100_000_000,
                    number_of_orders: 4,
                    frequency: DcaFrequency::Weekly,
                    start_at: now,
                    status: OrderStatus::Open,
                },
                RecurringOrder {
                    id: "sim-dca-2".to_string(),
                    user: SIMULATED_MAKER.to_string(),
                    input_mint: SOL_MINT.to_string(),
                    output_mint: JUP_MINT.to_string(),
                    in_amount_per_cycle: 5_000_000_000,
                    number_of_orders: 3,
                    frequency: DcaFrequency::Monthly,
                    start_at: now,
                    status: OrderStatus::Open,
                },
            ],
            spam_batches: 1,
        }
    }

    pub fn token_balance(&self, mint: &str) -> u64 {
        if mint == SOL_MINT {
            return self.sol_lamports;
        }
        self.token_balances.get(mint).copied().unwrap_or(0)
    }

    fn credit(&mut self, mint: &str, amount: u64) {
        if mint == SOL_MINT {
            self.sol_lamports = self.sol_lamports.saturating_add(amount);
        } else {
            let balance = self.token_balances.entry(mint.to_string()).or_insert(0);
            *balance = balance.saturating_add(amount);
        }
    }

    fn debit(&mut self, mint: &str, amount: u64) -> Result<()> {
        let available = self.token_balance(mint);
        if available < amount {
            return Err(insufficient(mint));
        }
        if mint == SOL_MINT {
            self.sol_lamports = available - amount;
        } else {
            self.token_balances.insert(mint.to_string(), available - amount);
        }
        Ok(())
    }
}

fn insufficient(mint: &str) -> HubError {
    HubError::validation(
        ValidationErrorKind::InsufficientBalance,
        format!("Insufficient {} balance.", mint_symbol(mint).unwrap_or(mint)),
    )
}

fn fake_signature() -> String {
    format!("sim-{}", Uuid::new_v4().simple())
}

/// New order parameters as the simulation records them, amounts in base units.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedLimitOrder {
    pub input_mint: String,
    pub output_mint: String,
    pub making_amount: u64,
    pub taking_amount: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedDca {
    pub input_mint: String,
    pub output_mint: String,
    pub in_amount_per_cycle: u64,
    pub number_of_orders: u32,
    pub frequency: DcaFrequency,
    pub start_at: Option<chrono::DateTime<Utc>>,
}

pub struct SimulationStore {
    state: Mutex<SimulationState>,
    clock: Arc<dyn Clock>,
    delays: SimulationDelays,
}

impl std::fmt::Debug for SimulationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationStore")
            .field("delays", &self.delays)
            .finish()
    }
}

impl SimulationStore {
    pub fn new(clock: Arc<dyn Clock>, delays: SimulationDelays) -> Self {
        Self {
            state: Mutex::new(SimulationState::seeded()),
            clock,
            delays,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn delays(&self) -> SimulationDelays {
        self.delays
    }

    pub fn reset(&self) {
        *self.state.lock() = SimulationState::seeded();
        info!("Simulation state reset to seed data");
    }

    pub fn snapshot(&self) -> SimulationState {
        self.state.lock().clone()
    }

    pub fn sol_lamports(&self) -> u64 {
        self.state.lock().sol_lamports
    }

    pub fn token_balance(&self, mint: &str) -> u64 {
        self.state.lock().token_balance(mint)
    }

    pub fn dust_tokens(&self, chain: Chain) -> Vec<DustToken> {
        self.state.lock().dust.get(&chain).cloned().unwrap_or_default()
    }

    pub fn spam_tokens(&self) -> Vec<SpamToken> {
        self.state.lock().spam.clone()
    }

    pub fn limit_orders(&self) -> Vec<TriggerOrder> {
        self.state.lock().limit_orders.clone()
    }

    pub fn dca_orders(&self) -> Vec<RecurringOrder> {
        self.state.lock().dca_orders.clone()
    }

    /// Swaps one dust token into `output_mint` after the sweep delay. On
    /// Solana the proceeds are credited at the mock SOL price; EVM dust
    /// simply disappears.
    pub async fn sweep_item(&self, chain: Chain, mint: &str, output_mint: &str) -> Result<String> {
        self.find_dust(chain, mint)?;
        self.clock.sleep(self.delays.sweep).await;

        let mut state = self.state.lock();
        let list = state.dust.entry(chain).or_default();
        let position = list
            .iter()
            .position(|token| token.mint == mint)
            .ok_or_else(|| dust_missing(mint))?;
        let token = list.remove(position);

        if chain == Chain::Solana {
            let proceeds = if output_mint == USDC_MINT {
                (token.usd_value * 1_000_000.0).round() as u64
            } else {
                sol_to_lamports(token.usd_value / SIM_SOL_PRICE_USD)
            };
            state.credit(output_mint, proceeds);
        }

        debug!(?chain, symbol = %token.symbol, "Simulated sweep applied");
        Ok(fake_signature())
    }

    fn find_dust(&self, chain: Chain, mint: &str) -> Result<()> {
        let state = self.state.lock();
        state
            .dust
            .get(&chain)
            .and_then(|list| list.iter().find(|token| token.mint == mint))
            .map(|_| ())
            .ok_or_else(|| dust_missing(mint))
    }

    /// Closes a chunk of spam accounts and credits their rent.
    pub async fn burn(&self, token_accounts: &[String]) -> Result<String> {
        if token_accounts.is_empty() {
            return Err(HubError::validation(
                ValidationErrorKind::NothingSelected,
                "Select at least one spam token to burn.",
            ));
        }
        {
            let state = self.state.lock();
            if let Some(missing) = token_accounts
                .iter()
                .find(|account| !state.spam.iter().any(|spam| &spam.token_account == *account))
            {
                return Err(HubError::validation(
                    ValidationErrorKind::InvalidInput,
                    format!("Token account {} is not a spam account.", missing),
                ));
            }
        }

        self.clock.sleep(self.delays.burn).await;

        let mut state = self.state.lock();
        let before = state.spam.len();
        state
            .spam
            .retain(|spam| !token_accounts.contains(&spam.token_account));
        let closed = (before - state.spam.len()) as u64;
        state.sol_lamports = state
            .sol_lamports
            .saturating_add(closed * SOL_RECOVERY_PER_ACCOUNT_LAMPORTS);

        debug!(closed, "Simulated burn applied");
        Ok(fake_signature())
    }

    /// Validates the balance up front, then waits out the refuel delay.
    pub async fn refuel(&self, option: &RefuelOption) -> Result<String> {
        if self.token_balance(option.input_mint) < option.input_amount {
            return Err(insufficient(option.input_mint));
        }

        self.clock.sleep(self.delays.refuel).await;

        let mut state = self.state.lock();
        state.debit(option.input_mint, option.input_amount)?;
        state.credit(SOL_MINT, option.estimated_lamports());
        info!(
            spent = option.input_amount,
            symbol = option.input_symbol,
            lamports = option.estimated_lamports(),
            "Simulated refuel applied"
        );
        Ok(fake_signature())
    }

    /// "Scan for more": appends three fresh spam accounts.
    pub fn add_more_spam(&self) -> Vec<SpamToken> {
        let mut state = self.state.lock();
        let fresh = mock_spam(state.spam_batches, 3);
        state.spam_batches += 1;
        state.spam.extend(fresh.iter().cloned());
        fresh
    }

    pub fn create_limit_order(&self, order: SimulatedLimitOrder) -> Result<TriggerOrder> {
        if order.making_amount == 0 || order.taking_amount == 0 {
            return Err(HubError::validation(
                ValidationErrorKind::AmountTooLow,
                "Amounts must be greater than zero.",
            ));
        }
        let created = TriggerOrder {
            id: format!("sim-limit-{}", Uuid::new_v4().simple()),
            maker: SIMULATED_MAKER.to_string(),
            input_mint: order.input_mint,
            output_mint: order.output_mint,
            making_amount: order.making_amount,
            taking_amount: order.taking_amount,
            status: OrderStatus::Open,
            created_at: Some(self.clock.now()),
        };
        self.state.lock().limit_orders.insert(0, created.clone());
        Ok(created)
    }

    pub fn cancel_limit_order(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock();
        let position = state
            .limit_orders
            .iter()
            .position(|order| order.id == id)
            .ok_or_else(|| order_missing(id))?;
        state.limit_orders.remove(position);
        Ok(())
    }

    pub async fn create_dca(&self, dca: SimulatedDca) -> Result<RecurringOrder> {
        if dca.number_of_orders < 2 {
            return Err(HubError::validation(
                ValidationErrorKind::InvalidInput,
                "A DCA schedule needs at least 2 orders.",
            ));
        }
        if dca.in_amount_per_cycle == 0 {
            return Err(HubError::validation(
                ValidationErrorKind::AmountTooLow,
                "Amount per order must be greater than zero.",
            ));
        }

        self.clock.sleep(self.delays.dca).await;

        let created = RecurringOrder {
            id: format!("sim-dca-{}", Uuid::new_v4().simple()),
            user: SIMULATED_MAKER.to_string(),
            input_mint: dca.input_mint,
            output_mint: dca.output_mint,
            in_amount_per_cycle: dca.in_amount_per_cycle,
            number_of_orders: dca.number_of_orders,
            frequency: dca.frequency,
            start_at: dca.start_at.unwrap_or_else(|| self.clock.now()),
            status: OrderStatus::Open,
        };
        self.state.lock().dca_orders.insert(0, created.clone());
        Ok(created)
    }

    pub fn cancel_dca(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock();
        let position = state
            .dca_orders
            .iter()
            .position(|order| order.id == id)
            .ok_or_else(|| order_missing(id))?;
        state.dca_orders.remove(position);
        Ok(())
    }
}

fn dust_missing(mint: &str) -> HubError {
    HubError::validation(
        ValidationErrorKind::InvalidInput,
        format!("Token {} is not in the dust list.", mint),
    )
}

fn order_missing(id: &str) -> HubError {
    HubError::validation(ValidationErrorKind::InvalidInput, format!("Order {} not found.", id))
}
