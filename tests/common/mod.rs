// Hand-written fakes shared by the integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::VersionedTransaction;

use wallet_health::chain::ChainClient;
use wallet_health::error::{HubError, Result, WalletErrorKind};
use wallet_health::hub::Backends;
use wallet_health::jupiter_client::{
    CreateRecurringOrder, CreateTriggerOrder, PendingOrderTransaction, RecurringOrderApi, SwapOrder, SwapProvider,
    TokenDirectory, TriggerOrderApi,
};
use wallet_health::types::{DustToken, OrderStatus, RecurringOrder, TokenAccountBalance, TokenHolding, TriggerOrder};
use wallet_health::wallet::WalletSigner;

pub struct FakeWallet {
    pub pubkey: Pubkey,
    pub can_sign: bool,
    pub rejects: bool,
    pub prompts: AtomicUsize,
}

impl FakeWallet {
    pub fn new() -> Self {
        Self {
            pubkey: Pubkey::new_unique(),
            can_sign: true,
            rejects: false,
            prompts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl WalletSigner for FakeWallet {
    fn pubkey(&self) -> Pubkey {
        self.pubkey
    }

    fn supports_signing(&self) -> bool {
        self.can_sign
    }

    async fn sign_transaction(&self, transaction: VersionedTransaction) -> Result<VersionedTransaction> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        if self.rejects {
            return Err(HubError::wallet(WalletErrorKind::Rejected, "User rejected the request."));
        }
        Ok(transaction)
    }

    async fn sign_all_transactions(&self, transactions: Vec<VersionedTransaction>) -> Result<Vec<VersionedTransaction>> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        if self.rejects {
            return Err(HubError::wallet(WalletErrorKind::Rejected, "User rejected the request."));
        }
        Ok(transactions)
    }
}

/// Swap provider that fails for one input mint and records every order.
#[derive(Default)]
pub struct FakeSwaps {
    pub fail_on: Option<String>,
    pub ordered: Mutex<Vec<String>>,
    pub executed: AtomicUsize,
}

impl FakeSwaps {
    pub fn failing_on(mint: &str) -> Self {
        Self {
            fail_on: Some(mint.to_string()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl SwapProvider for FakeSwaps {
    async fn swap_order(&self, input_mint: &str, _output_mint: &str, _amount: u64, _user: &Pubkey) -> Result<SwapOrder> {
        self.ordered.lock().push(input_mint.to_string());
        if self.fail_on.as_deref() == Some(input_mint) {
            return Err(HubError::api("Jupiter", "No route found", Some(400)));
        }
        Ok(SwapOrder {
            transaction: VersionedTransaction::default(),
            request_id: Some(format!("req-{}", input_mint)),
        })
    }

    async fn execute_swap(&self, _signed: &VersionedTransaction, request_id: Option<&str>) -> Result<String> {
        self.executed.fetch_add(1, Ordering::SeqCst);
        Ok(format!("sig-{}", request_id.unwrap_or("none")))
    }
}

#[derive(Default)]
pub struct FakeDirectory {
    pub holdings: Vec<TokenHolding>,
    pub strict: Vec<String>,
    pub strict_fails: bool,
}

#[async_trait]
impl TokenDirectory for FakeDirectory {
    async fn balances(&self, _owner: &Pubkey) -> Result<Vec<TokenHolding>> {
        Ok(self.holdings.clone())
    }

    async fn strict_token_mints(&self) -> Result<Vec<String>> {
        if self.strict_fails {
            return Err(HubError::api("Jupiter", "Service unavailable", Some(503)));
        }
        Ok(self.strict.clone())
    }
}

/// Chain client whose `fail_on_send`-th submission (0-based) fails.
#[derive(Default)]
pub struct FakeChain {
    pub balance: u64,
    pub accounts: Vec<TokenAccountBalance>,
    pub fail_on_send: Option<usize>,
    pub sent: AtomicUsize,
}

#[async_trait]
impl ChainClient for FakeChain {
    async fn get_balance(&self, _owner: &Pubkey) -> Result<u64> {
        Ok(self.balance)
    }

    async fn get_token_accounts(&self, _owner: &Pubkey) -> Result<Vec<TokenAccountBalance>> {
        Ok(self.accounts.clone())
    }

    async fn get_latest_blockhash(&self) -> Result<Hash> {
        Ok(Hash::default())
    }

    async fn send_and_confirm(&self, _transaction: &VersionedTransaction) -> Result<Signature> {
        let attempt = self.sent.fetch_add(1, Ordering::SeqCst);
        if self.fail_on_send == Some(attempt) {
            return Err(HubError::SolanaRpc("Transaction simulation failed".to_string()));
        }
        Ok(Signature::new_unique())
    }
}

/// Order API that counts list calls and hands back fixed pending transactions.
#[derive(Default)]
pub struct FakeOrders {
    pub polls: AtomicUsize,
    pub created: Mutex<Vec<CreateTriggerOrder>>,
    pub recurring: Mutex<Vec<CreateRecurringOrder>>,
}

fn pending(order_id: &str) -> PendingOrderTransaction {
    PendingOrderTransaction {
        request_id: format!("req-{}", order_id),
        transaction: VersionedTransaction::default(),
        order_id: Some(order_id.to_string()),
    }
}

#[async_trait]
impl TriggerOrderApi for FakeOrders {
    async fn create_trigger_order(&self, order: &CreateTriggerOrder) -> Result<PendingOrderTransaction> {
        self.created.lock().push(order.clone());
        Ok(pending("limit-1"))
    }

    async fn cancel_trigger_order(&self, _maker: &Pubkey, order_id: &str) -> Result<PendingOrderTransaction> {
        Ok(pending(order_id))
    }

    async fn execute_trigger(&self, _signed: &VersionedTransaction, request_id: &str) -> Result<String> {
        Ok(format!("sig-{}", request_id))
    }

    async fn open_trigger_orders(&self, maker: &Pubkey) -> Result<Vec<TriggerOrder>> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![TriggerOrder {
            id: "limit-1".to_string(),
            maker: maker.to_string(),
            input_mint: "So11111111111111111111111111111111111111112".to_string(),
            output_mint: "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v".to_string(),
            making_amount: 1_000_000_000,
            taking_amount: 200_000_000,
            status: OrderStatus::Open,
            created_at: None,
        }])
    }
}

#[async_trait]
impl RecurringOrderApi for FakeOrders {
    async fn create_recurring_order(&self, order: &CreateRecurringOrder) -> Result<PendingOrderTransaction> {
        self.recurring.lock().push(order.clone());
        Ok(pending("dca-1"))
    }

    async fn cancel_recurring_order(&self, _user: &Pubkey, order_id: &str) -> Result<PendingOrderTransaction> {
        Ok(pending(order_id))
    }

    async fn execute_recurring(&self, _signed: &VersionedTransaction, request_id: &str) -> Result<String> {
        Ok(format!("sig-{}", request_id))
    }

    async fn active_recurring_orders(&self, _user: &Pubkey) -> Result<Vec<RecurringOrder>> {
        Ok(vec![])
    }
}

pub struct Fakes {
    pub swaps: Arc<FakeSwaps>,
    pub tokens: Arc<FakeDirectory>,
    pub orders: Arc<FakeOrders>,
    pub chain: Arc<FakeChain>,
}

impl Fakes {
    pub fn new(swaps: FakeSwaps, tokens: FakeDirectory, chain: FakeChain) -> Self {
        Self {
            swaps: Arc::new(swaps),
            tokens: Arc::new(tokens),
            orders: Arc::new(FakeOrders::default()),
            chain: Arc::new(chain),
        }
    }

    pub fn backends(&self) -> Backends {
        Backends {
            swaps: self.swaps.clone(),
            tokens: self.tokens.clone(),
            orders: self.orders.clone(),
            chain: self.chain.clone(),
        }
    }
}

impl Default for Fakes {
    fn default() -> Self {
        Self::new(FakeSwaps::default(), FakeDirectory::default(), FakeChain::default())
    }
}

pub fn holding(mint: &str, symbol: &str, ui_amount: f64, decimals: u8, price: f64) -> TokenHolding {
    TokenHolding {
        mint: mint.to_string(),
        raw_amount: (ui_amount * 10f64.powi(decimals as i32)).round() as u64,
        ui_amount,
        decimals,
        symbol: symbol.to_string(),
        name: symbol.to_string(),
        logo_uri: None,
        price_per_token: price,
    }
}

pub fn dust(mint: &str) -> DustToken {
    DustToken::from_holding(&holding(mint, mint, 1.0, 6, 0.1), None)
}
