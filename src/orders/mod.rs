//! Local cache of the wallet's limit and DCA orders.
//!
//! The cache is mode-scoped: on mainnet it mirrors the aggregator, on devnet
//! the simulation store. It is cleared whenever the network mode changes.

pub mod poller;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use solana_sdk::pubkey::Pubkey;
use tokio::sync::RwLock;
use tracing::debug;
use wallet_health_types::{RecurringOrder, TriggerOrder};

use crate::error::Result;
use crate::jupiter_client::{RecurringOrderApi, TriggerOrderApi};

pub use poller::{OrderPoller, PollerCommand};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderBook {
    pub limit_orders: Vec<TriggerOrder>,
    pub dca_orders: Vec<RecurringOrder>,
    pub last_refreshed: Option<DateTime<Utc>>,
}

impl OrderBook {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.limit_orders.is_empty() && self.dca_orders.is_empty()
    }
}

pub type SharedOrderBook = Arc<RwLock<OrderBook>>;

pub fn shared_order_book() -> SharedOrderBook {
    Arc::new(RwLock::new(OrderBook::default()))
}

/// Where live orders come from. Blanket-implemented for anything that
/// speaks both order APIs.
pub trait OrderSource: TriggerOrderApi + RecurringOrderApi {}

impl<T: TriggerOrderApi + RecurringOrderApi + ?Sized> OrderSource for T {}

/// Fetches both order lists from the aggregator. Nothing is written unless
/// both calls succeed.
pub async fn fetch_live_orders(source: &dyn OrderSource, maker: &Pubkey) -> Result<OrderBook> {
    let (limit_orders, dca_orders) = futures::try_join!(
        source.open_trigger_orders(maker),
        source.active_recurring_orders(maker)
    )?;
    debug!(
        maker = %maker,
        limit = limit_orders.len(),
        dca = dca_orders.len(),
        "Fetched live orders"
    );
    Ok(OrderBook {
        limit_orders,
        dca_orders,
        last_refreshed: Some(Utc::now()),
    })
}
