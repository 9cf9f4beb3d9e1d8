//! Shared data model for the wallet health hub: network/chain selection,
//! token holdings and their classified views, aggregator order DTOs and
//! batch progress events.

pub mod events;
pub mod network;
pub mod order;
pub mod token;

pub use events::{BatchItemEvent, BatchItemState};
pub use network::{lamports_to_sol, sol_to_lamports, Chain, ExplorerKind, NetworkMode, PriorityFee};
pub use order::{DcaFrequency, OrderStatus, RecurringOrder, TriggerOrder};
pub use token::{DustToken, SpamToken, TokenAccountBalance, TokenHolding, PLACEHOLDER_ICON};
