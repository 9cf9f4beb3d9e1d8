// Public modules that are part of the API
pub mod chain;
pub mod classifier;
pub mod config;
pub mod error;
pub mod hub;
pub mod jupiter_client;
pub mod monitoring;
pub mod orchestrator;
pub mod orders;
pub mod simulation;
pub mod wallet;

// Re-export common types
pub use hub::{AppView, BackendFactory, Backends, OrderReceipt, WalletHealthHub};

pub use classifier::{classify_dust, classify_spam, StrictMintSet, DUST_THRESHOLD_USD};

pub use orchestrator::{BatchReport, BurnOutcome, SweepDestination};

pub use simulation::{Clock, ManualClock, SimulationStore, SystemClock, REFUEL_OPTIONS};

pub use error::{HubError, Result};

pub use config::Settings;

pub use wallet_health_types as types;
