//! Sequential, abort-on-first-failure execution of sweep, burn and refuel
//! batches, live or simulated.

pub mod batch;
pub mod burn;
pub mod refuel;
pub mod sweep;

pub use batch::{run_sequential, BatchReport, ConfirmedItem, FailedItem, ItemProcessor, ItemStep, ProgressReporter};
pub use burn::{burn_live, burn_simulated, BurnOutcome, CLOSE_ACCOUNTS_PER_TX};
pub use refuel::{refuel_allowed, refuel_live, refuel_simulated, LOW_SOL_THRESHOLD_LAMPORTS};
pub use sweep::{LiveSweeper, SimulatedSweeper, SweepDestination};
