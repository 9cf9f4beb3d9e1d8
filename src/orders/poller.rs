use std::sync::Arc;
use std::time::Duration;

use solana_sdk::pubkey::Pubkey;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::{fetch_live_orders, OrderSource, SharedOrderBook};

/// Commands for controlling the order poller.
#[derive(Debug)]
pub enum PollerCommand {
    Shutdown,
}

/// Background task refreshing the shared order book on a fixed interval.
/// The first refresh happens immediately.
pub struct OrderPoller {
    cmd_tx: mpsc::Sender<PollerCommand>,
    handle: JoinHandle<()>,
    maker: Pubkey,
}

impl OrderPoller {
    pub fn spawn(source: Arc<dyn OrderSource>, maker: Pubkey, book: SharedOrderBook, period: Duration) -> Self {
        let (cmd_tx, mut cmd_rx) = mpsc::channel::<PollerCommand>(1);

        let handle = tokio::spawn(async move {
            info!(maker = %maker, period_secs = period.as_secs(), "Order poller started");
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = cmd_rx.recv() => break,
                    _ = ticker.tick() => {
                        // A shutdown mid-fetch drops the fetch, so nothing
                        // is written after stop() returns.
                        tokio::select! {
                            biased;
                            _ = cmd_rx.recv() => break,
                            fetched = fetch_live_orders(source.as_ref(), &maker) => match fetched {
                                Ok(fresh) => {
                                    *book.write().await = fresh;
                                    metrics::increment_counter!("wallet_health_order_refreshes");
                                    debug!(maker = %maker, "Order book refreshed");
                                }
                                Err(e) => warn!(maker = %maker, error = %e, "Order refresh failed, keeping previous list"),
                            },
                        }
                    }
                }
            }
            info!(maker = %maker, "Order poller stopped");
        });

        Self { cmd_tx, handle, maker }
    }

    pub fn maker(&self) -> Pubkey {
        self.maker
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Signals shutdown and waits for the task to exit.
    pub async fn stop(self) {
        if self.cmd_tx.send(PollerCommand::Shutdown).await.is_err() {
            debug!("Order poller already exited");
        }
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Order poller task ended abnormally");
        }
    }
}
