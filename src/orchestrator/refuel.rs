use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;
use wallet_health_types::{BatchItemEvent, NetworkMode};

use super::batch::{run_sequential, BatchReport, ItemProcessor, ItemStep};
use crate::error::{HubError, Result, WalletErrorKind};
use crate::jupiter_client::{SwapProvider, SOL_MINT};
use crate::simulation::{RefuelOption, SimulationStore};
use crate::wallet::WalletSigner;

/// Below this a mainnet wallet is considered low on gas.
pub const LOW_SOL_THRESHOLD_LAMPORTS: u64 = 50_000_000;

/// Refueling is always allowed on devnet. On mainnet only once the balance
/// is known and under the threshold.
pub fn refuel_allowed(mode: NetworkMode, sol_lamports: Option<u64>) -> bool {
    if mode.is_simulated() {
        return true;
    }
    matches!(sol_lamports, Some(lamports) if lamports < LOW_SOL_THRESHOLD_LAMPORTS)
}

struct LiveRefueler<'a> {
    swaps: &'a dyn SwapProvider,
    wallet: &'a dyn WalletSigner,
}

#[async_trait]
impl ItemProcessor<RefuelOption> for LiveRefueler<'_> {
    fn label(&self, item: &RefuelOption) -> String {
        format!("{} {}", item.input_ui_amount(), item.input_symbol)
    }

    async fn process(&self, item: &RefuelOption, step: &ItemStep<'_>) -> Result<String> {
        if !self.wallet.supports_signing() {
            return Err(HubError::wallet(
                WalletErrorKind::SigningUnsupported,
                "Wallet does not support signing transactions.",
            ));
        }
        let order = self
            .swaps
            .swap_order(item.input_mint, SOL_MINT, item.input_amount, &self.wallet.pubkey())
            .await?;

        step.signing();
        let signed = self.wallet.sign_transaction(order.transaction).await?;

        step.submitting();
        self.swaps
            .execute_swap(&signed, order.request_id.as_deref())
            .await
    }
}

struct SimulatedRefueler<'a> {
    store: &'a SimulationStore,
}

#[async_trait]
impl ItemProcessor<RefuelOption> for SimulatedRefueler<'_> {
    fn label(&self, item: &RefuelOption) -> String {
        format!("{} {}", item.input_ui_amount(), item.input_symbol)
    }

    async fn process(&self, item: &RefuelOption, step: &ItemStep<'_>) -> Result<String> {
        step.signing();
        step.submitting();
        self.store.refuel(item).await
    }
}

/// Swaps the option's input into SOL. A one-item batch, so a failure
/// surfaces as the report's `failure`.
pub async fn refuel_live(
    swaps: &dyn SwapProvider,
    wallet: &dyn WalletSigner,
    option: RefuelOption,
    events: Option<UnboundedSender<BatchItemEvent>>,
) -> BatchReport {
    run_sequential("refuel", &[option], &LiveRefueler { swaps, wallet }, events).await
}

pub async fn refuel_simulated(
    store: &SimulationStore,
    option: RefuelOption,
    events: Option<UnboundedSender<BatchItemEvent>>,
) -> BatchReport {
    run_sequential("refuel", &[option], &SimulatedRefueler { store }, events).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jupiter_client::USDC_MINT;
    use crate::simulation::{ManualClock, SimulationDelays, REFUEL_OPTIONS};
    use std::sync::Arc;

    #[test]
    fn test_refuel_allowed() {
        assert!(refuel_allowed(NetworkMode::Devnet, None));
        assert!(refuel_allowed(NetworkMode::Devnet, Some(10_000_000_000)));
        assert!(refuel_allowed(NetworkMode::MainnetBeta, Some(49_999_999)));
        assert!(!refuel_allowed(NetworkMode::MainnetBeta, Some(50_000_000)));
        assert!(!refuel_allowed(NetworkMode::MainnetBeta, None));
    }

    #[tokio::test]
    async fn test_simulated_refuel_report() {
        let store = SimulationStore::new(Arc::new(ManualClock::default()), SimulationDelays::default());
        let report = refuel_simulated(&store, REFUEL_OPTIONS[0], None).await;
        assert!(report.is_complete());
        assert!(report.last_signature().unwrap().starts_with("sim-"));
        assert_eq!(store.token_balance(USDC_MINT), 49_000_000);
    }
}
