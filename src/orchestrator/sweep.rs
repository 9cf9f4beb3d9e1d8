use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use tracing::debug;
use wallet_health_types::{Chain, DustToken};

use super::batch::{ItemProcessor, ItemStep};
use crate::error::{HubError, Result, WalletErrorKind};
use crate::jupiter_client::{SwapProvider, SOL_MINT, USDC_MINT};
use crate::simulation::SimulationStore;
use crate::wallet::WalletSigner;

/// What dust gets swapped into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SweepDestination {
    #[default]
    Sol,
    Usdc,
}

impl SweepDestination {
    pub fn output_mint(&self) -> &'static str {
        match self {
            SweepDestination::Sol => SOL_MINT,
            SweepDestination::Usdc => USDC_MINT,
        }
    }

    /// Symbol shown to the user; on EVM chains "native" means the chain's
    /// own gas token.
    pub fn symbol(&self, chain: Chain) -> &'static str {
        match self {
            SweepDestination::Sol => chain.native_symbol(),
            SweepDestination::Usdc => "USDC",
        }
    }
}

impl fmt::Display for SweepDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SweepDestination::Sol => f.write_str("sol"),
            SweepDestination::Usdc => f.write_str("usdc"),
        }
    }
}

impl FromStr for SweepDestination {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sol" | "native" => Ok(SweepDestination::Sol),
            "usdc" => Ok(SweepDestination::Usdc),
            _ => Err(format!("Invalid sweep destination: {}", s)),
        }
    }
}

fn ensure_can_sign(wallet: &dyn WalletSigner) -> Result<()> {
    if wallet.supports_signing() {
        Ok(())
    } else {
        Err(HubError::wallet(
            WalletErrorKind::SigningUnsupported,
            "Wallet does not support signing transactions.",
        ))
    }
}

/// Swaps dust through the aggregator: order → sign → execute.
pub struct LiveSweeper<'a> {
    swaps: &'a dyn SwapProvider,
    wallet: &'a dyn WalletSigner,
    destination: SweepDestination,
}

impl<'a> LiveSweeper<'a> {
    pub fn new(swaps: &'a dyn SwapProvider, wallet: &'a dyn WalletSigner, destination: SweepDestination) -> Self {
        Self {
            swaps,
            wallet,
            destination,
        }
    }
}

#[async_trait]
impl ItemProcessor<DustToken> for LiveSweeper<'_> {
    fn label(&self, item: &DustToken) -> String {
        item.symbol.clone()
    }

    async fn process(&self, item: &DustToken, step: &ItemStep<'_>) -> Result<String> {
        ensure_can_sign(self.wallet)?;
        let user = self.wallet.pubkey();

        let order = self
            .swaps
            .swap_order(&item.mint, self.destination.output_mint(), item.raw_amount, &user)
            .await?;
        debug!(symbol = %item.symbol, request_id = ?order.request_id, "Swap order received");

        step.signing();
        let signed = self.wallet.sign_transaction(order.transaction).await?;

        step.submitting();
        self.swaps
            .execute_swap(&signed, order.request_id.as_deref())
            .await
    }
}

/// Sweeps against the simulation store, one delay per item.
pub struct SimulatedSweeper<'a> {
    store: &'a SimulationStore,
    chain: Chain,
    destination: SweepDestination,
}

impl<'a> SimulatedSweeper<'a> {
    pub fn new(store: &'a SimulationStore, chain: Chain, destination: SweepDestination) -> Self {
        Self {
            store,
            chain,
            destination,
        }
    }
}

#[async_trait]
impl ItemProcessor<DustToken> for SimulatedSweeper<'_> {
    fn label(&self, item: &DustToken) -> String {
        item.symbol.clone()
    }

    async fn process(&self, item: &DustToken, step: &ItemStep<'_>) -> Result<String> {
        step.signing();
        step.submitting();
        self.store
            .sweep_item(self.chain, &item.mint, self.destination.output_mint())
            .await
    }
}
