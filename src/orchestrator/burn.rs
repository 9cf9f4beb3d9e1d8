//! Closing empty spam token accounts to reclaim their rent.
//!
//! Live burns pack close-account instructions five to a transaction, ask the
//! wallet to sign every chunk in one go when the first chunk starts signing,
//! then submit the chunks one by one.

use async_trait::async_trait;
use parking_lot::Mutex;
use solana_sdk::compute_budget::ComputeBudgetInstruction;
use solana_sdk::hash::Hash;
use solana_sdk::message::{Message, VersionedMessage};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::VersionedTransaction;
use std::str::FromStr;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};
use wallet_health_types::{BatchItemEvent, SpamToken};

use super::batch::{run_sequential, BatchReport, ItemProcessor, ItemStep};
use crate::chain::ChainClient;
use crate::error::{HubError, Result, ValidationErrorKind, WalletErrorKind};
use crate::simulation::{SimulationStore, SOL_RECOVERY_PER_ACCOUNT_LAMPORTS};
use crate::wallet::WalletSigner;

pub const CLOSE_ACCOUNTS_PER_TX: usize = 5;
pub const BURN_COMPUTE_UNIT_PRICE_MICRO_LAMPORTS: u64 = 1_000;

/// Accounts closed by one transaction.
#[derive(Debug, Clone)]
pub struct BurnChunk {
    pub accounts: Vec<SpamToken>,
}

#[derive(Debug)]
pub struct BurnOutcome {
    pub report: BatchReport,
    /// Accounts in confirmed chunks.
    pub burned: Vec<SpamToken>,
    pub recovered_lamports: u64,
}

impl BurnOutcome {
    fn from_report(report: BatchReport, chunks: &[BurnChunk]) -> Self {
        let burned: Vec<SpamToken> = chunks
            .iter()
            .take(report.succeeded())
            .flat_map(|chunk| chunk.accounts.iter().cloned())
            .collect();
        let recovered_lamports = burned.len() as u64 * SOL_RECOVERY_PER_ACCOUNT_LAMPORTS;
        Self {
            report,
            burned,
            recovered_lamports,
        }
    }
}

fn chunk_accounts(selected: &[SpamToken]) -> Vec<BurnChunk> {
    selected
        .chunks(CLOSE_ACCOUNTS_PER_TX)
        .map(|accounts| BurnChunk {
            accounts: accounts.to_vec(),
        })
        .collect()
}

fn ensure_selection(selected: &[SpamToken]) -> Result<()> {
    if selected.is_empty() {
        return Err(HubError::validation(
            ValidationErrorKind::NothingSelected,
            "Select at least one spam token to burn.",
        ));
    }
    Ok(())
}

/// One unsigned transaction closing `accounts`, rent going back to `owner`.
pub fn build_close_transaction(owner: &Pubkey, accounts: &[SpamToken], blockhash: Hash) -> Result<VersionedTransaction> {
    let mut instructions = Vec::with_capacity(accounts.len() + 1);
    instructions.push(ComputeBudgetInstruction::set_compute_unit_price(
        BURN_COMPUTE_UNIT_PRICE_MICRO_LAMPORTS,
    ));

    for spam in accounts {
        let account = Pubkey::from_str(&spam.token_account).map_err(|e| {
            HubError::validation(
                ValidationErrorKind::InvalidInput,
                format!("Invalid token account {}: {}", spam.token_account, e),
            )
        })?;
        let close = spl_token::instruction::close_account(&spl_token::id(), &account, owner, owner, &[])
            .map_err(|e| HubError::Transaction(format!("Failed to build close instruction: {}", e)))?;
        instructions.push(close);
    }

    let message = Message::new_with_blockhash(&instructions, Some(owner), &blockhash);
    let required = message.header.num_required_signatures as usize;
    Ok(VersionedTransaction {
        signatures: vec![Signature::default(); required],
        message: VersionedMessage::Legacy(message),
    })
}

/// Submits chunks in order. The first chunk to reach its signing step asks
/// the wallet to sign every chunk in one prompt; later chunks pick up their
/// already-signed transaction.
struct LiveBurner<'a> {
    chain: &'a dyn ChainClient,
    wallet: &'a dyn WalletSigner,
    unsigned: Vec<VersionedTransaction>,
    signed: Mutex<Option<Vec<VersionedTransaction>>>,
}

impl LiveBurner<'_> {
    async fn signed_transaction(&self, index: usize) -> Result<VersionedTransaction> {
        let cached = self.signed.lock().as_ref().map(|signed| signed.get(index).cloned());
        if let Some(transaction) = cached {
            return transaction.ok_or_else(|| missing_chunk(index));
        }

        let signed = self.wallet.sign_all_transactions(self.unsigned.clone()).await?;
        if signed.len() != self.unsigned.len() {
            return Err(HubError::wallet(
                WalletErrorKind::Rejected,
                "Wallet returned fewer signed transactions than requested.",
            ));
        }
        info!(chunks = signed.len(), "Close transactions signed");

        let transaction = signed
            .get(index)
            .cloned()
            .ok_or_else(|| missing_chunk(index))?;
        *self.signed.lock() = Some(signed);
        Ok(transaction)
    }
}

fn missing_chunk(index: usize) -> HubError {
    HubError::InternalError(format!("No signed transaction for burn chunk {}", index))
}

#[async_trait]
impl ItemProcessor<BurnChunk> for LiveBurner<'_> {
    fn label(&self, item: &BurnChunk) -> String {
        format!("{} accounts", item.accounts.len())
    }

    async fn process(&self, _item: &BurnChunk, step: &ItemStep<'_>) -> Result<String> {
        step.signing();
        let transaction = self.signed_transaction(step.index()).await?;
        step.submitting();
        let signature = self.chain.send_and_confirm(&transaction).await?;
        Ok(signature.to_string())
    }
}

/// Builds, batch-signs and submits close transactions for `selected`.
pub async fn burn_live(
    chain: &dyn ChainClient,
    wallet: &dyn WalletSigner,
    selected: &[SpamToken],
    events: Option<UnboundedSender<BatchItemEvent>>,
) -> Result<BurnOutcome> {
    ensure_selection(selected)?;
    if !wallet.supports_signing() {
        return Err(HubError::wallet(
            WalletErrorKind::SigningUnsupported,
            "Wallet not connected or doesn't support batch transactions",
        ));
    }

    let owner = wallet.pubkey();
    let blockhash = chain.get_latest_blockhash().await?;

    let chunks = chunk_accounts(selected);
    let unsigned = chunks
        .iter()
        .map(|chunk| build_close_transaction(&owner, &chunk.accounts, blockhash))
        .collect::<Result<Vec<_>>>()?;
    debug!(chunks = chunks.len(), accounts = selected.len(), "Close transactions built");

    let burner = LiveBurner {
        chain,
        wallet,
        unsigned,
        signed: Mutex::new(None),
    };
    let report = run_sequential("burn", &chunks, &burner, events).await;
    Ok(BurnOutcome::from_report(report, &chunks))
}

struct SimulatedBurner<'a> {
    store: &'a SimulationStore,
}

#[async_trait]
impl ItemProcessor<BurnChunk> for SimulatedBurner<'_> {
    fn label(&self, item: &BurnChunk) -> String {
        format!("{} accounts", item.accounts.len())
    }

    async fn process(&self, item: &BurnChunk, step: &ItemStep<'_>) -> Result<String> {
        let accounts: Vec<String> = item
            .accounts
            .iter()
            .map(|spam| spam.token_account.clone())
            .collect();
        step.signing();
        step.submitting();
        self.store.burn(&accounts).await
    }
}

pub async fn burn_simulated(
    store: &SimulationStore,
    selected: &[SpamToken],
    events: Option<UnboundedSender<BatchItemEvent>>,
) -> Result<BurnOutcome> {
    ensure_selection(selected)?;
    let chunks = chunk_accounts(selected);
    let report = run_sequential("burn", &chunks, &SimulatedBurner { store }, events).await;
    Ok(BurnOutcome::from_report(report, &chunks))
}
