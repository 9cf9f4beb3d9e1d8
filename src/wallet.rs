//! Wallet provider seam. The hub never holds keys itself; it asks a
//! `WalletSigner` to sign aggregator-built or locally-built transactions.

use crate::error::{HubError, Result, WalletErrorKind};
use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::VersionedTransaction;
use std::sync::Arc;
use tracing::{debug, info};

#[async_trait]
pub trait WalletSigner: Send + Sync {
    fn pubkey(&self) -> Pubkey;

    /// Some wallets can only connect, not sign.
    fn supports_signing(&self) -> bool {
        true
    }

    async fn sign_transaction(&self, transaction: VersionedTransaction) -> Result<VersionedTransaction>;

    /// Signs a batch in one prompt. Wallets without native batch support
    /// fall back to signing one by one.
    async fn sign_all_transactions(
        &self,
        transactions: Vec<VersionedTransaction>,
    ) -> Result<Vec<VersionedTransaction>> {
        let mut signed = Vec::with_capacity(transactions.len());
        for transaction in transactions {
            signed.push(self.sign_transaction(transaction).await?);
        }
        Ok(signed)
    }
}

/// Local keypair wallet used by the CLI.
#[derive(Clone)]
pub struct KeypairWallet {
    keypair: Arc<Keypair>,
}

impl std::fmt::Debug for KeypairWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeypairWallet")
            .field("pubkey", &self.keypair.pubkey())
            .finish()
    }
}

impl KeypairWallet {
    pub fn new(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
        }
    }

    /// Builds the wallet from a base58-encoded 64-byte secret key.
    pub fn from_base58(private_key_bs58: &str) -> Result<Self> {
        let private_key_bytes = bs58::decode(private_key_bs58.trim())
            .into_vec()
            .map_err(|e| HubError::ConfigError(format!("Invalid base58 private key: {}", e)))?;

        let keypair = Keypair::from_bytes(&private_key_bytes)
            .map_err(|e| HubError::ConfigError(format!("Failed to create keypair from bytes: {}", e)))?;

        info!(wallet = %keypair.pubkey(), "Local keypair wallet loaded");
        Ok(Self::new(keypair))
    }
}

#[async_trait]
impl WalletSigner for KeypairWallet {
    fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn sign_transaction(&self, transaction: VersionedTransaction) -> Result<VersionedTransaction> {
        sign_with_keypair(transaction, &self.keypair)
    }
}

/// Places the keypair's signature in its signer slot, keeping any
/// signatures the aggregator already attached.
pub fn sign_with_keypair(mut transaction: VersionedTransaction, keypair: &Keypair) -> Result<VersionedTransaction> {
    let pubkey = keypair.pubkey();
    let required = transaction.message.header().num_required_signatures as usize;

    let position = transaction
        .message
        .static_account_keys()
        .iter()
        .take(required)
        .position(|key| *key == pubkey)
        .ok_or_else(|| {
            HubError::wallet(
                WalletErrorKind::SignerMismatch,
                format!("{} is not a required signer of this transaction", pubkey),
            )
        })?;

    if transaction.signatures.len() < required {
        transaction.signatures.resize(required, Signature::default());
    }

    let message_bytes = transaction.message.serialize();
    transaction.signatures[position] = keypair.sign_message(&message_bytes);
    debug!(signer = %pubkey, slot = position, "Transaction signed");

    Ok(transaction)
}
