//! Solana RPC access: native balance, token accounts, blockhash and
//! transaction submission.

use std::sync::Arc;

use async_trait::async_trait;
use solana_account_decoder::UiAccountData;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_request::TokenAccountsFilter;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::VersionedTransaction;
use tracing::{debug, info, warn};
use wallet_health_types::TokenAccountBalance;

use crate::error::Result;

#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Native balance in lamports.
    async fn get_balance(&self, owner: &Pubkey) -> Result<u64>;

    /// Every SPL token account the owner holds, empty ones included.
    async fn get_token_accounts(&self, owner: &Pubkey) -> Result<Vec<TokenAccountBalance>>;

    async fn get_latest_blockhash(&self) -> Result<Hash>;

    /// Submits and waits for confirmation. A transaction that lands but
    /// fails on chain is an error.
    async fn send_and_confirm(&self, transaction: &VersionedTransaction) -> Result<Signature>;
}

pub struct RpcChainClient {
    rpc: Arc<RpcClient>,
}

impl RpcChainClient {
    pub fn new(rpc_url: &str) -> Self {
        info!(rpc_url, "Connecting to Solana RPC");
        Self {
            rpc: Arc::new(RpcClient::new_with_commitment(
                rpc_url.to_string(),
                CommitmentConfig::confirmed(),
            )),
        }
    }

    pub fn url(&self) -> String {
        self.rpc.url()
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn get_balance(&self, owner: &Pubkey) -> Result<u64> {
        let lamports = self.rpc.get_balance(owner).await?;
        debug!(owner = %owner, lamports, "Fetched native balance");
        Ok(lamports)
    }

    async fn get_token_accounts(&self, owner: &Pubkey) -> Result<Vec<TokenAccountBalance>> {
        let accounts = self
            .rpc
            .get_token_accounts_by_owner(owner, TokenAccountsFilter::ProgramId(spl_token::id()))
            .await?;

        let balances: Vec<TokenAccountBalance> = accounts
            .into_iter()
            .filter_map(|keyed| match keyed.account.data {
                UiAccountData::Json(parsed) => parse_token_account(&keyed.pubkey, &parsed.parsed),
                _ => {
                    warn!(account = %keyed.pubkey, "Token account returned without parsed data");
                    None
                }
            })
            .collect();

        debug!(owner = %owner, count = balances.len(), "Fetched token accounts");
        Ok(balances)
    }

    async fn get_latest_blockhash(&self) -> Result<Hash> {
        Ok(self.rpc.get_latest_blockhash().await?)
    }

    async fn send_and_confirm(&self, transaction: &VersionedTransaction) -> Result<Signature> {
        let signature = self.rpc.send_and_confirm_transaction(transaction).await?;
        info!(%signature, "Transaction confirmed");
        Ok(signature)
    }
}

/// Reads the `info` block of a jsonParsed SPL token account.
pub fn parse_token_account(pubkey: &str, parsed: &serde_json::Value) -> Option<TokenAccountBalance> {
    let info = parsed.get("info")?;
    let mint = info.get("mint")?.as_str()?.to_string();
    let token_amount = info.get("tokenAmount")?;
    let raw_amount = token_amount.get("amount")?.as_str()?.parse::<u64>().ok()?;
    let decimals = token_amount.get("decimals")?.as_u64()? as u8;
    let ui_amount = token_amount
        .get("uiAmount")
        .and_then(|v| v.as_f64())
        .unwrap_or_else(|| raw_amount as f64 / 10f64.powi(decimals as i32));

    Some(TokenAccountBalance {
        token_account: pubkey.to_string(),
        mint,
        raw_amount,
        ui_amount,
        decimals,
    })
}
