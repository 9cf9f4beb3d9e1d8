use async_trait::async_trait;
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, warn};
use wallet_health_types::TokenHolding;

use super::JupiterClient;
use crate::error::{HubError, Result};

const BALANCES_FALLBACK: &str = "Failed to fetch wallet balances.";
const STRICT_LIST_FALLBACK: &str = "Failed to fetch strict token list.";

#[derive(Deserialize, Debug)]
pub(crate) struct BalanceEntry {
    address: String,
    #[serde(default)]
    decimals: u8,
    /// Base units as a decimal string.
    amount: String,
    #[serde(rename = "uiAmount", default)]
    ui_amount: Option<f64>,
    symbol: Option<String>,
    name: Option<String>,
    #[serde(rename = "logoURI")]
    logo_uri: Option<String>,
    price_per_token: Option<f64>,
}

impl BalanceEntry {
    fn into_holding(self) -> Option<TokenHolding> {
        let raw_amount = match self.amount.parse::<u64>() {
            Ok(raw) => raw,
            Err(e) => {
                warn!(mint = %self.address, amount = %self.amount, "Skipping balance with unparsable amount: {}", e);
                return None;
            }
        };
        let ui_amount = self
            .ui_amount
            .unwrap_or_else(|| raw_amount as f64 / 10f64.powi(self.decimals as i32));
        let symbol = self.symbol.unwrap_or_default();

        Some(TokenHolding {
            name: self.name.unwrap_or_else(|| symbol.clone()),
            symbol,
            mint: self.address,
            raw_amount,
            ui_amount,
            decimals: self.decimals,
            logo_uri: self.logo_uri,
            price_per_token: self.price_per_token.unwrap_or(0.0),
        })
    }
}

pub(crate) fn holdings_from_entries(entries: Vec<BalanceEntry>) -> Vec<TokenHolding> {
    entries.into_iter().filter_map(BalanceEntry::into_holding).collect()
}

#[derive(Deserialize, Debug)]
struct StrictToken {
    address: String,
}

/// Wallet balances and the verified-token list.
#[async_trait]
pub trait TokenDirectory: Send + Sync {
    async fn balances(&self, owner: &Pubkey) -> Result<Vec<TokenHolding>>;

    /// Mint addresses of the verified ("strict") token list.
    async fn strict_token_mints(&self) -> Result<Vec<String>>;
}

#[async_trait]
impl TokenDirectory for JupiterClient {
    async fn balances(&self, owner: &Pubkey) -> Result<Vec<TokenHolding>> {
        let url = self.endpoint(&format!("balances/{}", owner))?;
        let entries: Vec<BalanceEntry> = self.get_json(url, BALANCES_FALLBACK).await?;
        let holdings = holdings_from_entries(entries);
        debug!(owner = %owner, count = holdings.len(), "Fetched wallet balances");
        Ok(holdings)
    }

    async fn strict_token_mints(&self) -> Result<Vec<String>> {
        let url = reqwest::Url::parse(&self.strict_list_url)
            .map_err(|e| HubError::ConfigError(format!("Invalid strict token list url: {}", e)))?;
        let tokens: Vec<StrictToken> = self.get_json(url, STRICT_LIST_FALLBACK).await?;
        Ok(tokens.into_iter().map(|token| token.address).collect())
    }
}
