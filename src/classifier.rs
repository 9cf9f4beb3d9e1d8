//! Splits a wallet's holdings into dust (tiny but non-zero value) and spam
//! (empty, unverified token accounts).

use std::collections::HashSet;

use tracing::{debug, warn};
use wallet_health_types::{DustToken, SpamToken, TokenAccountBalance, TokenHolding};

use crate::jupiter_client::{TokenDirectory, JUP_MINT, SOL_MINT, USDC_MINT};

pub const DUST_THRESHOLD_USD: f64 = 0.5;

/// Used when the strict list cannot be fetched.
pub const FALLBACK_STRICT_MINTS: [&str; 3] = [SOL_MINT, USDC_MINT, JUP_MINT];

/// Verified mints excluded from both dust and spam.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrictMintSet {
    mints: HashSet<String>,
}

impl StrictMintSet {
    pub fn new<I, S>(mints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mints: mints.into_iter().map(Into::into).collect(),
        }
    }

    pub fn fallback() -> Self {
        Self::new(FALLBACK_STRICT_MINTS)
    }

    pub fn contains(&self, mint: &str) -> bool {
        self.mints.contains(mint)
    }

    pub fn len(&self) -> usize {
        self.mints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mints.is_empty()
    }
}

/// Fetches the strict list. Never fails: any error degrades to the
/// hardcoded SOL/USDC/JUP set.
pub async fn load_strict_mints(directory: &dyn TokenDirectory) -> StrictMintSet {
    match directory.strict_token_mints().await {
        Ok(mints) if !mints.is_empty() => {
            debug!(count = mints.len(), "Loaded strict token list");
            StrictMintSet::new(mints)
        }
        Ok(_) => {
            warn!("Strict token list was empty, using fallback mints");
            StrictMintSet::fallback()
        }
        Err(e) => {
            warn!(error = %e, "Failed to fetch strict token list, using fallback mints");
            StrictMintSet::fallback()
        }
    }
}

/// USD price of native SOL, if the listing carries one.
pub fn sol_price_from(holdings: &[TokenHolding]) -> Option<f64> {
    holdings
        .iter()
        .find(|h| h.mint == SOL_MINT)
        .map(|h| h.price_per_token)
        .filter(|price| *price > 0.0)
}

pub fn is_dust(holding: &TokenHolding, strict: &StrictMintSet, threshold_usd: f64) -> bool {
    if holding.mint == SOL_MINT || strict.contains(&holding.mint) || holding.is_nft() {
        return false;
    }
    let usd = holding.usd_value();
    usd > 0.0 && usd < threshold_usd
}

/// Dust in scan order.
pub fn classify_dust(holdings: &[TokenHolding], strict: &StrictMintSet, threshold_usd: f64) -> Vec<DustToken> {
    let sol_price = sol_price_from(holdings);
    holdings
        .iter()
        .filter(|holding| is_dust(holding, strict, threshold_usd))
        .map(|holding| DustToken::from_holding(holding, sol_price))
        .collect()
}

/// Empty, unverified token accounts in scan order.
pub fn classify_spam(accounts: &[TokenAccountBalance], strict: &StrictMintSet) -> Vec<SpamToken> {
    accounts
        .iter()
        .filter(|account| account.raw_amount == 0 && !strict.contains(&account.mint))
        .map(|account| SpamToken::new(account.mint.clone(), account.token_account.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{HubError, Result};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use solana_sdk::pubkey::Pubkey;

    fn holding(mint: &str, decimals: u8, raw_amount: u64, ui_amount: f64, price: f64) -> TokenHolding {
        TokenHolding {
            mint: mint.to_string(),
            raw_amount,
            ui_amount,
            decimals,
            symbol: mint.to_string(),
            name: mint.to_string(),
            logo_uri: None,
            price_per_token: price,
        }
    }

    fn account(mint: &str, raw_amount: u64) -> TokenAccountBalance {
        TokenAccountBalance {
            token_account: format!("{}-ata", mint),
            mint: mint.to_string(),
            raw_amount,
            ui_amount: raw_amount as f64,
            decimals: 6,
        }
    }

    #[test]
    fn test_allow_listed_and_zero_value_excluded() {
        let strict = StrictMintSet::new(["MINT_A"]);
        let holdings = vec![
            holding("MINT_A", 6, 100_000, 0.1, 1.0),
            holding("MINT_B", 6, 200_000, 0.2, 1.0),
            holding("MINT_C", 6, 0, 0.0, 1.0),
        ];

        let dust = classify_dust(&holdings, &strict, DUST_THRESHOLD_USD);
        let mints: Vec<&str> = dust.iter().map(|d| d.mint.as_str()).collect();
        assert_eq!(mints, vec!["MINT_B"]);
    }

    #[test]
    fn test_threshold_bounds_and_nft() {
        let strict = StrictMintSet::default();
        let holdings = vec![
            holding("AT_THRESHOLD", 6, 500_000, 0.5, 1.0),
            holding("JUST_BELOW", 6, 499_999, 0.499999, 1.0),
            holding("NO_PRICE", 6, 10, 0.00001, 0.0),
            holding("NFT", 0, 1, 1.0, 0.1),
            holding(SOL_MINT, 9, 1_000, 0.000001, 150.0),
        ];

        let dust = classify_dust(&holdings, &strict, DUST_THRESHOLD_USD);
        assert_eq!(dust.len(), 1);
        assert_eq!(dust[0].mint, "JUST_BELOW");
        assert_eq!(dust[0].sol_value, Some(0.499999 / 150.0));
    }

    #[test]
    fn test_dust_preserves_scan_order() {
        let strict = StrictMintSet::default();
        let holdings: Vec<TokenHolding> = ["Z", "A", "M"]
            .iter()
            .map(|mint| holding(mint, 6, 1, 0.1, 1.0))
            .collect();
        let dust = classify_dust(&holdings, &strict, DUST_THRESHOLD_USD);
        let mints: Vec<&str> = dust.iter().map(|d| d.mint.as_str()).collect();
        assert_eq!(mints, vec!["Z", "A", "M"]);
        assert!(dust.iter().all(|d| d.sol_value.is_none()));
    }

    #[test]
    fn test_spam_membership() {
        let strict = StrictMintSet::fallback();
        let accounts = vec![
            account("SpamMintAAAAAAAAAAAA", 0),
            account("FundedMint", 5),
            account(USDC_MINT, 0),
            account("SpamMintBBBBBBBBBBBB", 0),
        ];

        let spam = classify_spam(&accounts, &strict);
        assert_eq!(spam.len(), 2);
        assert_eq!(spam[0].mint, "SpamMintAAAAAAAAAAAA");
        assert_eq!(spam[0].token_account, "SpamMintAAAAAAAAAAAA-ata");
        assert_eq!(spam[0].name, "SpamMintAAAA...");
        assert_eq!(spam[1].mint, "SpamMintBBBBBBBBBBBB");
    }

    struct FailingDirectory;

    #[async_trait]
    impl TokenDirectory for FailingDirectory {
        async fn balances(&self, _owner: &Pubkey) -> Result<Vec<TokenHolding>> {
            Ok(vec![])
        }

        async fn strict_token_mints(&self) -> Result<Vec<String>> {
            Err(HubError::NetworkError("connection refused".to_string()))
        }
    }

    struct ListDirectory(Vec<String>);

    #[async_trait]
    impl TokenDirectory for ListDirectory {
        async fn balances(&self, _owner: &Pubkey) -> Result<Vec<TokenHolding>> {
            Ok(vec![])
        }

        async fn strict_token_mints(&self) -> Result<Vec<String>> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_strict_list_fallback_on_error() {
        let strict = load_strict_mints(&FailingDirectory).await;
        assert_eq!(strict, StrictMintSet::fallback());
        assert!(strict.contains(SOL_MINT));
        assert!(strict.contains(USDC_MINT));
        assert!(strict.contains(JUP_MINT));
    }

    #[tokio::test]
    async fn test_strict_list_loaded() {
        let strict = load_strict_mints(&ListDirectory(vec!["X".to_string()])).await;
        assert_eq!(strict.len(), 1);
        assert!(strict.contains("X"));

        let empty = load_strict_mints(&ListDirectory(vec![])).await;
        assert_eq!(empty.len(), 3);
    }
}
