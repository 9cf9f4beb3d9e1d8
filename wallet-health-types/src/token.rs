use serde::{Deserialize, Serialize};

/// A fungible (or NFT) balance held by the wallet, as reported by the
/// aggregator's balance endpoint. Refetched on every scan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenHolding {
    pub mint: String,
    pub raw_amount: u64,
    pub ui_amount: f64,
    pub decimals: u8,
    pub symbol: String,
    pub name: String,
    pub logo_uri: Option<String>,
    /// USD price per whole token, 0.0 when the aggregator has none.
    pub price_per_token: f64,
}

impl TokenHolding {
    pub fn usd_value(&self) -> f64 {
        self.ui_amount * self.price_per_token
    }

    /// Zero decimals with a supply of exactly one is treated as an NFT.
    pub fn is_nft(&self) -> bool {
        self.decimals == 0 && self.raw_amount == 1
    }
}

/// A holding small enough to be worth consolidating.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DustToken {
    pub mint: String,
    pub symbol: String,
    pub raw_amount: u64,
    pub ui_amount: f64,
    pub decimals: u8,
    pub logo_uri: Option<String>,
    pub usd_value: f64,
    /// Estimated native token recovered by sweeping, when a SOL price is known.
    pub sol_value: Option<f64>,
}

impl DustToken {
    pub fn from_holding(holding: &TokenHolding, sol_price_usd: Option<f64>) -> Self {
        let usd_value = holding.usd_value();
        let sol_value = sol_price_usd
            .filter(|price| *price > 0.0)
            .map(|price| usd_value / price);

        Self {
            mint: holding.mint.clone(),
            symbol: holding.symbol.clone(),
            raw_amount: holding.raw_amount,
            ui_amount: holding.ui_amount,
            decimals: holding.decimals,
            logo_uri: holding.logo_uri.clone(),
            usd_value,
            sol_value,
        }
    }

    /// Amount formatted the way the sweep list shows it.
    pub fn display_amount(&self) -> String {
        format!("{:.6}", self.ui_amount)
    }
}

/// One SPL token account owned by the wallet, parsed from RPC.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenAccountBalance {
    pub token_account: String,
    pub mint: String,
    pub raw_amount: u64,
    pub ui_amount: f64,
    pub decimals: u8,
}

/// An empty, unverified token account that can be closed to reclaim rent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpamToken {
    pub mint: String,
    pub token_account: String,
    pub name: String,
    pub icon: String,
}

pub const PLACEHOLDER_ICON: &str = "https://placehold.co/32x32.png";

impl SpamToken {
    pub fn new(mint: impl Into<String>, token_account: impl Into<String>) -> Self {
        let mint = mint.into();
        let name = format!("{}...", mint.chars().take(12).collect::<String>());
        Self {
            mint,
            token_account: token_account.into(),
            name,
            icon: PLACEHOLDER_ICON.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holding(decimals: u8, raw_amount: u64, ui_amount: f64, price: f64) -> TokenHolding {
        TokenHolding {
            mint: "MintXYZ".to_string(),
            raw_amount,
            ui_amount,
            decimals,
            symbol: "XYZ".to_string(),
            name: "Xyz".to_string(),
            logo_uri: None,
            price_per_token: price,
        }
    }

    #[test]
    fn test_nft_detection() {
        assert!(holding(0, 1, 1.0, 0.1).is_nft());
        assert!(!holding(0, 2, 2.0, 0.1).is_nft());
        assert!(!holding(6, 1, 0.000001, 0.1).is_nft());
    }

    #[test]
    fn test_dust_sol_value() {
        let dust = DustToken::from_holding(&holding(6, 2_000_000, 2.0, 0.1), Some(100.0));
        assert!((dust.usd_value - 0.2).abs() < 1e-9);
        assert!((dust.sol_value.unwrap() - 0.002).abs() < 1e-9);

        let unknown = DustToken::from_holding(&holding(6, 2_000_000, 2.0, 0.1), None);
        assert_eq!(unknown.sol_value, None);
    }

    #[test]
    fn test_spam_name_truncation() {
        let spam = SpamToken::new("7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU", "acct");
        assert_eq!(spam.name, "7xKXtg2CW87d...");
        assert_eq!(spam.icon, PLACEHOLDER_ICON);
    }
}
