use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::transaction::VersionedTransaction;
use tracing::{debug, info};
use wallet_health_types::PriorityFee;

use super::{decode_transaction, encode_transaction, ExecuteResponse, JupiterClient, SERVICE};
use crate::error::{HubError, Result};

const ORDER_FALLBACK: &str = "Failed to get swap order from Jupiter API.";
const EXECUTE_FALLBACK: &str = "Failed to execute swap with Jupiter API.";

/// An unsigned swap transaction built by the aggregator for one wallet.
#[derive(Debug, Clone)]
pub struct SwapOrder {
    pub transaction: VersionedTransaction,
    pub request_id: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct OrderResponse {
    #[serde(alias = "tx")]
    transaction: Option<String>,
    request_id: Option<String>,
    error_message: Option<String>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ExecuteRequest<'a> {
    transaction: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_id: Option<&'a str>,
}

/// The swap half of the aggregator, as the sweep orchestrator sees it.
#[async_trait]
pub trait SwapProvider: Send + Sync {
    async fn swap_order(
        &self,
        input_mint: &str,
        output_mint: &str,
        amount: u64,
        user: &Pubkey,
    ) -> Result<SwapOrder>;

    /// Submits a signed swap; returns the transaction signature.
    async fn execute_swap(&self, signed: &VersionedTransaction, request_id: Option<&str>) -> Result<String>;
}

impl JupiterClient {
    pub fn order_url(&self, input_mint: &str, output_mint: &str, amount: u64, user: &Pubkey) -> Result<Url> {
        let priority_fee = match self.network().priority_fee() {
            PriorityFee::Auto => "auto".to_string(),
            PriorityFee::Lamports(lamports) => lamports.to_string(),
        };
        self.endpoint_with_query(
            "order",
            &[
                ("inputMint", input_mint.to_string()),
                ("outputMint", output_mint.to_string()),
                ("amount", amount.to_string()),
                ("taker", user.to_string()),
                ("slippageBps", self.slippage_bps().to_string()),
                ("prioritizationFeeLamports", priority_fee),
            ],
        )
    }
}

#[async_trait]
impl SwapProvider for JupiterClient {
    async fn swap_order(
        &self,
        input_mint: &str,
        output_mint: &str,
        amount: u64,
        user: &Pubkey,
    ) -> Result<SwapOrder> {
        let url = self.order_url(input_mint, output_mint, amount, user)?;
        debug!(input_mint, output_mint, amount, "Requesting swap order");

        let response: OrderResponse = self.get_json(url, ORDER_FALLBACK).await?;
        let encoded = response.transaction.filter(|tx| !tx.is_empty()).ok_or_else(|| {
            HubError::api(
                SERVICE,
                response.error_message.unwrap_or_else(|| ORDER_FALLBACK.to_string()),
                None,
            )
        })?;

        Ok(SwapOrder {
            transaction: decode_transaction(&encoded)?,
            request_id: response.request_id,
        })
    }

    async fn execute_swap(&self, signed: &VersionedTransaction, request_id: Option<&str>) -> Result<String> {
        let request = ExecuteRequest {
            transaction: encode_transaction(signed)?,
            request_id,
        };
        let response: ExecuteResponse = self.post_json("execute", &request, EXECUTE_FALLBACK).await?;
        let signature = response.into_signature(EXECUTE_FALLBACK)?;
        info!(%signature, "Swap executed");
        Ok(signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wallet_health_types::NetworkMode;

    #[test]
    fn test_order_url_devnet_uses_zero_priority_fee() {
        let client = JupiterClient::new("https://lite-api.jup.ag", NetworkMode::Devnet).unwrap();
        let user = Pubkey::new_unique();
        let url = client.order_url("MintA", "MintB", 120, &user).unwrap();

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(url.path(), "/order");
        assert!(pairs.contains(&("amount".to_string(), "120".to_string())));
        assert!(pairs.contains(&("taker".to_string(), user.to_string())));
        assert!(pairs.contains(&("slippageBps".to_string(), "50".to_string())));
        assert!(pairs.contains(&("prioritizationFeeLamports".to_string(), "0".to_string())));
    }

    #[test]
    fn test_order_url_mainnet_uses_auto_priority_fee() {
        let client = JupiterClient::new("https://lite-api.jup.ag", NetworkMode::MainnetBeta).unwrap();
        let url = client.order_url("MintA", "MintB", 1, &Pubkey::new_unique()).unwrap();
        assert!(url.query().unwrap().contains("prioritizationFeeLamports=auto"));
    }

    #[test]
    fn test_order_response_accepts_tx_alias() {
        let parsed: OrderResponse = serde_json::from_str(r#"{"tx":"AQID","requestId":"r1"}"#).unwrap();
        assert_eq!(parsed.transaction.as_deref(), Some("AQID"));
        assert_eq!(parsed.request_id.as_deref(), Some("r1"));

        let missing: OrderResponse =
            serde_json::from_str(r#"{"transaction":null,"errorMessage":"Insufficient funds"}"#).unwrap();
        assert!(missing.transaction.is_none());
        assert_eq!(missing.error_message.as_deref(), Some("Insufficient funds"));
    }

    #[test]
    fn test_execute_request_shape() {
        let request = ExecuteRequest {
            transaction: "AQID".to_string(),
            request_id: None,
        };
        assert_eq!(serde_json::to_string(&request).unwrap(), r#"{"transaction":"AQID"}"#);
    }
}
