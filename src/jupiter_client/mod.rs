//! Thin client for the Jupiter aggregator REST API: swaps, trigger (limit)
//! orders, recurring (DCA) orders, wallet balances and the strict token list.
//!
//! Every flow has the same shape: ask the aggregator for an unsigned
//! transaction, have the wallet sign it, hand it back to the aggregator's
//! execute endpoint. Nothing here retries; a non-2xx response becomes a
//! `HubError::Api` carrying the aggregator's own error text.

use std::collections::HashMap;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use once_cell::sync::Lazy;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use solana_sdk::transaction::VersionedTransaction;
use tracing::debug;
use wallet_health_types::NetworkMode;

use crate::config::Settings;
use crate::error::{handle_reqwest_error, HubError, Result};

pub mod recurring;
pub mod swap;
pub mod tokens;
pub mod trigger;

pub use recurring::{CreateRecurringOrder, RecurringOrderApi};
pub use swap::{SwapOrder, SwapProvider};
pub use tokens::TokenDirectory;
pub use trigger::{CreateTriggerOrder, PendingOrderTransaction, TriggerOrderApi};

pub const SOL_MINT: &str = "So11111111111111111111111111111111111111112";
pub const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
pub const JUP_MINT: &str = "JUPyiwrYJFskUPiHa7hkeR8VUtAeFoSYbKedZNsDvCN";

const SERVICE: &str = "Jupiter";

/// Decimals of the mints the order forms let a user pick.
static MINT_DECIMALS: Lazy<HashMap<&'static str, u8>> = Lazy::new(|| {
    HashMap::from([(SOL_MINT, 9), (USDC_MINT, 6), (JUP_MINT, 6)])
});

static MINT_SYMBOLS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([(SOL_MINT, "SOL"), (USDC_MINT, "USDC"), (JUP_MINT, "JUP")])
});

pub fn mint_decimals(mint: &str) -> Option<u8> {
    MINT_DECIMALS.get(mint).copied()
}

/// Resolves "SOL"/"USDC"/"JUP" to a mint; anything else is assumed to
/// already be a mint address.
pub fn resolve_mint(symbol_or_mint: &str) -> String {
    MINT_SYMBOLS
        .iter()
        .find(|(_, symbol)| symbol.eq_ignore_ascii_case(symbol_or_mint))
        .map(|(mint, _)| mint.to_string())
        .unwrap_or_else(|| symbol_or_mint.to_string())
}

pub fn mint_symbol(mint: &str) -> Option<&'static str> {
    MINT_SYMBOLS.get(mint).copied()
}

/// Converts a UI amount to base units.
pub fn ui_to_raw(ui_amount: f64, decimals: u8) -> u64 {
    (ui_amount * 10f64.powi(decimals as i32)).round() as u64
}

#[derive(Clone)]
pub struct JupiterClient {
    http: reqwest::Client,
    base_url: String,
    strict_list_url: String,
    network: NetworkMode,
    slippage_bps: u16,
}

impl std::fmt::Debug for JupiterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JupiterClient")
            .field("base_url", &self.base_url)
            .field("network", &self.network)
            .finish()
    }
}

impl JupiterClient {
    /// Create a new Jupiter API client for one network mode.
    pub fn new(base_url: &str, network: NetworkMode) -> Result<Self> {
        Self::build(base_url, network, None)
    }

    pub fn from_settings(settings: &Settings, network: NetworkMode) -> Result<Self> {
        let mut client = Self::build(
            settings.jupiter_api_url(network),
            network,
            settings.request_timeout(),
        )?;
        client.strict_list_url = settings.strict_token_list_url.clone();
        client.slippage_bps = settings.slippage_bps;
        Ok(client)
    }

    fn build(base_url: &str, network: NetworkMode, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| handle_reqwest_error(e, "Failed to build HTTP client"))?;

        Url::parse(base_url)
            .map_err(|e| HubError::ConfigError(format!("Invalid Jupiter API url '{}': {}", base_url, e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            strict_list_url: crate::config::DEFAULT_STRICT_TOKEN_LIST_URL.to_string(),
            network,
            slippage_bps: 50,
        })
    }

    pub fn with_strict_list_url(mut self, url: impl Into<String>) -> Self {
        self.strict_list_url = url.into();
        self
    }

    pub fn network(&self) -> NetworkMode {
        self.network
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn slippage_bps(&self) -> u16 {
        self.slippage_bps
    }

    pub(crate) fn endpoint(&self, path: &str) -> Result<Url> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        Url::parse(&url).map_err(|e| HubError::InternalError(format!("Invalid endpoint '{}': {}", url, e)))
    }

    pub(crate) fn endpoint_with_query(&self, path: &str, query: &[(&str, String)]) -> Result<Url> {
        let mut url = self.endpoint(path)?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: Url, fallback: &str) -> Result<T> {
        debug!(url = %url, "GET");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| handle_reqwest_error(e, fallback))?;
        read_json(response, fallback).await
    }

    pub(crate) async fn post_json<B, T>(&self, path: &str, body: &B, fallback: &str) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        debug!(url = %url, "POST");
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| handle_reqwest_error(e, fallback))?;
        read_json(response, fallback).await
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response, fallback: &str) -> Result<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| handle_reqwest_error(e, fallback))?;

    if !status.is_success() {
        return Err(HubError::api(
            SERVICE,
            api_error_message(&body, fallback),
            Some(status.as_u16()),
        ));
    }

    serde_json::from_str(&body).map_err(|e| {
        HubError::api(
            SERVICE,
            format!("Failed to parse Jupiter response: {}", e),
            Some(status.as_u16()),
        )
    })
}

/// Pulls the aggregator's `error` (or `message`) field out of an error body,
/// falling back to a fixed message when there is none.
pub fn api_error_message(body: &str, fallback: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<String>,
        message: Option<String>,
    }

    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.error.or(parsed.message))
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

/// Result of an aggregator execute call, shared by all three flows.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ExecuteResponse {
    signature: Option<String>,
    status: Option<String>,
    error: Option<String>,
}

impl ExecuteResponse {
    pub(crate) fn into_signature(self, fallback: &str) -> Result<String> {
        let failed = self
            .status
            .as_deref()
            .map(|status| status.eq_ignore_ascii_case("failed"))
            .unwrap_or(false);

        match (failed, self.signature) {
            (false, Some(signature)) if !signature.is_empty() => Ok(signature),
            _ => Err(HubError::api(
                SERVICE,
                self.error.unwrap_or_else(|| fallback.to_string()),
                None,
            )),
        }
    }
}

pub fn decode_transaction(encoded: &str) -> Result<VersionedTransaction> {
    let bytes = BASE64_STANDARD
        .decode(encoded)
        .map_err(|e| HubError::Transaction(format!("Failed to decode base64 transaction: {}", e)))?;
    bincode::deserialize(&bytes)
        .map_err(|e| HubError::Transaction(format!("Failed to deserialize transaction: {}", e)))
}

pub fn encode_transaction(transaction: &VersionedTransaction) -> Result<String> {
    let bytes = bincode::serialize(transaction)
        .map_err(|e| HubError::Transaction(format!("Failed to serialize transaction: {}", e)))?;
    Ok(BASE64_STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_api_error_message_prefers_server_text() {
        assert_eq!(
            api_error_message(r#"{"error":"Insufficient funds"}"#, "Failed to get swap order from Jupiter API."),
            "Insufficient funds"
        );
        assert_eq!(
            api_error_message(r#"{"message":"Order not found"}"#, "fallback"),
            "Order not found"
        );
        assert_eq!(api_error_message("<html>502</html>", "fallback"), "fallback");
        assert_eq!(api_error_message(r#"{"error":""}"#, "fallback"), "fallback");
    }

    #[test]
    fn test_execute_response_failed_status() {
        let ok: ExecuteResponse = serde_json::from_str(r#"{"signature":"5ig","status":"Success"}"#).unwrap();
        assert_eq!(ok.into_signature("x").unwrap(), "5ig");

        let failed: ExecuteResponse =
            serde_json::from_str(r#"{"signature":"5ig","status":"Failed","error":"Slippage exceeded"}"#).unwrap();
        assert_eq!(failed.into_signature("x").unwrap_err().user_message(), "Slippage exceeded");

        let empty: ExecuteResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.into_signature("No signature returned").unwrap_err().user_message(), "No signature returned");
    }

    #[test]
    fn test_endpoint_building() {
        let client = JupiterClient::new("https://lite-api.jup.ag/", NetworkMode::MainnetBeta).unwrap();
        assert_eq!(client.endpoint("/execute").unwrap().as_str(), "https://lite-api.jup.ag/execute");

        let url = client
            .endpoint_with_query("trigger/v1/getTriggerOrders", &[("user", "abc".to_string()), ("orderStatus", "active".to_string())])
            .unwrap();
        assert_eq!(url.as_str(), "https://lite-api.jup.ag/trigger/v1/getTriggerOrders?user=abc&orderStatus=active");
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        assert!(matches!(
            JupiterClient::new("not a url", NetworkMode::Devnet).unwrap_err(),
            HubError::ConfigError(_)
        ));
    }

    #[test]
    fn test_mint_helpers() {
        assert_eq!(resolve_mint("usdc"), USDC_MINT);
        assert_eq!(resolve_mint("SomeMint111"), "SomeMint111");
        assert_eq!(mint_decimals(SOL_MINT), Some(9));
        assert_eq!(ui_to_raw(1.5, 6), 1_500_000);
        assert_eq!(mint_symbol(JUP_MINT), Some("JUP"));
    }
}
