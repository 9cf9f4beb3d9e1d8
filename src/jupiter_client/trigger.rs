//! Trigger (limit) orders. Creating or cancelling one is a two-step dance:
//! the aggregator returns an unsigned transaction plus a request id, the
//! wallet signs, and the signed transaction goes back through `execute`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::transaction::VersionedTransaction;
use tracing::{debug, info};
use wallet_health_types::{OrderStatus, TriggerOrder};

use super::{
    decode_transaction, encode_transaction, mint_decimals, ui_to_raw, ExecuteResponse, JupiterClient, SERVICE,
};
use crate::error::{HubError, Result};

const CREATE_FALLBACK: &str = "Failed to create limit order.";
const CANCEL_FALLBACK: &str = "Failed to cancel limit order.";
const EXECUTE_FALLBACK: &str = "Failed to submit limit order transaction.";
const LIST_FALLBACK: &str = "Failed to fetch limit orders.";

/// Parameters for a new limit order, amounts in base units.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTriggerOrder {
    pub maker: Pubkey,
    pub input_mint: String,
    pub output_mint: String,
    pub making_amount: u64,
    pub taking_amount: u64,
}

/// An unsigned transaction the wallet must sign before `execute`.
#[derive(Debug, Clone)]
pub struct PendingOrderTransaction {
    pub request_id: String,
    pub transaction: VersionedTransaction,
    /// Order account the transaction creates, when the aggregator says.
    pub order_id: Option<String>,
}

#[async_trait]
pub trait TriggerOrderApi: Send + Sync {
    async fn create_trigger_order(&self, order: &CreateTriggerOrder) -> Result<PendingOrderTransaction>;
    async fn cancel_trigger_order(&self, maker: &Pubkey, order_id: &str) -> Result<PendingOrderTransaction>;
    async fn execute_trigger(&self, signed: &VersionedTransaction, request_id: &str) -> Result<String>;
    async fn open_trigger_orders(&self, maker: &Pubkey) -> Result<Vec<TriggerOrder>>;
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CreateOrderRequest {
    input_mint: String,
    output_mint: String,
    maker: String,
    payer: String,
    params: CreateOrderParams,
    compute_unit_price: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CreateOrderParams {
    making_amount: String,
    taking_amount: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CancelOrderRequest<'a> {
    maker: String,
    order: &'a str,
    compute_unit_price: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ExecuteRequest<'a> {
    signed_transaction: String,
    request_id: &'a str,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct OrderTransactionResponse {
    order: Option<String>,
    transaction: Option<String>,
    request_id: Option<String>,
}

impl OrderTransactionResponse {
    fn into_pending(self, fallback: &str) -> Result<PendingOrderTransaction> {
        match (self.transaction, self.request_id) {
            (Some(transaction), Some(request_id)) => Ok(PendingOrderTransaction {
                request_id,
                transaction: decode_transaction(&transaction)?,
                order_id: self.order,
            }),
            _ => Err(HubError::api(SERVICE, fallback, None)),
        }
    }
}

#[derive(Deserialize, Debug)]
struct TriggerOrdersResponse {
    #[serde(default)]
    orders: Vec<TriggerOrderEntry>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TriggerOrderEntry {
    order_key: String,
    user_pubkey: String,
    input_mint: String,
    output_mint: String,
    raw_making_amount: Option<String>,
    making_amount: Option<String>,
    raw_taking_amount: Option<String>,
    taking_amount: Option<String>,
    status: Option<String>,
    created_at: Option<String>,
}

/// Prefers the raw base-unit string; falls back to scaling the UI amount
/// when the mint's decimals are known.
fn parse_amount(raw: Option<&str>, ui: Option<&str>, mint: &str) -> u64 {
    if let Some(raw) = raw.and_then(|r| r.parse::<u64>().ok()) {
        return raw;
    }
    let ui = ui.and_then(|u| u.parse::<f64>().ok()).unwrap_or(0.0);
    match mint_decimals(mint) {
        Some(decimals) => ui_to_raw(ui, decimals),
        None => ui.round() as u64,
    }
}

pub(crate) fn parse_created_at(value: Option<&str>) -> Option<DateTime<Utc>> {
    value
        .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

impl TriggerOrderEntry {
    pub(crate) fn into_order(self) -> TriggerOrder {
        TriggerOrder {
            making_amount: parse_amount(
                self.raw_making_amount.as_deref(),
                self.making_amount.as_deref(),
                &self.input_mint,
            ),
            taking_amount: parse_amount(
                self.raw_taking_amount.as_deref(),
                self.taking_amount.as_deref(),
                &self.output_mint,
            ),
            status: self
                .status
                .as_deref()
                .map(OrderStatus::from_api)
                .unwrap_or(OrderStatus::Open),
            created_at: parse_created_at(self.created_at.as_deref()),
            id: self.order_key,
            maker: self.user_pubkey,
            input_mint: self.input_mint,
            output_mint: self.output_mint,
        }
    }
}

#[async_trait]
impl TriggerOrderApi for JupiterClient {
    async fn create_trigger_order(&self, order: &CreateTriggerOrder) -> Result<PendingOrderTransaction> {
        let request = CreateOrderRequest {
            input_mint: order.input_mint.clone(),
            output_mint: order.output_mint.clone(),
            maker: order.maker.to_string(),
            payer: order.maker.to_string(),
            params: CreateOrderParams {
                making_amount: order.making_amount.to_string(),
                taking_amount: order.taking_amount.to_string(),
            },
            compute_unit_price: self.network().priority_fee().to_string(),
        };
        debug!(?request, "Creating trigger order");

        let response: OrderTransactionResponse = self
            .post_json("trigger/v1/createOrder", &request, CREATE_FALLBACK)
            .await?;
        response.into_pending(CREATE_FALLBACK)
    }

    async fn cancel_trigger_order(&self, maker: &Pubkey, order_id: &str) -> Result<PendingOrderTransaction> {
        let request = CancelOrderRequest {
            maker: maker.to_string(),
            order: order_id,
            compute_unit_price: self.network().priority_fee().to_string(),
        };
        let response: OrderTransactionResponse = self
            .post_json("trigger/v1/cancelOrder", &request, CANCEL_FALLBACK)
            .await?;
        let mut pending = response.into_pending(CANCEL_FALLBACK)?;
        pending.order_id.get_or_insert_with(|| order_id.to_string());
        Ok(pending)
    }

    async fn execute_trigger(&self, signed: &VersionedTransaction, request_id: &str) -> Result<String> {
        let request = ExecuteRequest {
            signed_transaction: encode_transaction(signed)?,
            request_id,
        };
        let response: ExecuteResponse = self
            .post_json("trigger/v1/execute", &request, EXECUTE_FALLBACK)
            .await?;
        let signature = response.into_signature(EXECUTE_FALLBACK)?;
        info!(%signature, request_id, "Trigger order transaction executed");
        Ok(signature)
    }

    async fn open_trigger_orders(&self, maker: &Pubkey) -> Result<Vec<TriggerOrder>> {
        let url = self.endpoint_with_query(
            "trigger/v1/getTriggerOrders",
            &[("user", maker.to_string()), ("orderStatus", "active".to_string())],
        )?;
        let response: TriggerOrdersResponse = self.get_json(url, LIST_FALLBACK).await?;
        Ok(response
            .orders
            .into_iter()
            .map(TriggerOrderEntry::into_order)
            .collect())
    }
}
