//! Recurring (time-based DCA) orders.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::transaction::VersionedTransaction;
use tracing::{debug, info};
use wallet_health_types::{DcaFrequency, OrderStatus, RecurringOrder};

use super::trigger::{parse_created_at, PendingOrderTransaction};
use super::{encode_transaction, ExecuteResponse, JupiterClient};
use crate::error::{HubError, Result, ValidationErrorKind};

const CREATE_FALLBACK: &str = "Failed to create DCA schedule.";
const CANCEL_FALLBACK: &str = "Failed to cancel DCA schedule.";
const EXECUTE_FALLBACK: &str = "Failed to submit DCA transaction.";
const LIST_FALLBACK: &str = "Failed to fetch DCA schedules.";
const RECURRING_TYPE: &str = "time";

/// Parameters for a new DCA schedule. `in_amount` is the total to spend,
/// split evenly across `number_of_orders` cycles.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateRecurringOrder {
    pub user: Pubkey,
    pub input_mint: String,
    pub output_mint: String,
    pub in_amount: u64,
    pub number_of_orders: u32,
    pub frequency: DcaFrequency,
    pub start_at: Option<DateTime<Utc>>,
}

impl CreateRecurringOrder {
    pub fn validate(&self) -> Result<()> {
        if self.number_of_orders < 2 {
            return Err(HubError::validation(
                ValidationErrorKind::InvalidInput,
                "A DCA schedule needs at least 2 orders.",
            ));
        }
        if self.in_amount == 0 {
            return Err(HubError::validation(
                ValidationErrorKind::AmountTooLow,
                "Amount per order must be greater than zero.",
            ));
        }
        if self.frequency.interval_secs() == 0 {
            return Err(HubError::validation(
                ValidationErrorKind::InvalidInput,
                "DCA interval must be at least one second.",
            ));
        }
        Ok(())
    }

    pub fn in_amount_per_cycle(&self) -> u64 {
        self.in_amount / self.number_of_orders.max(1) as u64
    }
}

#[async_trait]
pub trait RecurringOrderApi: Send + Sync {
    async fn create_recurring_order(&self, order: &CreateRecurringOrder) -> Result<PendingOrderTransaction>;
    async fn cancel_recurring_order(&self, user: &Pubkey, order_id: &str) -> Result<PendingOrderTransaction>;
    async fn execute_recurring(&self, signed: &VersionedTransaction, request_id: &str) -> Result<String>;
    async fn active_recurring_orders(&self, user: &Pubkey) -> Result<Vec<RecurringOrder>>;
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CreateRequest {
    user: String,
    input_mint: String,
    output_mint: String,
    params: CreateParams,
}

#[derive(Serialize, Debug)]
struct CreateParams {
    time: TimeParams,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct TimeParams {
    in_amount: u64,
    number_of_orders: u32,
    interval: u64,
    min_price: Option<f64>,
    max_price: Option<f64>,
    start_at: Option<i64>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CancelRequest<'a> {
    order: &'a str,
    recurring_type: &'static str,
    user: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ExecuteRequest<'a> {
    signed_transaction: String,
    request_id: &'a str,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct TransactionResponse {
    transaction: Option<String>,
    request_id: Option<String>,
}

impl TransactionResponse {
    fn into_pending(self, order_id: Option<String>, fallback: &str) -> Result<PendingOrderTransaction> {
        match (self.transaction, self.request_id) {
            (Some(transaction), Some(request_id)) => Ok(PendingOrderTransaction {
                request_id,
                transaction: super::decode_transaction(&transaction)?,
                order_id,
            }),
            _ => Err(HubError::api(super::SERVICE, fallback, None)),
        }
    }
}

#[derive(Deserialize, Debug)]
struct RecurringOrdersResponse {
    #[serde(default)]
    time: Vec<RecurringOrderEntry>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct RecurringOrderEntry {
    order_key: String,
    user_pubkey: String,
    input_mint: String,
    output_mint: String,
    raw_in_deposited: Option<String>,
    raw_in_amount_per_cycle: Option<String>,
    /// Interval in seconds, as a string.
    cycle_frequency: Option<String>,
    number_of_orders: Option<u32>,
    status: Option<String>,
    created_at: Option<String>,
}

impl RecurringOrderEntry {
    fn into_order(self) -> RecurringOrder {
        let per_cycle = self
            .raw_in_amount_per_cycle
            .as_deref()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);
        let deposited = self
            .raw_in_deposited
            .as_deref()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);
        let number_of_orders = self.number_of_orders.unwrap_or_else(|| {
            if per_cycle == 0 {
                0
            } else {
                (deposited / per_cycle) as u32
            }
        });
        let interval = self
            .cycle_frequency
            .as_deref()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);

        RecurringOrder {
            id: self.order_key,
            user: self.user_pubkey,
            input_mint: self.input_mint,
            output_mint: self.output_mint,
            in_amount_per_cycle: per_cycle,
            number_of_orders,
            frequency: DcaFrequency::from_interval_secs(interval),
            start_at: parse_created_at(self.created_at.as_deref()).unwrap_or_else(Utc::now),
            status: self
                .status
                .as_deref()
                .map(OrderStatus::from_api)
                .unwrap_or(OrderStatus::Open),
        }
    }
}

#[async_trait]
impl RecurringOrderApi for JupiterClient {
    async fn create_recurring_order(&self, order: &CreateRecurringOrder) -> Result<PendingOrderTransaction> {
        order.validate()?;
        let request = CreateRequest {
            user: order.user.to_string(),
            input_mint: order.input_mint.clone(),
            output_mint: order.output_mint.clone(),
            params: CreateParams {
                time: TimeParams {
                    in_amount: order.in_amount,
                    number_of_orders: order.number_of_orders,
                    interval: order.frequency.interval_secs(),
                    min_price: None,
                    max_price: None,
                    start_at: order.start_at.map(|at| at.timestamp()),
                },
            },
        };
        debug!(?request, "Creating recurring order");

        let response: TransactionResponse = self
            .post_json("recurring/v1/createOrder", &request, CREATE_FALLBACK)
            .await?;
        response.into_pending(None, CREATE_FALLBACK)
    }

    async fn cancel_recurring_order(&self, user: &Pubkey, order_id: &str) -> Result<PendingOrderTransaction> {
        let request = CancelRequest {
            order: order_id,
            recurring_type: RECURRING_TYPE,
            user: user.to_string(),
        };
        let response: TransactionResponse = self
            .post_json("recurring/v1/cancelOrder", &request, CANCEL_FALLBACK)
            .await?;
        response.into_pending(Some(order_id.to_string()), CANCEL_FALLBACK)
    }

    async fn execute_recurring(&self, signed: &VersionedTransaction, request_id: &str) -> Result<String> {
        let request = ExecuteRequest {
            signed_transaction: encode_transaction(signed)?,
            request_id,
        };
        let response: ExecuteResponse = self
            .post_json("recurring/v1/execute", &request, EXECUTE_FALLBACK)
            .await?;
        let signature = response.into_signature(EXECUTE_FALLBACK)?;
        info!(%signature, request_id, "Recurring order transaction executed");
        Ok(signature)
    }

    async fn active_recurring_orders(&self, user: &Pubkey) -> Result<Vec<RecurringOrder>> {
        let url = self.endpoint_with_query(
            "recurring/v1/getRecurringOrders",
            &[
                ("user", user.to_string()),
                ("orderStatus", "active".to_string()),
                ("recurringType", RECURRING_TYPE.to_string()),
            ],
        )?;
        let response: RecurringOrdersResponse = self.get_json(url, LIST_FALLBACK).await?;
        Ok(response.time.into_iter().map(RecurringOrderEntry::into_order).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jupiter_client::{JUP_MINT, USDC_MINT};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn create(number_of_orders: u32, in_amount: u64) -> CreateRecurringOrder {
        CreateRecurringOrder {
            user: Pubkey::new_unique(),
            input_mint: USDC_MINT.to_string(),
            output_mint: JUP_MINT.to_string(),
            in_amount,
            number_of_orders,
            frequency: DcaFrequency::Weekly,
            start_at: None,
        }
    }

    #[test]
    fn test_validation() {
        assert!(create(4, 40_000_000).validate().is_ok());
        assert_eq!(create(4, 40_000_000).in_amount_per_cycle(), 10_000_000);

        let err = create(1, 40_000_000).validate().unwrap_err();
        assert!(matches!(err, HubError::Validation { kind: ValidationErrorKind::InvalidInput, .. }));

        let err = create(3, 0).validate().unwrap_err();
        assert!(matches!(err, HubError::Validation { kind: ValidationErrorKind::AmountTooLow, .. }));
    }

    #[test]
    fn test_time_params_shape() {
        let params = TimeParams {
            in_amount: 100,
            number_of_orders: 4,
            interval: 86_400,
            min_price: None,
            max_price: None,
            start_at: None,
        };
        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(value["inAmount"], 100);
        assert_eq!(value["numberOfOrders"], 4);
        assert_eq!(value["interval"], 86_400);
        assert!(value["startAt"].is_null());
    }

    #[test]
    fn test_recurring_orders_parsing() {
        let response: RecurringOrdersResponse = serde_json::from_value(json!({
            "time": [{
                "orderKey": "Dca1",
                "userPubkey": "User1",
                "inputMint": USDC_MINT,
                "outputMint": JUP_MINT,
                "rawInDeposited": "30000000",
                "rawInAmountPerCycle": "10000000",
                "cycleFrequency": "604800",
                "createdAt": "2025-03-01T00:00:00Z"
            }]
        }))
        .unwrap();

        let orders: Vec<RecurringOrder> = response.time.into_iter().map(RecurringOrderEntry::into_order).collect();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].id, "Dca1");
        assert_eq!(orders[0].in_amount_per_cycle, 10_000_000);
        assert_eq!(orders[0].number_of_orders, 3);
        assert_eq!(orders[0].frequency, DcaFrequency::Weekly);
        assert_eq!(orders[0].status, OrderStatus::Open);
    }
}
