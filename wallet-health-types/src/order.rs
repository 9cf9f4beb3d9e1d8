use chrono::{DateTime, Datelike, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle of an aggregator-owned order as far as the hub displays it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Open,
    Filled,
    Cancelled,
    Expired,
}

impl OrderStatus {
    /// Maps the aggregator's free-form status strings onto the display enum.
    pub fn from_api(status: &str) -> Self {
        match status.to_lowercase().as_str() {
            "completed" | "filled" | "closed" => OrderStatus::Filled,
            "cancelled" | "canceled" => OrderStatus::Cancelled,
            "expired" => OrderStatus::Expired,
            _ => OrderStatus::Open,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Open => "OPEN",
            OrderStatus::Filled => "FILLED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Expired => "EXPIRED",
        };
        f.write_str(s)
    }
}

/// A limit order: sell `making_amount` of the input mint once
/// `taking_amount` of the output mint can be received.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TriggerOrder {
    pub id: String,
    pub maker: String,
    pub input_mint: String,
    pub output_mint: String,
    pub making_amount: u64,
    pub taking_amount: u64,
    pub status: OrderStatus,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DcaFrequency {
    Daily,
    Weekly,
    Monthly,
    /// Any other interval reported by the aggregator, in seconds.
    Custom(u64),
}

const SECONDS_PER_DAY: u64 = 86_400;

impl DcaFrequency {
    /// Interval in seconds as the aggregator's time-based orders expect it.
    /// Months are approximated as 30 days there.
    pub fn interval_secs(&self) -> u64 {
        match self {
            DcaFrequency::Daily => SECONDS_PER_DAY,
            DcaFrequency::Weekly => 7 * SECONDS_PER_DAY,
            DcaFrequency::Monthly => 30 * SECONDS_PER_DAY,
            DcaFrequency::Custom(secs) => *secs,
        }
    }

    pub fn from_interval_secs(secs: u64) -> Self {
        match secs {
            s if s == SECONDS_PER_DAY => DcaFrequency::Daily,
            s if s == 7 * SECONDS_PER_DAY => DcaFrequency::Weekly,
            s if s == 30 * SECONDS_PER_DAY => DcaFrequency::Monthly,
            s => DcaFrequency::Custom(s),
        }
    }
}

impl fmt::Display for DcaFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DcaFrequency::Daily => f.write_str("Daily"),
            DcaFrequency::Weekly => f.write_str("Weekly"),
            DcaFrequency::Monthly => f.write_str("Monthly"),
            DcaFrequency::Custom(secs) => write!(f, "Every {}s", secs),
        }
    }
}

impl FromStr for DcaFrequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(DcaFrequency::Daily),
            "weekly" => Ok(DcaFrequency::Weekly),
            "monthly" => Ok(DcaFrequency::Monthly),
            _ => Err(format!("Invalid DCA frequency: {}", s)),
        }
    }
}

/// A recurring (DCA) order: buy the output mint with `in_amount_per_cycle`
/// of the input mint every period, `number_of_orders` times.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecurringOrder {
    pub id: String,
    pub user: String,
    pub input_mint: String,
    pub output_mint: String,
    pub in_amount_per_cycle: u64,
    pub number_of_orders: u32,
    pub frequency: DcaFrequency,
    pub start_at: DateTime<Utc>,
    pub status: OrderStatus,
}

impl RecurringOrder {
    pub fn total_in_amount(&self) -> u64 {
        self.in_amount_per_cycle.saturating_mul(self.number_of_orders as u64)
    }

    /// First run at or after `now`: `start_at` plus a whole number of
    /// periods (calendar months for Monthly).
    pub fn next_run(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        if self.start_at >= now {
            return self.start_at;
        }

        match self.frequency {
            DcaFrequency::Monthly => {
                let months = (now.year() - self.start_at.year()) * 12 + now.month() as i32
                    - self.start_at.month() as i32;
                let periods = u32::try_from(months).unwrap_or(0);
                [periods, periods.saturating_add(1)]
                    .into_iter()
                    .filter_map(|k| self.start_at.checked_add_months(Months::new(k)))
                    .find(|run| *run >= now)
                    .unwrap_or(self.start_at)
            }
            other => {
                let interval = match i64::try_from(other.interval_secs()) {
                    Ok(interval) if interval > 0 => interval,
                    _ => return self.start_at,
                };
                let periods = (now - self.start_at).num_seconds() / interval;
                [periods, periods.saturating_add(1)]
                    .into_iter()
                    .filter_map(|k| Duration::try_seconds(k.checked_mul(interval)?))
                    .filter_map(|offset| self.start_at.checked_add_signed(offset))
                    .find(|run| *run >= now)
                    .unwrap_or(self.start_at)
            }
        }
    }
}
