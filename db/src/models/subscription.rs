use std::fmt;

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UnknownVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Pending,
    Active,
    Cancelled,
    Expired,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Pending => "pending",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Cancelled => "cancelled",
            SubscriptionStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for SubscriptionStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "pending" => Ok(SubscriptionStatus::Pending),
            "active" => Ok(SubscriptionStatus::Active),
            "cancelled" => Ok(SubscriptionStatus::Cancelled),
            "expired" => Ok(SubscriptionStatus::Expired),
            _ => Err(UnknownVariant::new("subscription status", value)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingInterval {
    Monthly,
    Yearly,
}

impl BillingInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingInterval::Monthly => "monthly",
            BillingInterval::Yearly => "yearly",
        }
    }

    /// End of a period that starts at `start`. Month arithmetic clamps to the
    /// last day of shorter months (Jan 31 + 1 month = Feb 28/29).
    pub fn period_end(&self, start: DateTime<Utc>) -> DateTime<Utc> {
        let months = match self {
            BillingInterval::Monthly => Months::new(1),
            BillingInterval::Yearly => Months::new(12),
        };
        start.checked_add_months(months).unwrap_or(start)
    }
}

impl TryFrom<String> for BillingInterval {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "monthly" => Ok(BillingInterval::Monthly),
            "yearly" => Ok(BillingInterval::Yearly),
            _ => Err(UnknownVariant::new("billing interval", value)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: String,
    #[sqlx(try_from = "String")]
    pub billing_interval: BillingInterval,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[sqlx(try_from = "String")]
    pub status: SubscriptionStatus,
    pub auto_renew: bool,
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// Status as seen at `now`: an active row past its end date reads as expired.
    pub fn effective_status(&self, now: DateTime<Utc>) -> SubscriptionStatus {
        match self.status {
            SubscriptionStatus::Active if self.end_date < now => SubscriptionStatus::Expired,
            status => status,
        }
    }

    pub fn is_entitled(&self, now: DateTime<Utc>) -> bool {
        self.effective_status(now) == SubscriptionStatus::Active
    }
}
