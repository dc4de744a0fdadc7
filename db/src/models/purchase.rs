use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UnknownVariant;

/// `pending -> paid -> redeemed`, or `pending -> failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    Pending,
    Paid,
    Failed,
    Redeemed,
}

impl PurchaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseStatus::Pending => "pending",
            PurchaseStatus::Paid => "paid",
            PurchaseStatus::Failed => "failed",
            PurchaseStatus::Redeemed => "redeemed",
        }
    }
}

impl fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for PurchaseStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "pending" => Ok(PurchaseStatus::Pending),
            "paid" => Ok(PurchaseStatus::Paid),
            "failed" => Ok(PurchaseStatus::Failed),
            "redeemed" => Ok(PurchaseStatus::Redeemed),
            _ => Err(UnknownVariant::new("purchase status", value)),
        }
    }
}

/// A one-off paid unlock. The row id doubles as the receipt id.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
pub struct Purchase {
    pub id: Uuid,
    pub user_id: Uuid,
    pub resource_id: String,
    pub amount_minor_units: i64,
    pub currency: String,
    #[sqlx(try_from = "String")]
    pub status: PurchaseStatus,
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub redeemed_at: Option<DateTime<Utc>>,
}
