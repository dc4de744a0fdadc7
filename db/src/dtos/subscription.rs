use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::subscription::{BillingInterval, SubscriptionStatus};

pub struct SubscriptionCreateRequest {
    pub user_id: Uuid,
    pub plan_id: String,
    pub billing_interval: BillingInterval,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: SubscriptionStatus,
    pub auto_renew: bool,
}
