use db::models::subscription::{BillingInterval, Subscription};
use entitlements::Plan;
use serde::{Deserialize, Serialize};

use crate::services::gateway::{PaymentMethod, PaymentOutcome};

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub plan_id: String,
    pub billing_interval: BillingInterval,
    pub method: PaymentMethod,
    pub payer_reference: String,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub subscription: Subscription,
    pub payment: PaymentOutcome,
}

#[derive(Debug, Serialize)]
pub struct UserSubscriptionResponse {
    pub subscription: Subscription,
}

#[derive(Debug, Serialize)]
pub struct PlansResponse {
    pub plans: Vec<Plan>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateAutoRenewRequest {
    pub auto_renew: bool,
}
