use db::models::purchase::Purchase;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::gateway::{PaymentMethod, PaymentOutcome};

#[derive(Debug, Deserialize)]
pub struct OneOffPurchaseRequest {
    /// What the receipt unlocks, e.g. the id of the resume to download.
    pub resource_id: String,
    pub method: PaymentMethod,
    pub payer_reference: String,
}

#[derive(Debug, Serialize)]
pub struct OneOffPurchaseResponse {
    pub receipt_id: Uuid,
    pub payment: PaymentOutcome,
}

#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    pub purchase: Purchase,
}
