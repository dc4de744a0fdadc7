use std::sync::Arc;

use common::error::{AppError, Res};
use db::{
    dtos::purchase::PurchaseCreateRequest,
    models::purchase::{Purchase, PurchaseStatus},
    store::EntitlementStore,
};
use entitlements::OneOffPrice;
use uuid::Uuid;

use crate::{
    dtos::purchase::{OneOffPurchaseRequest, OneOffPurchaseResponse},
    services::gateway::{PaymentGateway, PaymentRequest, PaymentStatus},
};

/// One-off paid unlocks. These live beside the quota system and never
/// read or write usage counters.
pub struct PurchaseService {
    store: Arc<dyn EntitlementStore>,
    gateway: Arc<dyn PaymentGateway>,
}

impl PurchaseService {
    pub fn new(store: Arc<dyn EntitlementStore>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { store, gateway }
    }

    /// Charges `price` for a single use of `resource_id` and returns the
    /// receipt id. The receipt is spendable once its payment is complete.
    pub async fn purchase_one_off_access(
        &self,
        user_id: Uuid,
        req: OneOffPurchaseRequest,
        price: &OneOffPrice,
    ) -> Res<OneOffPurchaseResponse> {
        if req.resource_id.trim().is_empty() {
            return Err(AppError::BadRequest("resource_id is required".to_string()));
        }

        let purchase = self
            .store
            .insert_purchase(PurchaseCreateRequest {
                user_id,
                resource_id: req.resource_id.clone(),
                amount_minor_units: price.amount_minor_units,
                currency: price.currency.clone(),
            })
            .await?;

        let payment = self
            .gateway
            .charge(PaymentRequest {
                amount_minor_units: price.amount_minor_units,
                currency: price.currency.clone(),
                method: req.method,
                payer_reference: req.payer_reference,
                description: format!("Single download of {}", req.resource_id),
            })
            .await?;

        self.store
            .set_purchase_transaction(purchase.id, &payment.transaction_id)
            .await?;
        self.apply_payment(purchase.id, payment.status).await?;

        Ok(OneOffPurchaseResponse {
            receipt_id: purchase.id,
            payment,
        })
    }

    /// Reads a receipt, refreshing it from the gateway while still pending.
    pub async fn get_purchase(&self, user_id: Uuid, receipt_id: Uuid) -> Res<Purchase> {
        let purchase = self
            .store
            .get_purchase(receipt_id)
            .await?
            .filter(|p| p.user_id == user_id)
            .ok_or_else(|| AppError::NotFound("Receipt not found".to_string()))?;

        match (&purchase.status, &purchase.transaction_id) {
            (PurchaseStatus::Pending, Some(transaction_id)) => {
                let payment = self.gateway.status(transaction_id).await?;
                self.apply_payment(receipt_id, payment.status).await
            }
            _ => Ok(purchase),
        }
    }

    pub async fn handle_payment_result(
        &self,
        transaction_id: &str,
        status: PaymentStatus,
    ) -> Res<Option<Purchase>> {
        match self.store.find_purchase_by_transaction(transaction_id).await? {
            Some(purchase) => self.apply_payment(purchase.id, status).await.map(Some),
            None => Ok(None),
        }
    }

    /// Money taken always wins: a completed payment also pays a receipt an
    /// earlier report marked failed.
    async fn apply_payment(&self, receipt_id: Uuid, status: PaymentStatus) -> Res<Purchase> {
        let moves: &[(PurchaseStatus, PurchaseStatus)] = match status {
            PaymentStatus::Complete => &[
                (PurchaseStatus::Pending, PurchaseStatus::Paid),
                (PurchaseStatus::Failed, PurchaseStatus::Paid),
            ],
            PaymentStatus::Failed => &[(PurchaseStatus::Pending, PurchaseStatus::Failed)],
            PaymentStatus::Pending => &[],
        };
        for &(from, to) in moves {
            if let Some(purchase) = self.store.transition_purchase(receipt_id, from, to).await? {
                log::info!("Receipt {} is now {}", receipt_id, purchase.status);
                return Ok(purchase);
            }
        }
        self.store
            .get_purchase(receipt_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Receipt not found".to_string()))
    }
}
