use std::sync::Arc;

use chrono::Utc;
use common::error::{AppError, Res};
use db::{
    dtos::subscription::SubscriptionCreateRequest,
    models::subscription::{Subscription, SubscriptionStatus},
    store::EntitlementStore,
};
use entitlements::PlanCatalog;
use uuid::Uuid;

use crate::{
    dtos::sub::{CheckoutRequest, CheckoutResponse},
    services::gateway::{PaymentGateway, PaymentRequest, PaymentStatus},
};

/// Subscription lifecycle: `none -> pending -> active -> {expired, cancelled}`.
///
/// Every status change is a compare-and-swap on the stored row, so a webhook
/// and a user confirmation racing on the same payment activate it once.
pub struct SubscriptionService {
    store: Arc<dyn EntitlementStore>,
    catalog: Arc<PlanCatalog>,
    gateway: Arc<dyn PaymentGateway>,
    optimistic_activation: bool,
}

impl SubscriptionService {
    pub fn new(
        store: Arc<dyn EntitlementStore>,
        catalog: Arc<PlanCatalog>,
        gateway: Arc<dyn PaymentGateway>,
        optimistic_activation: bool,
    ) -> Self {
        Self {
            store,
            catalog,
            gateway,
            optimistic_activation,
        }
    }

    /// Starts a paid subscription. The new row is `pending` until the gateway
    /// reports the payment complete.
    ///
    /// Retrying while an earlier payment is still open first settles or
    /// cancels that payment, so at most one charge can ever activate the row.
    pub async fn checkout(&self, user_id: Uuid, req: CheckoutRequest) -> Res<CheckoutResponse> {
        let plan = self
            .catalog
            .get(&req.plan_id)
            .ok_or_else(|| AppError::NotFound(format!("Unknown plan: {}", req.plan_id)))?;
        let amount = plan.price_for(req.billing_interval).ok_or_else(|| {
            AppError::BadRequest(format!(
                "Plan {} cannot be bought {}",
                plan.id,
                req.billing_interval.as_str()
            ))
        })?;

        let now = Utc::now();
        if let Some(existing) = self.store.get_subscription(user_id).await? {
            if existing.is_entitled(now) {
                return Err(AppError::Conflict(format!(
                    "Subscription to {} is active until {}",
                    existing.plan_id,
                    existing.end_date.format("%Y-%m-%d")
                )));
            }
            if let (SubscriptionStatus::Pending, Some(previous)) =
                (existing.status, existing.transaction_id.as_deref())
            {
                if let Some(settled) = self.resolve_previous_payment(user_id, previous).await? {
                    return Ok(settled);
                }
            }
        }

        self.store
            .replace_subscription(SubscriptionCreateRequest {
                user_id,
                plan_id: plan.id.clone(),
                billing_interval: req.billing_interval,
                start_date: now,
                end_date: req.billing_interval.period_end(now),
                status: SubscriptionStatus::Pending,
                auto_renew: true,
            })
            .await?;

        // a failed charge leaves the pending row for the user to retry
        let payment = self
            .gateway
            .charge(PaymentRequest {
                amount_minor_units: amount,
                currency: plan.currency.clone(),
                method: req.method,
                payer_reference: req.payer_reference,
                description: format!("{} ({})", plan.display_name, req.billing_interval.as_str()),
            })
            .await
            .inspect_err(|e| log::error!("Checkout payment for user {} failed: {}", user_id, e))?;

        self.store
            .set_subscription_transaction(user_id, &payment.transaction_id)
            .await?;
        let subscription = self
            .apply_payment(user_id, &payment.transaction_id, payment.status)
            .await?;

        Ok(CheckoutResponse {
            subscription,
            payment,
        })
    }

    /// Asks the gateway about the pending payment and applies the answer.
    pub async fn confirm(&self, user_id: Uuid) -> Res<Subscription> {
        let subscription = self.require(user_id).await?;
        if subscription.status != SubscriptionStatus::Pending {
            return Err(AppError::Conflict(format!(
                "Subscription is {}, nothing to confirm",
                subscription.status
            )));
        }
        let transaction_id = subscription
            .transaction_id
            .ok_or_else(|| AppError::Conflict("No payment in progress".to_string()))?;

        let payment = self.gateway.status(&transaction_id).await?;
        self.apply_payment(user_id, &transaction_id, payment.status)
            .await
    }

    /// Settles the subscription paid by `transaction_id`, if there is one.
    pub async fn handle_payment_result(
        &self,
        transaction_id: &str,
        status: PaymentStatus,
    ) -> Res<Option<Subscription>> {
        match self
            .store
            .find_subscription_by_transaction(transaction_id)
            .await?
        {
            Some(subscription) => self
                .apply_payment(subscription.user_id, transaction_id, status)
                .await
                .map(Some),
            None => Ok(None),
        }
    }

    /// The stored subscription with its status as of now.
    pub async fn current(&self, user_id: Uuid) -> Res<Subscription> {
        let mut subscription = self.require(user_id).await?;
        subscription.status = subscription.effective_status(Utc::now());
        Ok(subscription)
    }

    pub async fn cancel(&self, user_id: Uuid) -> Res<Subscription> {
        let subscription = self.current(user_id).await?;
        if subscription.status != SubscriptionStatus::Active {
            return Err(AppError::Conflict(format!(
                "Only an active subscription can be cancelled, this one is {}",
                subscription.status
            )));
        }

        let cancelled = self
            .store
            .transition_subscription(
                user_id,
                SubscriptionStatus::Active,
                SubscriptionStatus::Cancelled,
            )
            .await?
            .ok_or_else(|| AppError::Conflict("Subscription changed, try again".to_string()))?;
        log::info!("User {} cancelled plan {}", user_id, cancelled.plan_id);
        Ok(cancelled)
    }

    pub async fn set_auto_renew(&self, user_id: Uuid, auto_renew: bool) -> Res<Subscription> {
        let subscription = self.current(user_id).await?;
        if !matches!(
            subscription.status,
            SubscriptionStatus::Active | SubscriptionStatus::Pending
        ) {
            return Err(AppError::NotFound("No active subscription found".to_string()));
        }
        let mut updated = self
            .store
            .set_auto_renew(user_id, auto_renew)
            .await?
            .ok_or_else(|| AppError::NotFound("No active subscription found".to_string()))?;
        updated.status = updated.effective_status(Utc::now());
        Ok(updated)
    }

    async fn require(&self, user_id: Uuid) -> Res<Subscription> {
        self.store
            .get_subscription(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("No subscription found".to_string()))
    }

    /// Looks at the payment left open by an earlier checkout. A completed one
    /// activates the row as is; an open one is cancelled before a new charge.
    /// If the cancel fails the row keeps its transaction so a late success
    /// still lands.
    async fn resolve_previous_payment(
        &self,
        user_id: Uuid,
        transaction_id: &str,
    ) -> Res<Option<CheckoutResponse>> {
        let payment = self.gateway.status(transaction_id).await?;
        match payment.status {
            PaymentStatus::Complete => {
                let subscription = self
                    .apply_payment(user_id, transaction_id, PaymentStatus::Complete)
                    .await?;
                Ok(Some(CheckoutResponse {
                    subscription,
                    payment,
                }))
            }
            PaymentStatus::Failed => Ok(None),
            PaymentStatus::Pending => {
                self.gateway.cancel(transaction_id).await.inspect_err(|e| {
                    log::error!(
                        "Could not cancel payment {} for user {}: {}",
                        transaction_id,
                        user_id,
                        e
                    )
                })?;
                log::info!(
                    "Cancelled open payment {} for user {} before retrying",
                    transaction_id,
                    user_id
                );
                Ok(None)
            }
        }
    }

    async fn apply_payment(
        &self,
        user_id: Uuid,
        transaction_id: &str,
        status: PaymentStatus,
    ) -> Res<Subscription> {
        let activate = match status {
            PaymentStatus::Complete => true,
            PaymentStatus::Pending => self.optimistic_activation,
            PaymentStatus::Failed => {
                log::warn!("Payment failed for user {}, subscription stays pending", user_id);
                false
            }
        };

        if activate {
            if let Some(active) = self
                .store
                .transition_subscription_payment(
                    transaction_id,
                    SubscriptionStatus::Pending,
                    SubscriptionStatus::Active,
                )
                .await?
            {
                log::info!(
                    "Activated {} subscription for user {} until {}",
                    active.plan_id,
                    user_id,
                    active.end_date
                );
                return Ok(active);
            }
        }
        self.require(user_id).await
    }
}
