use common::error::{AppError, Res};
use stripe::{Event, EventObject, EventType, Webhook};

use crate::services::{gateway::PaymentStatus, purchase::PurchaseService, sub::SubscriptionService};

/// Verifies the webhook signature and parses the event.
pub fn construct_event(payload: &str, signature: &str, webhook_secret: &str) -> Res<Event> {
    match Webhook::construct_event(payload, signature, webhook_secret) {
        Ok(event) => Ok(event),
        Err(e) => {
            log::error!("Error constructing webhook event: {}", e);
            Err(AppError::BadRequest(format!("Webhook Error: {}", e)))
        }
    }
}

/// How an event type settles a payment. A failed attempt is not final: the
/// intent goes back to awaiting a payment method and may still succeed, so
/// only cancellation fails it.
pub fn settlement_status(event_type: EventType) -> Option<PaymentStatus> {
    match event_type {
        EventType::PaymentIntentSucceeded => Some(PaymentStatus::Complete),
        EventType::PaymentIntentCanceled => Some(PaymentStatus::Failed),
        EventType::PaymentIntentPaymentFailed => {
            log::info!("Payment attempt failed, waiting for a retry or cancellation");
            None
        }
        other => {
            log::info!("Unhandled event type: {}", other);
            None
        }
    }
}

/// The payment intent an event settles, and how. `None` for events we ignore.
pub fn payment_update(event: Event) -> Option<(String, PaymentStatus)> {
    let status = settlement_status(event.type_)?;
    match event.data.object {
        EventObject::PaymentIntent(intent) => Some((intent.id.to_string(), status)),
        _ => None,
    }
}

/// Applies a payment result to whichever subscription or receipt it paid for.
pub async fn settle_payment(
    transaction_id: &str,
    status: PaymentStatus,
    subs: &SubscriptionService,
    purchases: &PurchaseService,
) -> Res<()> {
    if let Some(subscription) = subs.handle_payment_result(transaction_id, status).await? {
        log::info!(
            "Payment {} settled subscription of user {}: {}",
            transaction_id,
            subscription.user_id,
            subscription.status
        );
        return Ok(());
    }
    if let Some(purchase) = purchases
        .handle_payment_result(transaction_id, status)
        .await?
    {
        log::info!(
            "Payment {} settled receipt {}: {}",
            transaction_id,
            purchase.id,
            purchase.status
        );
        return Ok(());
    }
    log::warn!("Payment {} does not match any subscription or receipt", transaction_id);
    Ok(())
}

pub async fn process_webhook_event(
    event: Event,
    subs: &SubscriptionService,
    purchases: &PurchaseService,
) -> Res<()> {
    log::info!("Processing webhook event: {}", event.type_);
    match payment_update(event) {
        Some((transaction_id, status)) => {
            settle_payment(&transaction_id, status, subs, purchases).await
        }
        None => Ok(()),
    }
}
