use std::sync::Arc;

use actix_web::{HttpRequest, Responder, post, web};
use common::{
    env_config::Config,
    error::{AppError, Res},
    http::Success,
};

use crate::services::{self, purchase::PurchaseService, sub::SubscriptionService};

/// Handles Stripe webhook events for payment processing.
///
/// # Input
/// - `payload`: Raw string containing the webhook event data
/// - `req`: HTTP request carrying the `stripe-signature` header
///
/// # Output
/// - Success: Returns 202 Accepted once the event is applied
/// - Error: Returns 400 Bad Request for a missing or invalid signature
///
/// # Note
/// Called by Stripe, not by the frontend. Subscribe the endpoint to
/// `payment_intent.succeeded`, `payment_intent.payment_failed` and
/// `payment_intent.canceled`; the pending subscription or receipt holding the
/// payment intent id is settled accordingly.
#[post("/webhook")]
pub async fn post_webhook(
    payload: String,
    req: HttpRequest,
    config: web::Data<Arc<Config>>,
    subs: web::Data<SubscriptionService>,
    purchases: web::Data<PurchaseService>,
) -> Res<impl Responder> {
    let signature = req
        .headers()
        .get("stripe-signature")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Stripe signature missing".to_string()))?;

    let event = services::pay::construct_event(
        &payload,
        signature,
        &config.billing.stripe_webhook_secret,
    )?;
    services::pay::process_webhook_event(event, &subs, &purchases).await?;

    Success::accepted()
}
