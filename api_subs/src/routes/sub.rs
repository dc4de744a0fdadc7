use actix_web::{Responder, get, post, web};
use common::{error::Res, http::Success, jwt::JwtClaims};

use crate::{
    dtos::sub::{CheckoutRequest, UpdateAutoRenewRequest, UserSubscriptionResponse},
    services::sub::SubscriptionService,
};

/// Starts a subscription checkout for the authenticated user.
///
/// # Input
/// - `claims`: JWT claims containing the user id
/// - `req`: JSON payload with:
///   - `plan_id`: `premium` or `professional`
///   - `billing_interval`: `monthly` or `yearly`
///   - `method`: `card` or `mobile_money`
///   - `payer_reference`: Email or phone number used by the payment provider
///
/// # Output
/// - Success: 201 with `{ subscription, payment }`. The subscription is
///   `active` when the payment completed at once, `pending` otherwise.
/// - Error: 409 when an unexpired subscription is already active,
///   400 for a plan/interval that cannot be bought, 502 if the payment
///   provider fails (the pending subscription is kept for a retry)
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch('/api/dashboard/sub/checkout', {
///   method: 'POST',
///   headers: {
///     'Content-Type': 'application/json',
///     'Authorization': `Bearer ${token}`
///   },
///   body: JSON.stringify({
///     plan_id: "premium",
///     billing_interval: "monthly",
///     method: "card",
///     payer_reference: "awa@example.cm"
///   })
/// });
///
/// const { subscription, payment } = await response.json();
/// if (subscription.status === "pending" && payment.client_secret) {
///   // finish the card payment, then call /sub/confirm
///   await stripe.confirmCardPayment(payment.client_secret);
/// }
/// ```
#[post("/checkout")]
pub async fn post_checkout(
    claims: web::ReqData<JwtClaims>,
    req: web::Json<CheckoutRequest>,
    subs: web::Data<SubscriptionService>,
) -> Res<impl Responder> {
    let res = subs.checkout(claims.user_id, req.into_inner()).await?;
    Success::created(res)
}

/// Re-checks the pending payment and activates the subscription if it went through.
///
/// # Output
/// - Success: `{ subscription }`, still `pending` if the payment is not complete
/// - Error: 409 when there is no pending subscription
#[post("/confirm")]
pub async fn post_confirm(
    claims: web::ReqData<JwtClaims>,
    subs: web::Data<SubscriptionService>,
) -> Res<impl Responder> {
    let subscription = subs.confirm(claims.user_id).await?;
    Success::ok(UserSubscriptionResponse { subscription })
}

/// Retrieves the authenticated user's subscription.
///
/// # Output
/// - Success: `{ subscription }` whose `status` already accounts for expiry
/// - Error: 404 when the user never subscribed (they are on the free plan)
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch('/api/dashboard/sub/current', {
///   headers: { 'Authorization': `Bearer ${token}` }
/// });
///
/// if (response.status === 404) {
///   // show the plan picker
/// }
/// ```
#[get("/current")]
pub async fn get_current(
    claims: web::ReqData<JwtClaims>,
    subs: web::Data<SubscriptionService>,
) -> Res<impl Responder> {
    let subscription = subs.current(claims.user_id).await?;
    Success::ok(UserSubscriptionResponse { subscription })
}

/// Updates the auto-renewal setting for the user's current subscription.
///
/// # Input
/// - `req`: `{ auto_renew: bool }`
///
/// # Output
/// - Success: `{ subscription }` with the new setting
/// - Error: 404 Not Found if no live subscription exists
#[post("/auto-renew")]
pub async fn post_auto_renew(
    claims: web::ReqData<JwtClaims>,
    req: web::Json<UpdateAutoRenewRequest>,
    subs: web::Data<SubscriptionService>,
) -> Res<impl Responder> {
    let subscription = subs.set_auto_renew(claims.user_id, req.auto_renew).await?;
    Success::ok(UserSubscriptionResponse { subscription })
}

/// Cancels the active subscription. The user drops to the free plan at once.
#[post("/cancel")]
pub async fn post_cancel(
    claims: web::ReqData<JwtClaims>,
    subs: web::Data<SubscriptionService>,
) -> Res<impl Responder> {
    let subscription = subs.cancel(claims.user_id).await?;
    Success::ok(UserSubscriptionResponse { subscription })
}
