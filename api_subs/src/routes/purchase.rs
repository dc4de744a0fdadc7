use actix_web::{Responder, get, post, web};
use common::{error::Res, http::Success, jwt::JwtClaims};
use entitlements::EntitlementEngine;
use uuid::Uuid;

use crate::{
    dtos::purchase::{OneOffPurchaseRequest, PurchaseResponse},
    services::purchase::PurchaseService,
};

/// Buys a single use of a resource, e.g. one resume download on the free plan.
///
/// # Input
/// - `claims`: JWT claims of the buyer
/// - `req`: JSON payload:
///   - `resource_id`: What the receipt unlocks
///   - `method`: `card` or `mobile_money`
///   - `payer_reference`: Email or phone number used by the payment provider
///
/// # Output
/// - Success: 201 with `{ receipt_id, payment: { status, transaction_id, client_secret } }`
/// - Error: 502 when the payment provider is unreachable
///
/// The price is fixed server side; pass `receipt_id` to the download
/// endpoint once the payment completes.
#[post("")]
pub async fn post_purchase(
    claims: web::ReqData<JwtClaims>,
    req: web::Json<OneOffPurchaseRequest>,
    purchases: web::Data<PurchaseService>,
    engine: web::Data<EntitlementEngine>,
) -> Res<impl Responder> {
    let res = purchases
        .purchase_one_off_access(claims.user_id, req.into_inner(), engine.one_off_price())
        .await?;
    Success::created(res)
}

/// Retrieves a receipt, refreshing its payment status while pending.
///
/// # Output
/// - Success: `{ purchase }` with status `pending`, `paid`, `failed` or `redeemed`
/// - Error: 404 when the receipt does not exist or belongs to someone else
#[get("/{receipt_id}")]
pub async fn get_purchase(
    claims: web::ReqData<JwtClaims>,
    path: web::Path<Uuid>,
    purchases: web::Data<PurchaseService>,
) -> Res<impl Responder> {
    let purchase = purchases
        .get_purchase(claims.user_id, path.into_inner())
        .await?;
    Success::ok(PurchaseResponse { purchase })
}
