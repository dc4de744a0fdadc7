use actix_web::{Responder, post, web};
use common::{error::Res, http::Success, jwt::JwtClaims};
use entitlements::EntitlementEngine;

use crate::{dtos::resume::DownloadRequest, services::resume};

/// Renders a resume as an HTML page for download.
///
/// # Input
/// - `req`: JSON payload:
///   - `resume_id`: Identifier of the resume being downloaded
///   - `receipt_id`: Optional paid receipt from `POST /purchase`
///   - `document`: `{ full_name, headline, contact, summary, sections, template }`
///
/// # Output
/// - Success: `text/html` page
/// - Error: 402 with `action: "pay"` and the price for free users without a
///   receipt, 409 when the receipt was already used
#[post("/download")]
pub async fn post_download(
    claims: web::ReqData<JwtClaims>,
    req: web::Json<DownloadRequest>,
    engine: web::Data<EntitlementEngine>,
) -> Res<impl Responder> {
    let html = resume::download(&engine, claims.user_id, &req).await?;
    Success::html(html)
}
