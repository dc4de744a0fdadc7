use actix_web::{Responder, get, post, web};
use common::{error::Res, http::Success, jwt::JwtClaims};
use entitlements::{EntitlementEngine, FeatureKey};

use crate::dtos::usage::{ConsumeResponse, DecisionResponse};

/// Usage of every feature in the current billing period.
///
/// # Output
/// - Success: `{ plan_id, period, features: [{ track, feature, allowed, current, limit }] }`
///   where `limit` is `-1` for unlimited features and one-off features carry
///   `price_minor_units` and `currency` instead
#[get("")]
pub async fn get_overview(
    claims: web::ReqData<JwtClaims>,
    engine: web::Data<EntitlementEngine>,
) -> Res<impl Responder> {
    let overview = engine.overview(claims.user_id).await?;
    Success::ok(overview)
}

/// Whether the user may use a feature right now. Nothing is counted.
///
/// # Input
/// - `feature`: e.g. `cover_letters`, `resume_downloads`
///
/// # Output
/// - Success: `{ allowed, decision }`
/// - Error: 404 for an unknown feature
///
/// Frontend Example:
/// ```js
/// const { allowed, decision } = await api.get('/api/dashboard/usage/resume_downloads');
/// if (!allowed && decision.track === 'one_off_required') showPayDialog(decision.price_minor_units);
/// ```
#[get("/{feature}")]
pub async fn get_decision(
    claims: web::ReqData<JwtClaims>,
    path: web::Path<String>,
    engine: web::Data<EntitlementEngine>,
) -> Res<impl Responder> {
    let feature: FeatureKey = path.parse()?;
    let decision = engine.decide(claims.user_id, feature).await?;
    Success::ok(DecisionResponse::from(decision))
}

/// Records one use of a feature performed outside the server, e.g. a resume
/// created in the browser editor.
///
/// # Output
/// - Success: `{ usage: { feature, allowed, current, limit } }` after counting
/// - Error: 402 with `action: "upgrade"` or `action: "pay"` when not allowed
#[post("/{feature}/consume")]
pub async fn post_consume(
    claims: web::ReqData<JwtClaims>,
    path: web::Path<String>,
    engine: web::Data<EntitlementEngine>,
) -> Res<impl Responder> {
    let feature: FeatureKey = path.parse()?;
    let usage = engine.consume(claims.user_id, feature).await?;
    Success::ok(ConsumeResponse { usage })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{
        App, HttpMessage,
        dev::Service,
        http::StatusCode,
        test::{self, TestRequest},
    };
    use db::MemoryStore;
    use entitlements::{OneOffPrice, PlanCatalog};
    use serde_json::Value;
    use uuid::Uuid;

    use super::*;

    fn engine() -> web::Data<EntitlementEngine> {
        web::Data::new(EntitlementEngine::new(
            Arc::new(MemoryStore::new()),
            Arc::new(PlanCatalog::default()),
            OneOffPrice {
                amount_minor_units: 500,
                currency: "xaf".to_string(),
            },
        ))
    }

    #[actix_web::test]
    async fn free_user_consumes_until_upgrade_prompt() {
        let user = JwtClaims {
            user_id: Uuid::new_v4(),
            email: None,
            exp: usize::MAX,
        };
        let app = test::init_service(
            App::new()
                .app_data(engine())
                .wrap_fn(move |req, srv| {
                    req.extensions_mut().insert(user.clone());
                    srv.call(req)
                })
                .service(
                    web::scope("/usage")
                        .service(get_overview)
                        .service(get_decision)
                        .service(post_consume),
                ),
        )
        .await;

        let first: Value = test::call_and_read_body_json(
            &app,
            TestRequest::post()
                .uri("/usage/resume_creation/consume")
                .to_request(),
        )
        .await;
        assert_eq!(first["usage"]["current"], 1);
        assert_eq!(first["usage"]["limit"], 1);

        let second = test::call_service(
            &app,
            TestRequest::post()
                .uri("/usage/resume_creation/consume")
                .to_request(),
        )
        .await;
        assert_eq!(second.status(), StatusCode::PAYMENT_REQUIRED);
        let body: Value = test::read_body_json(second).await;
        assert_eq!(body["action"], "upgrade");

        let download: Value = test::call_and_read_body_json(
            &app,
            TestRequest::get()
                .uri("/usage/resume_downloads")
                .to_request(),
        )
        .await;
        assert_eq!(download["allowed"], false);
        assert_eq!(download["decision"]["track"], "one_off_required");
        assert_eq!(download["decision"]["price_minor_units"], 500);

        let overview: Value =
            test::call_and_read_body_json(&app, TestRequest::get().uri("/usage").to_request())
                .await;
        assert_eq!(overview["plan_id"], "free");
        assert_eq!(overview["features"].as_array().map(Vec::len), Some(5));

        let unknown = test::call_service(
            &app,
            TestRequest::get().uri("/usage/teleportation").to_request(),
        )
        .await;
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    }
}
