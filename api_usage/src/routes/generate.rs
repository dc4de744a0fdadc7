use actix_web::{Responder, post, web};
use common::{error::Res, http::Success, jwt::JwtClaims};
use entitlements::{EntitlementEngine, FeatureKey};

use crate::{
    dtos::generate::GenerateRequest,
    services::{generate::generate_content, generator::ContentGenerator},
};

/// Generates a cover letter, an ATS-optimised resume or interview questions.
///
/// # Input
/// - `feature`: `cover_letters`, `ats_optimizations` or `interview_questions`
/// - `req`: JSON payload:
///   - `input`: Candidate details or the current resume text
///   - `job_description`: Optional target job
///   - `language`: Optional output language
///
/// # Output
/// - Success: `{ feature, content, usage }`; the use is counted only once the
///   content exists
/// - Error: 402 when the quota is used up, 502 when generation fails (nothing
///   is counted)
#[post("/{feature}", wrap = "limiter::feature_middleware()")]
pub async fn post_generate(
    claims: web::ReqData<JwtClaims>,
    path: web::Path<String>,
    req: web::Json<GenerateRequest>,
    engine: web::Data<EntitlementEngine>,
    generator: web::Data<dyn ContentGenerator>,
) -> Res<impl Responder> {
    let feature: FeatureKey = path.parse()?;
    let res = generate_content(
        &engine,
        generator.get_ref(),
        claims.user_id,
        feature,
        &req,
    )
    .await?;
    Success::ok(res)
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
    use serde_json::{Value, json};
    use uuid::Uuid;

    use super::*;
    use crate::services::generator::fake::FakeGenerator;

    #[actix_web::test]
    async fn gate_rejects_before_generating_once_quota_is_spent() {
        let engine = web::Data::new(EntitlementEngine::new(
            Arc::new(MemoryStore::new()),
            Arc::new(PlanCatalog::default()),
            OneOffPrice {
                amount_minor_units: 500,
                currency: "xaf".to_string(),
            },
        ));
        let fake = Arc::new(FakeGenerator::ok());
        let generator: Arc<dyn ContentGenerator> = fake.clone();
        let user = JwtClaims {
            user_id: Uuid::new_v4(),
            email: None,
            exp: usize::MAX,
        };
        let app = test::init_service(
            App::new()
                .app_data(engine)
                .app_data(web::Data::from(generator))
                .wrap_fn(move |req, srv| {
                    req.extensions_mut().insert(user.clone());
                    srv.call(req)
                })
                .service(web::scope("/generate").service(post_generate)),
        )
        .await;
        let payload = json!({ "input": "Awa, auditor in Douala" });

        let first: Value = test::call_and_read_body_json(
            &app,
            TestRequest::post()
                .uri("/generate/ats_optimizations")
                .set_json(&payload)
                .to_request(),
        )
        .await;
        assert_eq!(first["feature"], "ats_optimizations");
        assert_eq!(first["usage"]["current"], 1);

        let second = test::call_service(
            &app,
            TestRequest::post()
                .uri("/generate/ats_optimizations")
                .set_json(&payload)
                .to_request(),
        )
        .await;
        assert_eq!(second.status(), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(fake.calls(), 1);
    }
}
