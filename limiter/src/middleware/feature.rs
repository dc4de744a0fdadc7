use std::{future::Future, pin::Pin, rc::Rc};

use actix_web::{
    Error, HttpMessage,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    web,
};
use common::{error::AppError, jwt::JwtClaims};
use entitlements::{EntitlementEngine, FeatureKey};

/// Quota pre-check for routes with a `{feature}` path segment.
///
/// Must sit inside the authentication guard so the session claims are set.
#[derive(Default)]
pub struct FeatureGate {}

impl FeatureGate {
    pub fn new() -> Self {
        FeatureGate {}
    }
}

impl<S, B> Transform<S, ServiceRequest> for FeatureGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Transform = FeatureGateService<S>;
    type InitError = ();
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(FeatureGateService {
            service: Rc::new(service),
        }))
    }
}

pub struct FeatureGateService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for FeatureGateService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = Rc::clone(&self.service);

        Box::pin(async move {
            // 1. Who is asking
            let user_id = req.extensions().get::<JwtClaims>().map(|c| c.user_id);
            let Some(user_id) = user_id else {
                return Ok(req.error_response(AppError::NotAuthenticated(
                    "Log in to use this feature".to_string(),
                )));
            };

            // 2. For what
            let parsed = req.match_info().get("feature").map(str::parse::<FeatureKey>);
            let feature = match parsed {
                Some(Ok(feature)) => feature,
                Some(Err(e)) => return Ok(req.error_response(e)),
                None => {
                    return Ok(req.error_response(AppError::Internal(
                        "Feature gate mounted on a route without {feature}".to_string(),
                    )));
                }
            };

            // 3. Against which plan
            let Some(engine) = req.app_data::<web::Data<EntitlementEngine>>().cloned() else {
                return Ok(req.error_response(AppError::Internal(
                    "Entitlement engine is not configured".to_string(),
                )));
            };

            match engine.decide(user_id, feature).await {
                Ok(decision) => {
                    if let Some(denial) = decision.denial() {
                        log::debug!("Blocked {} for user {}", feature, user_id);
                        return Ok(req.error_response(denial));
                    }
                }
                Err(e) => return Ok(req.error_response(e)),
            }

            srv.call(req).await.map(|res| res.map_into_boxed_body())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{App, HttpResponse, http::StatusCode, test};
    use db::MemoryStore;
    use entitlements::{OneOffPrice, PlanCatalog};
    use uuid::Uuid;

    use super::*;

    #[actix_web::test]
    async fn blocks_used_up_and_pay_per_use_features() {
        let engine = EntitlementEngine::new(
            Arc::new(MemoryStore::new()),
            Arc::new(PlanCatalog::default()),
            OneOffPrice {
                amount_minor_units: 500,
                currency: "xaf".to_string(),
            },
        );
        let user = Uuid::new_v4();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(engine.clone()))
                .wrap_fn(move |req, srv| {
                    req.extensions_mut().insert(JwtClaims {
                        user_id: user,
                        email: None,
                        exp: usize::MAX,
                    });
                    srv.call(req)
                })
                .service(
                    web::resource("/go/{feature}")
                        .wrap(FeatureGate::default())
                        .route(web::post().to(HttpResponse::Ok)),
                ),
        )
        .await;
        let post = |uri: &str| test::TestRequest::post().uri(uri).to_request();

        let allowed = test::call_service(&app, post("/go/ats_optimizations")).await;
        assert_eq!(allowed.status(), StatusCode::OK);

        // free plan: one ATS run per month
        engine
            .consume(user, FeatureKey::AtsOptimizations)
            .await
            .unwrap();
        let used_up = test::call_service(&app, post("/go/ats_optimizations")).await;
        assert_eq!(used_up.status(), StatusCode::PAYMENT_REQUIRED);

        let pay: serde_json::Value =
            test::read_body_json(test::call_service(&app, post("/go/resume_downloads")).await)
                .await;
        assert_eq!(pay["action"], "pay");
        assert_eq!(pay["price_minor_units"], 500);

        let unknown = test::call_service(&app, post("/go/job_alerts")).await;
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    }
}
