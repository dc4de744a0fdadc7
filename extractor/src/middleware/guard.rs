use std::{future::Future, pin::Pin, rc::Rc};

use actix_web::{
    Error, HttpMessage,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use futures::future::{Ready, ok};

use common::jwt::get_jwt_claims_or_error;

/// Lets a request through only when the extraction middleware found valid
/// claims, and exposes them to handlers as `web::ReqData<JwtClaims>`.
#[derive(Default)]
pub struct AuthGuard {}

impl AuthGuard {
    pub fn new() -> Self {
        AuthGuard {}
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Transform = AuthGuardService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthGuardService {
            service: Rc::new(service),
        })
    }
}

pub struct AuthGuardService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AuthGuardService<S>
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
            match get_jwt_claims_or_error(&req) {
                Ok(claims) => {
                    req.extensions_mut().insert(claims);
                    srv.call(req).await.map(|res| res.map_into_boxed_body())
                }
                Err(e) => Ok(req.error_response(e)),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{App, Responder, http::StatusCode, test, web};
    use common::{
        env_config::{BillingConfig, Config, GenerationConfig, JwtConfig},
        jwt::{JwtClaims, generate_jwt},
    };
    use uuid::Uuid;

    use super::*;
    use crate::middleware::extractor::ExtractionMiddleware;

    fn config() -> Arc<Config> {
        Arc::new(Config {
            environment: "development".to_string(),
            database_url: String::new(),
            jwt_config: JwtConfig {
                secret: "guard-secret".to_string(),
                expiration_hours: 1,
            },
            server_host: "127.0.0.1".to_string(),
            server_port: 8080,
            num_workers: 1,
            cors_allowed_origin: "http://localhost:3000".to_string(),
            console_logging_enabled: false,
            global_rate_limit: 50,
            billing: BillingConfig {
                stripe_secret_key: String::new(),
                stripe_webhook_secret: String::new(),
                default_currency: "xaf".to_string(),
                one_off_download_price: 500,
                optimistic_activation: false,
            },
            generation: GenerationConfig {
                api_url: String::new(),
                api_key: String::new(),
                timeout_secs: 1,
            },
        })
    }

    async fn whoami(claims: web::ReqData<JwtClaims>) -> impl Responder {
        claims.user_id.to_string()
    }

    #[actix_web::test]
    async fn only_valid_sessions_pass() {
        let config = config();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(config.clone()))
                .wrap(ExtractionMiddleware::new())
                .service(
                    web::scope("/dashboard")
                        .wrap(AuthGuard::default())
                        .route("/me", web::get().to(whoami)),
                ),
        )
        .await;

        let anonymous =
            test::call_service(&app, test::TestRequest::get().uri("/dashboard/me").to_request())
                .await;
        assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

        let forged = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/dashboard/me")
                .insert_header(("Authorization", "Bearer not-a-jwt"))
                .to_request(),
        )
        .await;
        assert_eq!(forged.status(), StatusCode::UNAUTHORIZED);

        let user_id = Uuid::new_v4();
        let token = generate_jwt(user_id, None, &config.jwt_config).unwrap();
        let body = test::call_and_read_body(
            &app,
            test::TestRequest::get()
                .uri("/dashboard/me")
                .insert_header(("Authorization", format!("Bearer {}", token)))
                .to_request(),
        )
        .await;
        assert_eq!(body, user_id.to_string().as_bytes());
    }
}
