use std::{sync::Arc, time::Instant};

use actix_web::{
    Error,
    body::BoxBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use colored::Colorize;
use common::jwt::get_jwt_claims_or_error;
use futures::future::{LocalBoxFuture, Ready, ready};
use log::{info, warn};

/// Logs one line per request: status, method, path, elapsed time and user.
pub struct LoggerMiddleware {
    console_logging_enabled: bool,
}

impl LoggerMiddleware {
    pub fn new(console_logging_enabled: bool) -> Self {
        Self {
            console_logging_enabled,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for LoggerMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = LoggerMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(LoggerMiddlewareService {
            service: Arc::new(service),
            console_logging_enabled: self.console_logging_enabled,
        }))
    }
}

pub struct LoggerMiddlewareService<S> {
    service: Arc<S>,
    console_logging_enabled: bool,
}

impl<S, B> Service<ServiceRequest> for LoggerMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let method = req.method().to_string();
        let path = req.path().to_string();
        let user_id = get_jwt_claims_or_error(&req).ok().map(|c| c.user_id);
        let console_logging_enabled = self.console_logging_enabled;
        let started = Instant::now();
        let srv = Arc::clone(&self.service);

        Box::pin(async move {
            let res = srv.call(req).await?;

            if console_logging_enabled {
                let status_code = res.status().as_u16();
                let colored_status = match status_code {
                    200..=299 => status_code.to_string().green(),
                    300..=399 => status_code.to_string().yellow(),
                    400..=499 => status_code.to_string().bright_red(),
                    _ => status_code.to_string().red(),
                };
                let colored_method = match method.as_str() {
                    "GET" => method.blue(),
                    "POST" => method.yellow(),
                    "PUT" => method.purple(),
                    "DELETE" => method.red(),
                    _ => method.normal(),
                };
                let line = format!(
                    "[{}] {} {} {} user_id={}",
                    colored_status,
                    colored_method,
                    path.bright_white(),
                    format!("({}ms)", started.elapsed().as_millis()).bright_black(),
                    user_id
                        .map_or("None".to_string(), |id| id.to_string())
                        .bright_blue(),
                );
                if status_code >= 500 {
                    warn!("{}", line);
                } else {
                    info!("{}", line);
                }
            }

            Ok(res.map_into_boxed_body())
        })
    }
}
