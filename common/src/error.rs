use actix_web::HttpResponse;
use thiserror::Error;

pub type Res<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    // === CONVERSION ERRORS ===
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JWT error: {0}")]
    JWT(#[from] jsonwebtoken::errors::Error),

    #[error("Reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Stripe error: {0}")]
    Stripe(#[from] stripe::StripeError),

    // === DOMAIN ERRORS ===
    #[error("Authentication required: {0}")]
    NotAuthenticated(String),

    #[error("Quota exceeded for {feature}: {current}/{limit}")]
    QuotaExceeded {
        feature: String,
        current: i64,
        limit: i64,
        /// Set when the feature can be unlocked with a one-off payment instead.
        price_minor_units: Option<i64>,
    },

    #[error("Upstream service failed: {0}")]
    Upstream(String),

    // === APPLICATION ERRORS ===
    #[error("Resource conflict: {0}")]
    Conflict(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Too Many Requests: {0}")]
    TooManyRequests(String),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn to_http_response(&self) -> HttpResponse {
        let is_dev = cfg!(debug_assertions);

        let to_internal_json = |err_msg: &str| {
            if is_dev {
                serde_json::json!({ "error": err_msg })
            } else {
                serde_json::json!({ "error": "Internal server error" })
            }
        };

        match self {
            // === CONVERSION ERRORS ===
            AppError::Database(error) => {
                log::error!("Database error: {}", error);
                HttpResponse::InternalServerError().json(to_internal_json(&error.to_string()))
            }
            AppError::JWT(_) => HttpResponse::Unauthorized()
                .json(serde_json::json!({ "error": "Invalid session, please log in again" })),
            AppError::Reqwest(error) => {
                log::error!("Reqwest error: {}", error);
                HttpResponse::BadGateway()
                    .json(serde_json::json!({ "error": "Please try again" }))
            }
            AppError::Stripe(error) => {
                log::error!("Stripe error: {}", error);
                HttpResponse::BadGateway()
                    .json(serde_json::json!({ "error": "Payment failed, please try again" }))
            }

            // === DOMAIN ERRORS ===
            AppError::NotAuthenticated(_) => HttpResponse::Unauthorized().json(
                serde_json::json!({ "error": self.to_string(), "action": "login" }),
            ),
            AppError::QuotaExceeded {
                feature,
                current,
                limit,
                price_minor_units,
            } => {
                let action = if price_minor_units.is_some() {
                    "pay"
                } else {
                    "upgrade"
                };
                HttpResponse::PaymentRequired().json(serde_json::json!({
                    "error": self.to_string(),
                    "action": action,
                    "feature": feature,
                    "current": current,
                    "limit": limit,
                    "price_minor_units": price_minor_units,
                }))
            }
            AppError::Upstream(error) => {
                log::error!("Upstream error: {}", error);
                HttpResponse::BadGateway().json(serde_json::json!({ "error": "Please try again" }))
            }

            // === APPLICATION ERRORS ===
            AppError::Conflict(_) => {
                HttpResponse::Conflict().json(serde_json::json!({ "error": self.to_string() }))
            }
            AppError::Forbidden(_) => {
                HttpResponse::Forbidden().json(serde_json::json!({ "error": self.to_string() }))
            }
            AppError::NotFound(_) => {
                HttpResponse::NotFound().json(serde_json::json!({ "error": self.to_string() }))
            }
            AppError::BadRequest(_) => {
                HttpResponse::BadRequest().json(serde_json::json!({ "error": self.to_string() }))
            }
            AppError::TooManyRequests(_) => HttpResponse::TooManyRequests()
                .json(serde_json::json!({ "error": self.to_string() })),

            AppError::Internal(error) => {
                log::error!("Internal error: {}", error);
                HttpResponse::InternalServerError().json(to_internal_json(error))
            }
        }
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        self.to_http_response().status()
    }

    fn error_response(&self) -> HttpResponse {
        self.to_http_response()
    }
}
