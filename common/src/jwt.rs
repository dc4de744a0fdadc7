use actix_web::{HttpMessage, dev::ServiceRequest};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    env_config::JwtConfig,
    error::{AppError, Res},
};

/// Session claims issued by the hosted auth backend.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtClaims {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub exp: usize,
}

/// Generates JWT token for a user based on JWT configuration options
pub fn generate_jwt(user_id: Uuid, email: Option<String>, config: &JwtConfig) -> Res<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(config.expiration_hours))
        .ok_or_else(|| AppError::Internal("Invalid token expiration".to_string()))?
        .timestamp();

    let claims = JwtClaims {
        user_id,
        email,
        exp: expiration as usize,
    };

    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(AppError::from)
}

/// Extracts claims object from JWT token.
/// Requires JWT secret.
pub fn validate_jwt(token: &str, secret: &str) -> Res<JwtClaims> {
    let token_data = jsonwebtoken::decode::<JwtClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// Reads the claims the extractor middleware left on the request.
pub fn get_jwt_claims_or_error(req: &ServiceRequest) -> Res<JwtClaims> {
    match req.extensions().get::<Res<JwtClaims>>() {
        Some(Ok(claims)) => Ok(claims.clone()),
        Some(Err(e)) => Err(AppError::NotAuthenticated(format!(
            "Invalid session token: {}",
            e
        ))),
        None => Err(AppError::NotAuthenticated(
            "No authorization token provided".to_string(),
        )),
    }
}
