use actix_web::{HttpResponse, Responder};
use serde::Serialize;

use super::error::Res;

pub struct Success;
impl Success {
    pub fn created<T: Serialize>(body: T) -> Res<impl Responder> {
        Result::Ok(HttpResponse::Created().json(body))
    }
    pub fn ok<T: Serialize>(body: T) -> Res<impl Responder> {
        Result::Ok(HttpResponse::Ok().json(body))
    }
    /// Used for webhook deliveries: the provider only cares about a 2xx.
    pub fn accepted() -> Res<impl Responder> {
        Result::Ok(HttpResponse::Accepted().finish())
    }
    pub fn html(body: String) -> Res<impl Responder> {
        Result::Ok(
            HttpResponse::Ok()
                .content_type("text/html; charset=utf-8")
                .body(body),
        )
    }
}
