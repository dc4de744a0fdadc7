use actix_web::web::{self};

pub mod routes {
    pub mod pay;
    pub mod plans;
    pub mod purchase;
    pub mod sub;
}

pub mod services {
    pub mod gateway;
    pub mod pay;
    pub mod purchase;
    pub mod sub;
}

pub mod dtos {
    pub mod purchase;
    pub mod sub;
}

pub use services::{
    gateway::{PaymentGateway, StripeGateway},
    purchase::PurchaseService,
    sub::SubscriptionService,
};

pub fn mount_plans() -> actix_web::Scope {
    web::scope("/plans").service(routes::plans::get_plans)
}
pub fn mount_subs() -> actix_web::Scope {
    web::scope("/sub")
        .service(routes::sub::post_checkout)
        .service(routes::sub::post_confirm)
        .service(routes::sub::get_current)
        .service(routes::sub::post_auto_renew)
        .service(routes::sub::post_cancel)
}
pub fn mount_purchase() -> actix_web::Scope {
    web::scope("/purchase")
        .service(routes::purchase::post_purchase)
        .service(routes::purchase::get_purchase)
}
pub fn mount_webhook() -> actix_web::Scope {
    web::scope("/pay").service(routes::pay::post_webhook)
}
