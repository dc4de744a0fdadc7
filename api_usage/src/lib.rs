use actix_web::web::{self};

pub mod routes {
    pub mod generate;
    pub mod resume;
    pub mod usage;
}

pub mod services {
    pub mod generate;
    pub mod generator;
    pub mod resume;
}

pub mod dtos {
    pub mod generate;
    pub mod resume;
    pub mod usage;
}

pub use services::generator::{ContentGenerator, HttpGenerator};

pub fn mount_usage() -> actix_web::Scope {
    web::scope("/usage")
        .service(routes::usage::get_overview)
        .service(routes::usage::get_decision)
        .service(routes::usage::post_consume)
}
pub fn mount_generate() -> actix_web::Scope {
    web::scope("/generate").service(routes::generate::post_generate)
}
pub fn mount_resume() -> actix_web::Scope {
    web::scope("/resume").service(routes::resume::post_download)
}
