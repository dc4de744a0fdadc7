use middleware::{extractor::ExtractionMiddleware, guard::AuthGuard};

pub mod middleware {
    pub mod extractor;
    pub mod guard;
}

/// Reads the bearer token, if any, and leaves the validation result on the request.
pub fn middleware() -> ExtractionMiddleware {
    ExtractionMiddleware::new()
}

/// Refuses requests without a valid session.
pub fn auth_middleware() -> AuthGuard {
    AuthGuard::new()
}
