use middleware::{feature::FeatureGate, global::GlobalLimiter};

pub mod middleware {
    pub mod feature;
    pub mod global;
}

pub fn global_middleware(permits_per_second: u32) -> GlobalLimiter {
    GlobalLimiter::new(permits_per_second)
}

/// Rejects a request early when the `{feature}` named in its path is already
/// used up. Nothing is counted here; handlers record the use on success.
pub fn feature_middleware() -> FeatureGate {
    FeatureGate::new()
}
