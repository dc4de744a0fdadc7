pub mod engine;
pub mod feature;
pub mod period;
pub mod plans;

pub use engine::{EntitlementDecision, EntitlementEngine, OneOffPrice, UsageCheck, UsageOverview};
pub use feature::{FeatureKey, Quota};
pub use plans::{Plan, PlanCatalog};
