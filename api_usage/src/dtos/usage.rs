use entitlements::{EntitlementDecision, UsageCheck};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct DecisionResponse {
    pub allowed: bool,
    pub decision: EntitlementDecision,
}

impl From<EntitlementDecision> for DecisionResponse {
    fn from(decision: EntitlementDecision) -> Self {
        Self {
            allowed: decision.allowed(),
            decision,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ConsumeResponse {
    pub usage: UsageCheck,
}
