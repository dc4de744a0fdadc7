use std::collections::{BTreeMap, HashMap};

use db::models::subscription::BillingInterval;
use serde::Serialize;

use crate::feature::{FeatureKey, Quota};

pub const FREE_PLAN_ID: &str = "free";
pub const PREMIUM_PLAN_ID: &str = "premium";
pub const PROFESSIONAL_PLAN_ID: &str = "professional";

/// A subscription tier. Reference data, never mutated at runtime.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    pub id: String,
    pub display_name: String,
    pub monthly_price_minor_units: i64,
    /// `None` when the plan cannot be bought yearly.
    pub yearly_price_minor_units: Option<i64>,
    pub currency: String,
    pub feature_quotas: BTreeMap<FeatureKey, Quota>,
}

impl Plan {
    /// Missing features have no allowance.
    pub fn quota(&self, feature: FeatureKey) -> Quota {
        self.feature_quotas
            .get(&feature)
            .copied()
            .unwrap_or(Quota::Limited(0))
    }

    pub fn is_free(&self) -> bool {
        self.monthly_price_minor_units == 0
    }

    pub fn supports(&self, interval: BillingInterval) -> bool {
        self.price_for(interval).is_some()
    }

    pub fn price_for(&self, interval: BillingInterval) -> Option<i64> {
        match interval {
            BillingInterval::Monthly if !self.is_free() => Some(self.monthly_price_minor_units),
            BillingInterval::Yearly if !self.is_free() => self.yearly_price_minor_units,
            _ => None,
        }
    }
}

/// The set of plans a deployment sells. Always contains the free plan.
#[derive(Debug, Clone)]
pub struct PlanCatalog {
    plans: HashMap<String, Plan>,
    free: Plan,
}

impl PlanCatalog {
    pub fn new(free: Plan, paid: Vec<Plan>) -> Self {
        let plans = paid.into_iter().map(|p| (p.id.clone(), p)).collect();
        Self { plans, free }
    }

    pub fn free(&self) -> &Plan {
        &self.free
    }

    pub fn get(&self, plan_id: &str) -> Option<&Plan> {
        if plan_id == self.free.id {
            return Some(&self.free);
        }
        self.plans.get(plan_id)
    }

    /// All plans, cheapest first.
    pub fn list(&self) -> Vec<&Plan> {
        let mut plans: Vec<&Plan> = std::iter::once(&self.free)
            .chain(self.plans.values())
            .collect();
        plans.sort_by_key(|p| p.monthly_price_minor_units);
        plans
    }
}

impl Default for PlanCatalog {
    /// Product tiers as sold in Cameroon, prices in XAF.
    fn default() -> Self {
        use FeatureKey::*;
        use Quota::*;

        let free = Plan {
            id: FREE_PLAN_ID.to_string(),
            display_name: "Free".to_string(),
            monthly_price_minor_units: 0,
            yearly_price_minor_units: None,
            currency: "xaf".to_string(),
            feature_quotas: BTreeMap::from([
                (ResumeCreation, Limited(1)),
                (ResumeDownloads, Limited(0)),
                (CoverLetters, Limited(2)),
                (AtsOptimizations, Limited(1)),
                (InterviewQuestions, Limited(3)),
            ]),
        };
        let premium = Plan {
            id: PREMIUM_PLAN_ID.to_string(),
            display_name: "Premium".to_string(),
            monthly_price_minor_units: 3_000,
            yearly_price_minor_units: Some(30_000),
            currency: "xaf".to_string(),
            feature_quotas: BTreeMap::from([
                (ResumeCreation, Unlimited),
                (ResumeDownloads, Limited(5)),
                (CoverLetters, Limited(10)),
                (AtsOptimizations, Limited(5)),
                (InterviewQuestions, Limited(20)),
            ]),
        };
        let professional = Plan {
            id: PROFESSIONAL_PLAN_ID.to_string(),
            display_name: "Professional".to_string(),
            monthly_price_minor_units: 7_500,
            yearly_price_minor_units: Some(75_000),
            currency: "xaf".to_string(),
            feature_quotas: FeatureKey::ALL.into_iter().map(|f| (f, Unlimited)).collect(),
        };

        PlanCatalog::new(free, vec![premium, professional])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_lists_plans_by_price() {
        let catalog = PlanCatalog::default();
        let ids: Vec<&str> = catalog.list().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec![FREE_PLAN_ID, PREMIUM_PLAN_ID, PROFESSIONAL_PLAN_ID]);
    }

    #[test]
    fn free_plan_has_no_downloads_and_cannot_be_bought() {
        let catalog = PlanCatalog::default();
        let free = catalog.free();
        assert_eq!(free.quota(FeatureKey::ResumeDownloads), Quota::Limited(0));
        assert!(!free.supports(BillingInterval::Monthly));
        assert!(catalog.get(FREE_PLAN_ID).is_some());
    }

    #[test]
    fn premium_caps_downloads_and_professional_is_unlimited() {
        let catalog = PlanCatalog::default();
        let premium = catalog.get(PREMIUM_PLAN_ID).unwrap();
        assert_eq!(premium.quota(FeatureKey::ResumeDownloads), Quota::Limited(5));
        assert_eq!(premium.price_for(BillingInterval::Yearly), Some(30_000));
        let pro = catalog.get(PROFESSIONAL_PLAN_ID).unwrap();
        for feature in FeatureKey::ALL {
            assert_eq!(pro.quota(feature), Quota::Unlimited);
        }
    }

    #[test]
    fn unknown_feature_on_a_plan_has_zero_quota() {
        let plan = Plan {
            id: "trial".into(),
            display_name: "Trial".into(),
            monthly_price_minor_units: 100,
            yearly_price_minor_units: None,
            currency: "xaf".into(),
            feature_quotas: BTreeMap::new(),
        };
        assert_eq!(plan.quota(FeatureKey::CoverLetters), Quota::Limited(0));
        assert!(!plan.supports(BillingInterval::Yearly));
    }
}
