use std::sync::Arc;

use chrono::Utc;
use common::error::{AppError, Res};
use db::{
    models::purchase::{Purchase, PurchaseStatus},
    store::EntitlementStore,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    feature::{FeatureKey, Quota},
    period::period_key,
    plans::{Plan, PlanCatalog},
};

/// Result of a quota check for one feature in the current period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageCheck {
    pub feature: FeatureKey,
    pub allowed: bool,
    pub current: i64,
    pub limit: Quota,
}

/// Which entitlement track applies to a user and feature right now.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "track", rename_all = "snake_case")]
pub enum EntitlementDecision {
    Quota(UsageCheck),
    OneOffRequired {
        feature: FeatureKey,
        price_minor_units: i64,
        currency: String,
    },
}

impl EntitlementDecision {
    pub fn allowed(&self) -> bool {
        matches!(self, EntitlementDecision::Quota(check) if check.allowed)
    }

    /// The error to answer with when the decision does not allow a use.
    pub fn denial(&self) -> Option<AppError> {
        match self {
            EntitlementDecision::Quota(check) if check.allowed => None,
            EntitlementDecision::Quota(check) => Some(AppError::QuotaExceeded {
                feature: check.feature.to_string(),
                current: check.current,
                limit: check.limit.display_value(),
                price_minor_units: None,
            }),
            EntitlementDecision::OneOffRequired {
                feature,
                price_minor_units,
                ..
            } => Some(AppError::QuotaExceeded {
                feature: feature.to_string(),
                current: 0,
                limit: 0,
                price_minor_units: Some(*price_minor_units),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageOverview {
    pub plan_id: String,
    pub period: String,
    pub features: Vec<EntitlementDecision>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OneOffPrice {
    pub amount_minor_units: i64,
    pub currency: String,
}

/// Decides whether a user may use a gated feature and records the use.
///
/// The engine owns no state beyond its store handle, so a single instance is
/// shared across all workers.
#[derive(Clone)]
pub struct EntitlementEngine {
    store: Arc<dyn EntitlementStore>,
    catalog: Arc<PlanCatalog>,
    one_off: OneOffPrice,
}

impl EntitlementEngine {
    pub fn new(
        store: Arc<dyn EntitlementStore>,
        catalog: Arc<PlanCatalog>,
        one_off: OneOffPrice,
    ) -> Self {
        Self {
            store,
            catalog,
            one_off,
        }
    }

    pub fn catalog(&self) -> &PlanCatalog {
        &self.catalog
    }

    pub fn one_off_price(&self) -> &OneOffPrice {
        &self.one_off
    }

    /// The plan whose quotas apply now. Anything other than an active,
    /// unexpired subscription on a known plan resolves to free.
    pub async fn resolve_plan(&self, user_id: Uuid) -> Res<&Plan> {
        let Some(subscription) = self.store.get_subscription(user_id).await? else {
            return Ok(self.catalog.free());
        };

        if !subscription.is_entitled(Utc::now()) {
            return Ok(self.catalog.free());
        }

        match self.catalog.get(&subscription.plan_id) {
            Some(plan) => Ok(plan),
            None => {
                log::warn!(
                    "User {} is subscribed to unknown plan '{}', falling back to free",
                    user_id,
                    subscription.plan_id
                );
                Ok(self.catalog.free())
            }
        }
    }

    pub async fn check_usage(&self, user_id: Uuid, feature: FeatureKey) -> Res<UsageCheck> {
        let plan = self.resolve_plan(user_id).await?;
        self.check_on_plan(user_id, feature, plan).await
    }

    /// Records one use without checking the quota. Returns the new count.
    pub async fn increment_usage(&self, user_id: Uuid, feature: FeatureKey) -> Res<i64> {
        let period = period_key(Utc::now());
        self.store
            .increment_usage(user_id, feature.as_str(), &period)
            .await
    }

    /// Checks and records one use in a single store operation. When the quota
    /// is already used up nothing is written and `allowed` is false.
    pub async fn check_and_increment(
        &self,
        user_id: Uuid,
        feature: FeatureKey,
    ) -> Res<UsageCheck> {
        let plan = self.resolve_plan(user_id).await?;
        let limit = plan.quota(feature);
        let period = period_key(Utc::now());

        let incremented = self
            .store
            .increment_usage_within(user_id, feature.as_str(), &period, limit.as_limit())
            .await?;

        match incremented {
            Some(current) => Ok(UsageCheck {
                feature,
                allowed: true,
                current,
                limit,
            }),
            None => {
                let current = self
                    .store
                    .get_usage(user_id, feature.as_str(), &period)
                    .await?;
                Ok(UsageCheck {
                    feature,
                    allowed: false,
                    current,
                    limit,
                })
            }
        }
    }

    pub async fn decide(&self, user_id: Uuid, feature: FeatureKey) -> Res<EntitlementDecision> {
        let plan = self.resolve_plan(user_id).await?;
        self.decide_on_plan(user_id, feature, plan).await
    }

    /// Consumes one use of `feature` or fails with `QuotaExceeded`, carrying
    /// the one-off price when the feature is sold per use on this plan.
    pub async fn consume(&self, user_id: Uuid, feature: FeatureKey) -> Res<UsageCheck> {
        let plan = self.resolve_plan(user_id).await?;
        if self.requires_one_off(plan, feature) {
            log::info!("User {} must pay per use for {}", user_id, feature);
            return Err(self.one_off_decision(feature).denial().unwrap_or_else(|| {
                AppError::Internal(format!("No denial for one-off feature {}", feature))
            }));
        }

        let check = self.check_and_increment(user_id, feature).await?;
        if !check.allowed {
            log::info!(
                "User {} reached {} quota on plan {} ({}/{})",
                user_id,
                feature,
                plan.id,
                check.current,
                check.limit.display_value()
            );
            return Err(AppError::QuotaExceeded {
                feature: feature.to_string(),
                current: check.current,
                limit: check.limit.display_value(),
                price_minor_units: None,
            });
        }
        Ok(check)
    }

    pub async fn overview(&self, user_id: Uuid) -> Res<UsageOverview> {
        let plan = self.resolve_plan(user_id).await?;
        let mut features = Vec::with_capacity(FeatureKey::ALL.len());
        for feature in FeatureKey::ALL {
            features.push(self.decide_on_plan(user_id, feature, plan).await?);
        }
        Ok(UsageOverview {
            plan_id: plan.id.clone(),
            period: period_key(Utc::now()),
            features,
        })
    }

    /// Spends a paid receipt on `resource_id`. A receipt unlocks exactly one
    /// use and never touches the usage counters.
    pub async fn redeem_one_off(
        &self,
        user_id: Uuid,
        receipt_id: Uuid,
        resource_id: &str,
    ) -> Res<Purchase> {
        let purchase = self
            .store
            .get_purchase(receipt_id)
            .await?
            .filter(|p| p.user_id == user_id)
            .ok_or_else(|| AppError::NotFound("Receipt not found".to_string()))?;

        if purchase.resource_id != resource_id {
            return Err(AppError::Forbidden(
                "Receipt was bought for another resource".to_string(),
            ));
        }
        match purchase.status {
            PurchaseStatus::Paid => {}
            PurchaseStatus::Redeemed => {
                return Err(AppError::Conflict("Receipt already used".to_string()));
            }
            PurchaseStatus::Pending => {
                return Err(AppError::Conflict(
                    "Payment for this receipt is not confirmed yet".to_string(),
                ));
            }
            PurchaseStatus::Failed => {
                return Err(AppError::BadRequest(
                    "Payment for this receipt failed".to_string(),
                ));
            }
        }

        let redeemed = self
            .store
            .transition_purchase(receipt_id, PurchaseStatus::Paid, PurchaseStatus::Redeemed)
            .await?
            .ok_or_else(|| AppError::Conflict("Receipt already used".to_string()))?;
        log::info!(
            "User {} redeemed receipt {} for {}",
            user_id,
            receipt_id,
            resource_id
        );
        Ok(redeemed)
    }

    fn one_off_decision(&self, feature: FeatureKey) -> EntitlementDecision {
        EntitlementDecision::OneOffRequired {
            feature,
            price_minor_units: self.one_off.amount_minor_units,
            currency: self.one_off.currency.clone(),
        }
    }

    fn requires_one_off(&self, plan: &Plan, feature: FeatureKey) -> bool {
        plan.is_free() && feature.sells_one_off()
    }

    async fn decide_on_plan(
        &self,
        user_id: Uuid,
        feature: FeatureKey,
        plan: &Plan,
    ) -> Res<EntitlementDecision> {
        if self.requires_one_off(plan, feature) {
            return Ok(self.one_off_decision(feature));
        }
        self.check_on_plan(user_id, feature, plan)
            .await
            .map(EntitlementDecision::Quota)
    }

    async fn check_on_plan(
        &self,
        user_id: Uuid,
        feature: FeatureKey,
        plan: &Plan,
    ) -> Res<UsageCheck> {
        let limit = plan.quota(feature);
        let current = self.current(user_id, feature).await?;
        Ok(UsageCheck {
            feature,
            allowed: limit.allows(current),
            current,
            limit,
        })
    }

    async fn current(&self, user_id: Uuid, feature: FeatureKey) -> Res<i64> {
        let period = period_key(Utc::now());
        self.store
            .get_usage(user_id, feature.as_str(), &period)
            .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration};
    use db::{
        MemoryStore,
        models::subscription::{BillingInterval, Subscription, SubscriptionStatus},
    };

    use super::*;
    use crate::plans::{FREE_PLAN_ID, PREMIUM_PLAN_ID, PROFESSIONAL_PLAN_ID};

    fn engine(store: MemoryStore) -> (EntitlementEngine, Arc<MemoryStore>) {
        let store = Arc::new(store);
        let engine = EntitlementEngine::new(
            store.clone(),
            Arc::new(PlanCatalog::default()),
            OneOffPrice {
                amount_minor_units: 500,
                currency: "xaf".to_string(),
            },
        );
        (engine, store)
    }

    fn subscription(
        user_id: Uuid,
        plan_id: &str,
        status: SubscriptionStatus,
        end_date: DateTime<Utc>,
    ) -> Subscription {
        let start = end_date - Duration::days(30);
        Subscription {
            id: Uuid::new_v4(),
            user_id,
            plan_id: plan_id.to_string(),
            billing_interval: BillingInterval::Monthly,
            start_date: start,
            end_date,
            status,
            auto_renew: true,
            transaction_id: None,
            created_at: start,
            updated_at: start,
        }
    }

    async fn use_n(store: &MemoryStore, user: Uuid, feature: FeatureKey, n: usize) {
        let period = period_key(Utc::now());
        for _ in 0..n {
            store
                .increment_usage(user, feature.as_str(), &period)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn user_without_subscription_is_on_free() {
        let (engine, _) = engine(MemoryStore::new());
        let plan = engine.resolve_plan(Uuid::new_v4()).await.unwrap();
        assert_eq!(plan.id, FREE_PLAN_ID);
    }

    #[tokio::test]
    async fn expired_subscription_resolves_to_free() {
        let user = Uuid::new_v4();
        let past = Utc::now() - Duration::days(1);
        let (engine, _) = engine(MemoryStore::new().with_subscription(subscription(
            user,
            PROFESSIONAL_PLAN_ID,
            SubscriptionStatus::Active,
            past,
        )));
        assert_eq!(engine.resolve_plan(user).await.unwrap().id, FREE_PLAN_ID);
    }

    #[tokio::test]
    async fn pending_and_cancelled_subscriptions_resolve_to_free() {
        let future = Utc::now() + Duration::days(10);
        for status in [SubscriptionStatus::Pending, SubscriptionStatus::Cancelled] {
            let user = Uuid::new_v4();
            let (engine, _) = engine(MemoryStore::new().with_subscription(subscription(
                user,
                PREMIUM_PLAN_ID,
                status,
                future,
            )));
            assert_eq!(engine.resolve_plan(user).await.unwrap().id, FREE_PLAN_ID);
        }
    }

    #[tokio::test]
    async fn unknown_plan_id_falls_back_to_free() {
        let user = Uuid::new_v4();
        let future = Utc::now() + Duration::days(10);
        let (engine, _) = engine(MemoryStore::new().with_subscription(subscription(
            user,
            "legacy-gold",
            SubscriptionStatus::Active,
            future,
        )));
        assert_eq!(engine.resolve_plan(user).await.unwrap().id, FREE_PLAN_ID);
    }

    #[tokio::test]
    async fn active_subscription_resolves_to_its_plan() {
        let user = Uuid::new_v4();
        let future = Utc::now() + Duration::days(10);
        let (engine, _) = engine(MemoryStore::new().with_subscription(subscription(
            user,
            PREMIUM_PLAN_ID,
            SubscriptionStatus::Active,
            future,
        )));
        assert_eq!(engine.resolve_plan(user).await.unwrap().id, PREMIUM_PLAN_ID);
    }

    #[tokio::test]
    async fn check_usage_below_and_at_limit() {
        let user = Uuid::new_v4();
        let future = Utc::now() + Duration::days(10);
        let (engine, store) = engine(MemoryStore::new().with_subscription(subscription(
            user,
            PREMIUM_PLAN_ID,
            SubscriptionStatus::Active,
            future,
        )));

        let fresh = engine
            .check_usage(user, FeatureKey::ResumeDownloads)
            .await
            .unwrap();
        assert!(fresh.allowed);
        assert_eq!(fresh.current, 0);
        assert_eq!(fresh.limit, Quota::Limited(5));

        use_n(&store, user, FeatureKey::ResumeDownloads, 5).await;
        let full = engine
            .check_usage(user, FeatureKey::ResumeDownloads)
            .await
            .unwrap();
        assert!(!full.allowed);
        assert_eq!(full.current, 5);
    }

    #[tokio::test]
    async fn unlimited_quota_always_allows() {
        let user = Uuid::new_v4();
        let future = Utc::now() + Duration::days(10);
        let (engine, store) = engine(MemoryStore::new().with_subscription(subscription(
            user,
            PROFESSIONAL_PLAN_ID,
            SubscriptionStatus::Active,
            future,
        )));
        use_n(&store, user, FeatureKey::CoverLetters, 250).await;
        let check = engine
            .check_usage(user, FeatureKey::CoverLetters)
            .await
            .unwrap();
        assert!(check.allowed);
        assert_eq!(check.limit, Quota::Unlimited);
        assert_eq!(serde_json::to_value(&check).unwrap()["limit"], -1);
    }

    #[tokio::test]
    async fn sequential_increments_count_up() {
        let (engine, _) = engine(MemoryStore::new());
        let user = Uuid::new_v4();
        for _ in 0..7 {
            engine
                .increment_usage(user, FeatureKey::InterviewQuestions)
                .await
                .unwrap();
        }
        let check = engine
            .check_usage(user, FeatureKey::InterviewQuestions)
            .await
            .unwrap();
        assert_eq!(check.current, 7);
    }

    #[tokio::test]
    async fn concurrent_consumers_cannot_overrun_the_last_slot() {
        let user = Uuid::new_v4();
        let future = Utc::now() + Duration::days(10);
        let (engine, store) = engine(MemoryStore::new().with_subscription(subscription(
            user,
            PREMIUM_PLAN_ID,
            SubscriptionStatus::Active,
            future,
        )));
        use_n(&store, user, FeatureKey::CoverLetters, 9).await;

        let attempts = (0..8).map(|_| {
            let engine = engine.clone();
            tokio::spawn(async move {
                engine
                    .check_and_increment(user, FeatureKey::CoverLetters)
                    .await
                    .unwrap()
            })
        });
        let results = futures::future::join_all(attempts).await;
        let granted = results
            .into_iter()
            .map(|r| r.unwrap())
            .filter(|check| check.allowed)
            .count();

        assert_eq!(granted, 1);
        let check = engine
            .check_usage(user, FeatureKey::CoverLetters)
            .await
            .unwrap();
        assert_eq!(check.current, 10);
    }

    #[tokio::test]
    async fn free_user_downloads_require_one_off_payment() {
        let (engine, store) = engine(MemoryStore::new());
        let user = Uuid::new_v4();

        let decision = engine
            .decide(user, FeatureKey::ResumeDownloads)
            .await
            .unwrap();
        assert_eq!(
            decision,
            EntitlementDecision::OneOffRequired {
                feature: FeatureKey::ResumeDownloads,
                price_minor_units: 500,
                currency: "xaf".to_string(),
            }
        );
        assert!(!decision.allowed());

        let err = engine
            .consume(user, FeatureKey::ResumeDownloads)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::QuotaExceeded {
                price_minor_units: Some(500),
                ..
            }
        ));
        let period = period_key(Utc::now());
        assert!(store.list_usage(user, &period).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn consume_fails_with_upgrade_prompt_when_quota_is_used() {
        let (engine, _) = engine(MemoryStore::new());
        let user = Uuid::new_v4();

        engine.consume(user, FeatureKey::ResumeCreation).await.unwrap();
        let err = engine
            .consume(user, FeatureKey::ResumeCreation)
            .await
            .unwrap_err();
        match err {
            AppError::QuotaExceeded {
                current,
                limit,
                price_minor_units,
                ..
            } => {
                assert_eq!((current, limit, price_minor_units), (1, 1, None));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn upgrade_mid_period_keeps_the_counter() {
        let user = Uuid::new_v4();
        let (engine, store) = engine(MemoryStore::new());
        use_n(&store, user, FeatureKey::CoverLetters, 2).await;
        assert!(
            !engine
                .check_usage(user, FeatureKey::CoverLetters)
                .await
                .unwrap()
                .allowed
        );

        store
            .replace_subscription(db::dtos::subscription::SubscriptionCreateRequest {
                user_id: user,
                plan_id: PREMIUM_PLAN_ID.to_string(),
                billing_interval: BillingInterval::Monthly,
                start_date: Utc::now(),
                end_date: Utc::now() + Duration::days(30),
                status: SubscriptionStatus::Active,
                auto_renew: true,
            })
            .await
            .unwrap();

        let check = engine
            .check_usage(user, FeatureKey::CoverLetters)
            .await
            .unwrap();
        assert!(check.allowed);
        assert_eq!(check.current, 2);
        assert_eq!(check.limit, Quota::Limited(10));
    }

    #[tokio::test]
    async fn paid_receipt_unlocks_one_download_without_counting() {
        let (engine, store) = engine(MemoryStore::new());
        let user = Uuid::new_v4();
        let purchase = store
            .insert_purchase(db::dtos::purchase::PurchaseCreateRequest {
                user_id: user,
                resource_id: "resume-42".to_string(),
                amount_minor_units: 500,
                currency: "xaf".to_string(),
            })
            .await
            .unwrap();

        let unpaid = engine.redeem_one_off(user, purchase.id, "resume-42").await;
        assert!(matches!(unpaid, Err(AppError::Conflict(_))));

        store
            .transition_purchase(purchase.id, PurchaseStatus::Pending, PurchaseStatus::Paid)
            .await
            .unwrap();

        let wrong_resource = engine.redeem_one_off(user, purchase.id, "resume-7").await;
        assert!(matches!(wrong_resource, Err(AppError::Forbidden(_))));
        let stranger = engine
            .redeem_one_off(Uuid::new_v4(), purchase.id, "resume-42")
            .await;
        assert!(matches!(stranger, Err(AppError::NotFound(_))));

        let redeemed = engine
            .redeem_one_off(user, purchase.id, "resume-42")
            .await
            .unwrap();
        assert_eq!(redeemed.status, PurchaseStatus::Redeemed);
        let again = engine.redeem_one_off(user, purchase.id, "resume-42").await;
        assert!(matches!(again, Err(AppError::Conflict(_))));

        let period = period_key(Utc::now());
        assert!(store.list_usage(user, &period).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn overview_covers_every_feature() {
        let (engine, _) = engine(MemoryStore::new());
        let overview = engine.overview(Uuid::new_v4()).await.unwrap();
        assert_eq!(overview.plan_id, FREE_PLAN_ID);
        assert_eq!(overview.features.len(), FeatureKey::ALL.len());
        assert!(overview.features.iter().any(|d| matches!(
            d,
            EntitlementDecision::OneOffRequired {
                feature: FeatureKey::ResumeDownloads,
                ..
            }
        )));
    }
}
