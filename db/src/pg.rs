use std::sync::Arc;

use async_trait::async_trait;
use common::error::Res;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    dtos::{purchase::PurchaseCreateRequest, subscription::SubscriptionCreateRequest},
    models::{
        purchase::{Purchase, PurchaseStatus},
        subscription::{Subscription, SubscriptionStatus},
        usage::UsageCounter,
    },
    purchase, store::EntitlementStore, subscription, usage,
};

/// Postgres-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: Arc<PgPool>,
}

impl PgStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntitlementStore for PgStore {
    async fn get_subscription(&self, user_id: Uuid) -> Res<Option<Subscription>> {
        subscription::get_subscription_by_user_id(&*self.pool, user_id).await
    }

    async fn replace_subscription(&self, data: SubscriptionCreateRequest) -> Res<Subscription> {
        subscription::upsert_subscription(&*self.pool, data).await
    }

    async fn transition_subscription(
        &self,
        user_id: Uuid,
        from: SubscriptionStatus,
        to: SubscriptionStatus,
    ) -> Res<Option<Subscription>> {
        subscription::update_subscription_status(&*self.pool, user_id, from, to).await
    }

    async fn transition_subscription_payment(
        &self,
        transaction_id: &str,
        from: SubscriptionStatus,
        to: SubscriptionStatus,
    ) -> Res<Option<Subscription>> {
        subscription::update_subscription_status_by_transaction(
            &*self.pool,
            transaction_id,
            from,
            to,
        )
        .await
    }

    async fn set_subscription_transaction(
        &self,
        user_id: Uuid,
        transaction_id: &str,
    ) -> Res<Option<Subscription>> {
        subscription::update_subscription_transaction(&*self.pool, user_id, transaction_id).await
    }

    async fn set_auto_renew(
        &self,
        user_id: Uuid,
        auto_renew: bool,
    ) -> Res<Option<Subscription>> {
        subscription::update_subscription_auto_renew(&*self.pool, user_id, auto_renew).await
    }

    async fn find_subscription_by_transaction(
        &self,
        transaction_id: &str,
    ) -> Res<Option<Subscription>> {
        subscription::get_subscription_by_transaction_id(&*self.pool, transaction_id).await
    }

    async fn get_usage(&self, user_id: Uuid, feature: &str, period: &str) -> Res<i64> {
        usage::get_usage_count(&*self.pool, user_id, feature, period).await
    }

    async fn list_usage(&self, user_id: Uuid, period: &str) -> Res<Vec<UsageCounter>> {
        usage::get_usage_for_period(&*self.pool, user_id, period).await
    }

    async fn increment_usage(&self, user_id: Uuid, feature: &str, period: &str) -> Res<i64> {
        usage::increment_usage(&*self.pool, user_id, feature, period).await
    }

    async fn increment_usage_within(
        &self,
        user_id: Uuid,
        feature: &str,
        period: &str,
        limit: Option<i64>,
    ) -> Res<Option<i64>> {
        match limit {
            Some(limit) => {
                usage::increment_usage_below_limit(&*self.pool, user_id, feature, period, limit)
                    .await
            }
            None => usage::increment_usage(&*self.pool, user_id, feature, period)
                .await
                .map(Some),
        }
    }

    async fn insert_purchase(&self, data: PurchaseCreateRequest) -> Res<Purchase> {
        purchase::insert_purchase(&*self.pool, data).await
    }

    async fn get_purchase(&self, receipt_id: Uuid) -> Res<Option<Purchase>> {
        purchase::get_purchase_by_id(&*self.pool, receipt_id).await
    }

    async fn set_purchase_transaction(
        &self,
        receipt_id: Uuid,
        transaction_id: &str,
    ) -> Res<Option<Purchase>> {
        purchase::update_purchase_transaction(&*self.pool, receipt_id, transaction_id).await
    }

    async fn find_purchase_by_transaction(
        &self,
        transaction_id: &str,
    ) -> Res<Option<Purchase>> {
        purchase::get_purchase_by_transaction_id(&*self.pool, transaction_id).await
    }

    async fn transition_purchase(
        &self,
        receipt_id: Uuid,
        from: PurchaseStatus,
        to: PurchaseStatus,
    ) -> Res<Option<Purchase>> {
        purchase::update_purchase_status(&*self.pool, receipt_id, from, to).await
    }
}
