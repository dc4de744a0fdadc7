use async_trait::async_trait;
use common::error::Res;
use uuid::Uuid;

use crate::{
    dtos::{purchase::PurchaseCreateRequest, subscription::SubscriptionCreateRequest},
    models::{
        purchase::{Purchase, PurchaseStatus},
        subscription::{Subscription, SubscriptionStatus},
        usage::UsageCounter,
    },
};

/// Row store behind the entitlement, subscription and purchase services.
///
/// Every method that moves a row between states takes the expected current
/// state and returns `None` when the row was not in it, so concurrent
/// requests cannot both win the same transition.
#[async_trait]
pub trait EntitlementStore: Send + Sync {
    // Subscriptions

    async fn get_subscription(&self, user_id: Uuid) -> Res<Option<Subscription>>;

    /// Inserts the user's subscription, replacing any previous row.
    async fn replace_subscription(&self, data: SubscriptionCreateRequest) -> Res<Subscription>;

    async fn transition_subscription(
        &self,
        user_id: Uuid,
        from: SubscriptionStatus,
        to: SubscriptionStatus,
    ) -> Res<Option<Subscription>>;

    /// Same as `transition_subscription`, but only for the row paid by
    /// `transaction_id`, so a payment can only move its own subscription.
    async fn transition_subscription_payment(
        &self,
        transaction_id: &str,
        from: SubscriptionStatus,
        to: SubscriptionStatus,
    ) -> Res<Option<Subscription>>;

    async fn set_subscription_transaction(
        &self,
        user_id: Uuid,
        transaction_id: &str,
    ) -> Res<Option<Subscription>>;

    async fn set_auto_renew(&self, user_id: Uuid, auto_renew: bool)
    -> Res<Option<Subscription>>;

    async fn find_subscription_by_transaction(
        &self,
        transaction_id: &str,
    ) -> Res<Option<Subscription>>;

    // Usage ledger

    /// Current count, 0 when the period has no row yet.
    async fn get_usage(&self, user_id: Uuid, feature: &str, period: &str) -> Res<i64>;

    async fn list_usage(&self, user_id: Uuid, period: &str) -> Res<Vec<UsageCounter>>;

    /// Unconditional +1, creating the row on first use. Returns the new count.
    async fn increment_usage(&self, user_id: Uuid, feature: &str, period: &str) -> Res<i64>;

    /// +1 only while the count is below `limit` (`None` means no limit).
    /// Returns the new count, or `None` when the limit was already reached.
    async fn increment_usage_within(
        &self,
        user_id: Uuid,
        feature: &str,
        period: &str,
        limit: Option<i64>,
    ) -> Res<Option<i64>>;

    // One-off purchases

    async fn insert_purchase(&self, data: PurchaseCreateRequest) -> Res<Purchase>;

    async fn get_purchase(&self, receipt_id: Uuid) -> Res<Option<Purchase>>;

    async fn set_purchase_transaction(
        &self,
        receipt_id: Uuid,
        transaction_id: &str,
    ) -> Res<Option<Purchase>>;

    async fn find_purchase_by_transaction(&self, transaction_id: &str)
    -> Res<Option<Purchase>>;

    async fn transition_purchase(
        &self,
        receipt_id: Uuid,
        from: PurchaseStatus,
        to: PurchaseStatus,
    ) -> Res<Option<Purchase>>;
}
