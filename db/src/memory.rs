//! In-memory store for tests and local development without Postgres.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use chrono::Utc;
use common::error::{AppError, Res};
use uuid::Uuid;

use crate::{
    dtos::{purchase::PurchaseCreateRequest, subscription::SubscriptionCreateRequest},
    models::{
        purchase::{Purchase, PurchaseStatus},
        subscription::{Subscription, SubscriptionStatus},
        usage::UsageCounter,
    },
    store::EntitlementStore,
};

type UsageKey = (Uuid, String, String);

#[derive(Default)]
struct State {
    subscriptions: HashMap<Uuid, Subscription>,
    usage: HashMap<UsageKey, UsageCounter>,
    purchases: HashMap<Uuid, Purchase>,
}

/// Each method holds the lock for its whole read-modify-write, which gives
/// the same per-statement atomicity as the Postgres store.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a subscription row as-is, bypassing the lifecycle rules.
    pub fn with_subscription(self, subscription: Subscription) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state
                .subscriptions
                .insert(subscription.user_id, subscription);
        }
        self
    }

    fn lock(&self) -> Res<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| AppError::Internal("Memory store lock poisoned".to_string()))
    }

    fn bump(state: &mut State, user_id: Uuid, feature: &str, period: &str) -> i64 {
        let counter = state
            .usage
            .entry((user_id, feature.to_string(), period.to_string()))
            .or_insert_with(|| UsageCounter {
                user_id,
                feature: feature.to_string(),
                period: period.to_string(),
                current: 0,
                updated_at: Utc::now(),
            });
        counter.current += 1;
        counter.updated_at = Utc::now();
        counter.current
    }
}

#[async_trait]
impl EntitlementStore for MemoryStore {
    async fn get_subscription(&self, user_id: Uuid) -> Res<Option<Subscription>> {
        Ok(self.lock()?.subscriptions.get(&user_id).cloned())
    }

    async fn replace_subscription(&self, data: SubscriptionCreateRequest) -> Res<Subscription> {
        let now = Utc::now();
        let subscription = Subscription {
            id: Uuid::new_v4(),
            user_id: data.user_id,
            plan_id: data.plan_id,
            billing_interval: data.billing_interval,
            start_date: data.start_date,
            end_date: data.end_date,
            status: data.status,
            auto_renew: data.auto_renew,
            transaction_id: None,
            created_at: now,
            updated_at: now,
        };
        self.lock()?
            .subscriptions
            .insert(subscription.user_id, subscription.clone());
        Ok(subscription)
    }

    async fn transition_subscription(
        &self,
        user_id: Uuid,
        from: SubscriptionStatus,
        to: SubscriptionStatus,
    ) -> Res<Option<Subscription>> {
        let mut state = self.lock()?;
        Ok(state
            .subscriptions
            .get_mut(&user_id)
            .filter(|s| s.status == from)
            .map(|s| {
                s.status = to;
                s.updated_at = Utc::now();
                s.clone()
            }))
    }

    async fn transition_subscription_payment(
        &self,
        transaction_id: &str,
        from: SubscriptionStatus,
        to: SubscriptionStatus,
    ) -> Res<Option<Subscription>> {
        let mut state = self.lock()?;
        Ok(state
            .subscriptions
            .values_mut()
            .find(|s| s.transaction_id.as_deref() == Some(transaction_id) && s.status == from)
            .map(|s| {
                s.status = to;
                s.updated_at = Utc::now();
                s.clone()
            }))
    }

    async fn set_subscription_transaction(
        &self,
        user_id: Uuid,
        transaction_id: &str,
    ) -> Res<Option<Subscription>> {
        let mut state = self.lock()?;
        Ok(state.subscriptions.get_mut(&user_id).map(|s| {
            s.transaction_id = Some(transaction_id.to_string());
            s.updated_at = Utc::now();
            s.clone()
        }))
    }

    async fn set_auto_renew(
        &self,
        user_id: Uuid,
        auto_renew: bool,
    ) -> Res<Option<Subscription>> {
        let mut state = self.lock()?;
        Ok(state.subscriptions.get_mut(&user_id).map(|s| {
            s.auto_renew = auto_renew;
            s.updated_at = Utc::now();
            s.clone()
        }))
    }

    async fn find_subscription_by_transaction(
        &self,
        transaction_id: &str,
    ) -> Res<Option<Subscription>> {
        Ok(self
            .lock()?
            .subscriptions
            .values()
            .find(|s| s.transaction_id.as_deref() == Some(transaction_id))
            .cloned())
    }

    async fn get_usage(&self, user_id: Uuid, feature: &str, period: &str) -> Res<i64> {
        Ok(self
            .lock()?
            .usage
            .get(&(user_id, feature.to_string(), period.to_string()))
            .map(|c| c.current)
            .unwrap_or(0))
    }

    async fn list_usage(&self, user_id: Uuid, period: &str) -> Res<Vec<UsageCounter>> {
        let mut counters: Vec<UsageCounter> = self
            .lock()?
            .usage
            .values()
            .filter(|c| c.user_id == user_id && c.period == period)
            .cloned()
            .collect();
        counters.sort_by(|a, b| a.feature.cmp(&b.feature));
        Ok(counters)
    }

    async fn increment_usage(&self, user_id: Uuid, feature: &str, period: &str) -> Res<i64> {
        let mut state = self.lock()?;
        Ok(Self::bump(&mut state, user_id, feature, period))
    }

    async fn increment_usage_within(
        &self,
        user_id: Uuid,
        feature: &str,
        period: &str,
        limit: Option<i64>,
    ) -> Res<Option<i64>> {
        let mut state = self.lock()?;
        let current = state
            .usage
            .get(&(user_id, feature.to_string(), period.to_string()))
            .map(|c| c.current)
            .unwrap_or(0);
        match limit {
            Some(limit) if current >= limit => Ok(None),
            _ => Ok(Some(Self::bump(&mut state, user_id, feature, period))),
        }
    }

    async fn insert_purchase(&self, data: PurchaseCreateRequest) -> Res<Purchase> {
        let purchase = Purchase {
            id: Uuid::new_v4(),
            user_id: data.user_id,
            resource_id: data.resource_id,
            amount_minor_units: data.amount_minor_units,
            currency: data.currency,
            status: PurchaseStatus::Pending,
            transaction_id: None,
            created_at: Utc::now(),
            redeemed_at: None,
        };
        self.lock()?.purchases.insert(purchase.id, purchase.clone());
        Ok(purchase)
    }

    async fn get_purchase(&self, receipt_id: Uuid) -> Res<Option<Purchase>> {
        Ok(self.lock()?.purchases.get(&receipt_id).cloned())
    }

    async fn set_purchase_transaction(
        &self,
        receipt_id: Uuid,
        transaction_id: &str,
    ) -> Res<Option<Purchase>> {
        let mut state = self.lock()?;
        Ok(state.purchases.get_mut(&receipt_id).map(|p| {
            p.transaction_id = Some(transaction_id.to_string());
            p.clone()
        }))
    }

    async fn find_purchase_by_transaction(
        &self,
        transaction_id: &str,
    ) -> Res<Option<Purchase>> {
        Ok(self
            .lock()?
            .purchases
            .values()
            .find(|p| p.transaction_id.as_deref() == Some(transaction_id))
            .cloned())
    }

    async fn transition_purchase(
        &self,
        receipt_id: Uuid,
        from: PurchaseStatus,
        to: PurchaseStatus,
    ) -> Res<Option<Purchase>> {
        let mut state = self.lock()?;
        Ok(state
            .purchases
            .get_mut(&receipt_id)
            .filter(|p| p.status == from)
            .map(|p| {
                p.status = to;
                if to == PurchaseStatus::Redeemed {
                    p.redeemed_at = Some(Utc::now());
                }
                p.clone()
            }))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn increment_within_stops_at_limit() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        for expected in 1..=3 {
            let count = store
                .increment_usage_within(user, "cover_letters", "2024-05", Some(3))
                .await
                .unwrap();
            assert_eq!(count, Some(expected));
        }
        let rejected = store
            .increment_usage_within(user, "cover_letters", "2024-05", Some(3))
            .await
            .unwrap();
        assert_eq!(rejected, None);
        assert_eq!(
            store.get_usage(user, "cover_letters", "2024-05").await.unwrap(),
            3
        );
    }

    #[tokio::test]
    async fn zero_limit_never_creates_a_row() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let count = store
            .increment_usage_within(user, "resume_downloads", "2024-05", Some(0))
            .await
            .unwrap();
        assert_eq!(count, None);
        assert!(store.list_usage(user, "2024-05").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn periods_are_counted_separately() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        store.increment_usage(user, "cover_letters", "2024-05").await.unwrap();
        store.increment_usage(user, "cover_letters", "2024-06").await.unwrap();
        store.increment_usage(user, "cover_letters", "2024-06").await.unwrap();
        assert_eq!(store.get_usage(user, "cover_letters", "2024-05").await.unwrap(), 1);
        assert_eq!(store.get_usage(user, "cover_letters", "2024-06").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn purchase_redeems_only_once() {
        let store = Arc::new(MemoryStore::new());
        let purchase = store
            .insert_purchase(PurchaseCreateRequest {
                user_id: Uuid::new_v4(),
                resource_id: "resume-1".to_string(),
                amount_minor_units: 500,
                currency: "xaf".to_string(),
            })
            .await
            .unwrap();
        store
            .transition_purchase(purchase.id, PurchaseStatus::Pending, PurchaseStatus::Paid)
            .await
            .unwrap()
            .unwrap();

        let first = store
            .transition_purchase(purchase.id, PurchaseStatus::Paid, PurchaseStatus::Redeemed)
            .await
            .unwrap();
        let second = store
            .transition_purchase(purchase.id, PurchaseStatus::Paid, PurchaseStatus::Redeemed)
            .await
            .unwrap();
        assert!(first.unwrap().redeemed_at.is_some());
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn payment_transition_only_moves_the_row_it_paid_for() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let now = Utc::now();
        store
            .replace_subscription(SubscriptionCreateRequest {
                user_id: user,
                plan_id: "premium".to_string(),
                billing_interval: crate::models::subscription::BillingInterval::Monthly,
                start_date: now,
                end_date: now,
                status: SubscriptionStatus::Pending,
                auto_renew: true,
            })
            .await
            .unwrap();
        store.set_subscription_transaction(user, "txn_2").await.unwrap();

        let stale = store
            .transition_subscription_payment(
                "txn_1",
                SubscriptionStatus::Pending,
                SubscriptionStatus::Active,
            )
            .await
            .unwrap();
        assert!(stale.is_none());

        let current = store
            .transition_subscription_payment(
                "txn_2",
                SubscriptionStatus::Pending,
                SubscriptionStatus::Active,
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(current.status, SubscriptionStatus::Active);
    }
}
