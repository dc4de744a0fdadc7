use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    dtos::subscription::SubscriptionCreateRequest,
    models::subscription::{Subscription, SubscriptionStatus},
};

pub async fn get_subscription_by_user_id<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
) -> Res<Option<Subscription>> {
    sqlx::query_as::<_, Subscription>("SELECT * FROM subscriptions WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}

pub async fn get_subscription_by_transaction_id<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    transaction_id: &str,
) -> Res<Option<Subscription>> {
    sqlx::query_as::<_, Subscription>("SELECT * FROM subscriptions WHERE transaction_id = $1")
        .bind(transaction_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}

/// One row per user: a new checkout overwrites the previous subscription.
pub async fn upsert_subscription<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    data: SubscriptionCreateRequest,
) -> Res<Subscription> {
    sqlx::query_as::<_, Subscription>(
        r#"
        INSERT INTO subscriptions (user_id, plan_id, billing_interval, start_date, end_date, status, auto_renew)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (user_id) DO UPDATE SET
            id = gen_random_uuid(),
            plan_id = EXCLUDED.plan_id,
            billing_interval = EXCLUDED.billing_interval,
            start_date = EXCLUDED.start_date,
            end_date = EXCLUDED.end_date,
            status = EXCLUDED.status,
            auto_renew = EXCLUDED.auto_renew,
            transaction_id = NULL,
            created_at = NOW(),
            updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(data.user_id)
    .bind(data.plan_id)
    .bind(data.billing_interval.as_str())
    .bind(data.start_date)
    .bind(data.end_date)
    .bind(data.status.as_str())
    .bind(data.auto_renew)
    .fetch_one(executor)
    .await
    .map_err(AppError::from)
}

pub async fn update_subscription_status<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
    from: SubscriptionStatus,
    to: SubscriptionStatus,
) -> Res<Option<Subscription>> {
    sqlx::query_as::<_, Subscription>(
        r#"
        UPDATE subscriptions SET status = $3, updated_at = NOW()
        WHERE user_id = $1 AND status = $2
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(from.as_str())
    .bind(to.as_str())
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}

pub async fn update_subscription_status_by_transaction<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    transaction_id: &str,
    from: SubscriptionStatus,
    to: SubscriptionStatus,
) -> Res<Option<Subscription>> {
    sqlx::query_as::<_, Subscription>(
        r#"
        UPDATE subscriptions SET status = $3, updated_at = NOW()
        WHERE transaction_id = $1 AND status = $2
        RETURNING *
        "#,
    )
    .bind(transaction_id)
    .bind(from.as_str())
    .bind(to.as_str())
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}

pub async fn update_subscription_transaction<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
    transaction_id: &str,
) -> Res<Option<Subscription>> {
    sqlx::query_as::<_, Subscription>(
        "UPDATE subscriptions SET transaction_id = $2, updated_at = NOW() WHERE user_id = $1 RETURNING *",
    )
    .bind(user_id)
    .bind(transaction_id)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}

pub async fn update_subscription_auto_renew<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
    auto_renew: bool,
) -> Res<Option<Subscription>> {
    sqlx::query_as::<_, Subscription>(
        "UPDATE subscriptions SET auto_renew = $2, updated_at = NOW() WHERE user_id = $1 RETURNING *",
    )
    .bind(user_id)
    .bind(auto_renew)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}
