use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::models::usage::UsageCounter;

pub async fn get_usage_count<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
    feature: &str,
    period: &str,
) -> Res<i64> {
    let current: Option<i64> = sqlx::query_scalar(
        "SELECT current FROM usage_counters WHERE user_id = $1 AND feature = $2 AND period = $3",
    )
    .bind(user_id)
    .bind(feature)
    .bind(period)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)?;

    Ok(current.unwrap_or(0))
}

pub async fn get_usage_for_period<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
    period: &str,
) -> Res<Vec<UsageCounter>> {
    sqlx::query_as::<_, UsageCounter>(
        "SELECT * FROM usage_counters WHERE user_id = $1 AND period = $2 ORDER BY feature",
    )
    .bind(user_id)
    .bind(period)
    .fetch_all(executor)
    .await
    .map_err(AppError::from)
}

pub async fn increment_usage<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
    feature: &str,
    period: &str,
) -> Res<i64> {
    sqlx::query_scalar(
        r#"
        INSERT INTO usage_counters (user_id, feature, period, current)
        VALUES ($1, $2, $3, 1)
        ON CONFLICT (user_id, feature, period)
        DO UPDATE SET current = usage_counters.current + 1, updated_at = NOW()
        RETURNING current
        "#,
    )
    .bind(user_id)
    .bind(feature)
    .bind(period)
    .fetch_one(executor)
    .await
    .map_err(AppError::from)
}

/// Conditional upsert: the `WHERE` on the conflict branch makes the check and
/// the increment one statement, so no row comes back once `limit` is reached.
/// The insert branch is skipped entirely for a zero limit.
pub async fn increment_usage_below_limit<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
    feature: &str,
    period: &str,
    limit: i64,
) -> Res<Option<i64>> {
    sqlx::query_scalar(
        r#"
        INSERT INTO usage_counters (user_id, feature, period, current)
        SELECT $1, $2, $3, 1 WHERE $4 > 0
        ON CONFLICT (user_id, feature, period)
        DO UPDATE SET current = usage_counters.current + 1, updated_at = NOW()
        WHERE usage_counters.current < $4
        RETURNING current
        "#,
    )
    .bind(user_id)
    .bind(feature)
    .bind(period)
    .bind(limit)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}
