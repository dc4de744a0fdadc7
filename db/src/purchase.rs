use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    dtos::purchase::PurchaseCreateRequest,
    models::purchase::{Purchase, PurchaseStatus},
};

pub async fn insert_purchase<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    data: PurchaseCreateRequest,
) -> Res<Purchase> {
    sqlx::query_as::<_, Purchase>(
        r#"
        INSERT INTO purchases (user_id, resource_id, amount_minor_units, currency, status)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(data.user_id)
    .bind(data.resource_id)
    .bind(data.amount_minor_units)
    .bind(data.currency)
    .bind(PurchaseStatus::Pending.as_str())
    .fetch_one(executor)
    .await
    .map_err(AppError::from)
}

pub async fn get_purchase_by_id<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    receipt_id: Uuid,
) -> Res<Option<Purchase>> {
    sqlx::query_as::<_, Purchase>("SELECT * FROM purchases WHERE id = $1")
        .bind(receipt_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}

pub async fn get_purchase_by_transaction_id<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    transaction_id: &str,
) -> Res<Option<Purchase>> {
    sqlx::query_as::<_, Purchase>("SELECT * FROM purchases WHERE transaction_id = $1")
        .bind(transaction_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}

pub async fn update_purchase_transaction<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    receipt_id: Uuid,
    transaction_id: &str,
) -> Res<Option<Purchase>> {
    sqlx::query_as::<_, Purchase>(
        "UPDATE purchases SET transaction_id = $2 WHERE id = $1 RETURNING *",
    )
    .bind(receipt_id)
    .bind(transaction_id)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}

pub async fn update_purchase_status<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    receipt_id: Uuid,
    from: PurchaseStatus,
    to: PurchaseStatus,
) -> Res<Option<Purchase>> {
    sqlx::query_as::<_, Purchase>(
        r#"
        UPDATE purchases
        SET status = $3,
            redeemed_at = CASE WHEN $3 = 'redeemed' THEN NOW() ELSE redeemed_at END
        WHERE id = $1 AND status = $2
        RETURNING *
        "#,
    )
    .bind(receipt_id)
    .bind(from.as_str())
    .bind(to.as_str())
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}
