// src/purchases.rs
//
// Purchase facts. One row per (user, chapter), written exactly once and never
// updated or deleted; the unique constraint is what makes concurrent unlock
// requests collapse to a single purchase.

use crate::error::StoreError;
use crate::models::PurchaseHistoryEntry;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

pub async fn has_purchased(
    pool: &PgPool,
    user_id: Uuid,
    chapter_id: Uuid,
) -> Result<bool, StoreError> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM user_purchases WHERE user_id = $1 AND chapter_id = $2)",
    )
    .bind(user_id)
    .bind(chapter_id)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

/// Inserts the purchase fact inside a caller-owned transaction. A unique
/// violation on (user_id, chapter_id) maps to `StoreError::AlreadyPurchased`
/// so the caller can roll the whole unit of work back and report the race.
pub async fn record_purchase(
    conn: &mut PgConnection,
    user_id: Uuid,
    chapter_id: Uuid,
    price: i64,
) -> Result<(), StoreError> {
    let result = sqlx::query(
        "INSERT INTO user_purchases (user_id, chapter_id, price) VALUES ($1, $2, $3)",
    )
    .bind(user_id)
    .bind(chapter_id)
    .bind(price)
    .execute(conn)
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(err) => {
            if err
                .as_database_error()
                .is_some_and(|db| db.is_unique_violation())
            {
                Err(StoreError::AlreadyPurchased)
            } else {
                Err(StoreError::Database(err))
            }
        }
    }
}

/// Unlock history for the wallet page, newest first, capped at 50 entries.
pub async fn purchase_history(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<PurchaseHistoryEntry>, StoreError> {
    let entries = sqlx::query_as::<_, PurchaseHistoryEntry>(
        "SELECT p.chapter_id, c.title AS chapter_title, n.title AS novel_title,
                n.slug AS novel_slug, p.price, p.created_at AS purchased_at
         FROM user_purchases p
         JOIN chapters c ON c.id = p.chapter_id
         JOIN novels n ON n.id = c.novel_id
         WHERE p.user_id = $1
         ORDER BY p.created_at DESC, p.id DESC
         LIMIT 50",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(entries)
}
