// src/db.rs
use crate::models::{Chapter, User};
use sqlx::PgPool;
use uuid::Uuid;

pub async fn get_user_by_id(pool: &PgPool, user_id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT id, username, role, is_banned, created_at FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub async fn get_chapter_by_id(
    pool: &PgPool,
    chapter_id: Uuid,
) -> Result<Option<Chapter>, sqlx::Error> {
    sqlx::query_as::<_, Chapter>(
        "SELECT id, novel_id, title, body, word_count, price, is_locked, published_at, created_at
         FROM chapters WHERE id = $1",
    )
    .bind(chapter_id)
    .fetch_optional(pool)
    .await
}

/// Format of the novel a chapter belongs to, as stored.
pub async fn get_novel_format_for_chapter(
    pool: &PgPool,
    chapter_id: Uuid,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT n.format FROM novels n JOIN chapters c ON c.novel_id = n.id WHERE c.id = $1",
    )
    .bind(chapter_id)
    .fetch_optional(pool)
    .await
}

/// Total published word count of the novel a chapter belongs to. Drives the
/// premium-eligibility threshold when an author prices a chapter.
pub async fn get_novel_word_count_for_chapter(
    pool: &PgPool,
    chapter_id: Uuid,
) -> Result<i64, sqlx::Error> {
    let total: Option<i64> = sqlx::query_scalar(
        "SELECT SUM(word_count)::bigint FROM chapters
         WHERE novel_id = (SELECT novel_id FROM chapters WHERE id = $1)",
    )
    .bind(chapter_id)
    .fetch_optional(pool)
    .await?
    .flatten();
    Ok(total.unwrap_or(0))
}

pub async fn set_chapter_price(
    pool: &PgPool,
    chapter_id: Uuid,
    price: i64,
    is_locked: bool,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE chapters SET price = $2, is_locked = $3 WHERE id = $1")
        .bind(chapter_id)
        .bind(price)
        .bind(is_locked)
        .execute(pool)
        .await?;
    Ok(())
}

/// Fan-out: one notification per user with the chapter's novel in their
/// library. Single statement, so a large library does not mean N round trips.
pub async fn notify_library_of_chapter(
    pool: &PgPool,
    novel_id: Uuid,
    chapter_id: Uuid,
    body: &str,
) -> Result<u64, sqlx::Error> {
    let inserted = sqlx::query(
        "INSERT INTO notifications (user_id, chapter_id, body)
         SELECT user_id, $2, $3 FROM library WHERE novel_id = $1",
    )
    .bind(novel_id)
    .bind(chapter_id)
    .bind(body)
    .execute(pool)
    .await?
    .rows_affected();
    Ok(inserted)
}
