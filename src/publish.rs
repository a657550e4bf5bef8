// src/publish.rs
//
// Scheduled publication sweep: a polling loop that flips draft chapters to
// published once their scheduled time has passed, then notifies everyone with
// the novel in their library. Peripheral to the ticket economy — publishing a
// chapter merely makes it unlockable.

use crate::db;
use sqlx::{FromRow, PgPool};
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
struct PublishedChapter {
    id: Uuid,
    novel_id: Uuid,
    title: String,
}

pub async fn run_sweep_loop(pool: PgPool, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        match sweep_once(&pool).await {
            Ok(0) => {}
            Ok(published) => tracing::info!(published, "publication sweep flipped chapters"),
            Err(e) => tracing::error!("publication sweep failed: {}", e),
        }
    }
}

/// Flips every due chapter in one statement and fans out notifications per
/// chapter. Notification failure is logged and swallowed; the publish itself
/// has already committed.
pub async fn sweep_once(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let published = sqlx::query_as::<_, PublishedChapter>(
        "UPDATE chapters SET published_at = NOW()
         WHERE published_at IS NULL AND scheduled_at IS NOT NULL AND scheduled_at <= NOW()
         RETURNING id, novel_id, title",
    )
    .fetch_all(pool)
    .await?;

    for chapter in &published {
        let body = format!("Chương mới: {}", chapter.title);
        match db::notify_library_of_chapter(pool, chapter.novel_id, chapter.id, &body).await {
            Ok(notified) => {
                tracing::info!(chapter_id = %chapter.id, notified, "chapter published")
            }
            Err(e) => tracing::warn!(
                chapter_id = %chapter.id,
                "failed to fan out publish notifications: {}", e
            ),
        }
    }

    Ok(published.len() as u64)
}
