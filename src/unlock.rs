// src/unlock.rs
//
// The unlock orchestrator. Preconditions are checked in a fixed order with no
// side effects; the only mutation is the store's atomic debit-plus-record
// unit of work. A concurrent duplicate request loses the race inside the
// store, rolls back, and is reported as `AlreadyUnlocked` rather than as an
// error.

use crate::error::{StoreError, UnlockError};
use crate::store::PaywallStore;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnlockOutcome {
    Unlocked { chapter_title: String },
    /// The user already owns this chapter. A no-op, not a failure.
    AlreadyUnlocked,
}

pub async fn unlock_chapter<S: PaywallStore>(
    store: &S,
    user_id: Option<Uuid>,
    chapter_id: Uuid,
) -> Result<UnlockOutcome, UnlockError> {
    let user_id = user_id.ok_or(UnlockError::Unauthenticated)?;

    if store.has_purchased(user_id, chapter_id).await.map_err(UnlockError::Internal)? {
        return Ok(UnlockOutcome::AlreadyUnlocked);
    }

    let chapter = store
        .chapter(chapter_id)
        .await
        .map_err(UnlockError::Internal)?
        .ok_or(UnlockError::ChapterNotFound)?;

    // Scheduled drafts are invisible to readers until the publication sweep
    // flips them; selling one would charge for a chapter the read path 404s.
    if chapter.published_at.is_none() {
        return Err(UnlockError::ChapterNotFound);
    }

    if !chapter.is_premium() {
        return Err(UnlockError::NotPremium);
    }

    let available = store.balance(user_id).await.map_err(UnlockError::Internal)?;
    if available < chapter.price {
        return Err(UnlockError::InsufficientFunds {
            required: chapter.price,
            available,
        });
    }

    match store
        .unlock(user_id, chapter_id, chapter.price, &chapter.title)
        .await
    {
        Ok(()) => {
            tracing::info!(%user_id, %chapter_id, price = chapter.price, "chapter unlocked");
            Ok(UnlockOutcome::Unlocked {
                chapter_title: chapter.title,
            })
        }
        // Two requests passed the purchase check before either wrote; the
        // unique constraint decided the winner and the loser rolled back.
        Err(StoreError::AlreadyPurchased) => Ok(UnlockOutcome::AlreadyUnlocked),
        // The wallet was drained between the precondition read and the
        // row-locked debit.
        Err(StoreError::InsufficientFunds {
            required,
            available,
        }) => Err(UnlockError::InsufficientFunds {
            required,
            available,
        }),
        Err(err) => {
            tracing::error!(%user_id, %chapter_id, error = %err, "unlock transaction failed");
            Err(UnlockError::Internal(err))
        }
    }
}
