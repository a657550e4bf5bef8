// src/store.rs
use crate::db;
use crate::error::StoreError;
use crate::models::{Chapter, TransactionType};
use crate::purchases;
use crate::wallet;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

/// Persistence port for the unlock orchestrator. Production uses [`PgStore`];
/// tests inject an in-memory double.
#[async_trait]
pub trait PaywallStore: Send + Sync {
    async fn chapter(&self, chapter_id: Uuid) -> Result<Option<Chapter>, StoreError>;

    async fn has_purchased(&self, user_id: Uuid, chapter_id: Uuid) -> Result<bool, StoreError>;

    async fn balance(&self, user_id: Uuid) -> Result<i64, StoreError>;

    /// The atomic unit of work: debit the wallet by `price` and record the
    /// purchase fact, committing together or not at all. Must return
    /// [`StoreError::AlreadyPurchased`] (with every effect rolled back) when
    /// the purchase row already exists, and must never let the balance go
    /// negative.
    async fn unlock(
        &self,
        user_id: Uuid,
        chapter_id: Uuid,
        price: i64,
        chapter_title: &str,
    ) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaywallStore for PgStore {
    async fn chapter(&self, chapter_id: Uuid) -> Result<Option<Chapter>, StoreError> {
        Ok(db::get_chapter_by_id(&self.pool, chapter_id).await?)
    }

    async fn has_purchased(&self, user_id: Uuid, chapter_id: Uuid) -> Result<bool, StoreError> {
        purchases::has_purchased(&self.pool, user_id, chapter_id).await
    }

    async fn balance(&self, user_id: Uuid) -> Result<i64, StoreError> {
        wallet::get_balance(&self.pool, user_id).await
    }

    async fn unlock(
        &self,
        user_id: Uuid,
        chapter_id: Uuid,
        price: i64,
        chapter_title: &str,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        // Row lock serialises concurrent debits against the same wallet; the
        // guarded UPDATE inside `debit` is the backstop.
        let available = wallet::balance_for_update(&mut tx, user_id).await?;
        if available < price {
            return Err(StoreError::InsufficientFunds {
                required: price,
                available,
            });
        }

        wallet::debit(&mut tx, user_id, price, TransactionType::Unlock, chapter_title).await?;
        purchases::record_purchase(&mut tx, user_id, chapter_id, price).await?;

        tx.commit().await?;
        Ok(())
    }
}
