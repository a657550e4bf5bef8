// src/error.rs
use thiserror::Error;

/// Persistence-layer failures surfaced by the wallet ledger, purchase store
/// and the unlock unit of work.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: i64, available: i64 },

    /// Credits and debits move strictly positive amounts; the sign lives in
    /// the ledger entry, not in the caller's argument.
    #[error("ledger amount must be positive, got {0}")]
    InvalidAmount(i64),

    /// The `(user_id, chapter_id)` unique constraint fired. The surrounding
    /// transaction has been rolled back in full.
    #[error("chapter already purchased")]
    AlreadyPurchased,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Outcome taxonomy of the unlock orchestrator. The first four variants are
/// terminal, user-facing conditions; `Internal` is the only retryable one
/// (retries are safe, the purchase row is the idempotency guard).
#[derive(Debug, Error)]
pub enum UnlockError {
    #[error("Unauthorized")]
    Unauthenticated,

    #[error("Chapter not found")]
    ChapterNotFound,

    #[error("Chapter is not premium")]
    NotPremium,

    #[error("Not enough tickets: need {required}, have {available}")]
    InsufficientFunds { required: i64, available: i64 },

    #[error("Internal server error")]
    Internal(#[source] StoreError),
}

impl UnlockError {
    /// Whether the caller may safely resubmit the request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}
