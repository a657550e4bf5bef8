// src/wallet.rs
//
// Wallet ledger. Balances are mutated only through `credit` and `debit`, and
// every mutation appends exactly one wallet_transactions row in the same
// database transaction, so a balance can always be reconstructed from the log.

use crate::error::StoreError;
use crate::models::{TransactionType, WalletTransaction};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Returns 0 when the user has no wallet row yet; wallets are created lazily
/// by the first credit.
pub async fn get_balance(pool: &PgPool, user_id: Uuid) -> Result<i64, StoreError> {
    let balance: Option<i64> = sqlx::query_scalar("SELECT balance FROM wallets WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(balance.unwrap_or(0))
}

/// Locks the wallet row for the rest of the enclosing transaction. Missing
/// row reads as 0 (nothing to lock, nothing to debit).
pub async fn balance_for_update(conn: &mut PgConnection, user_id: Uuid) -> Result<i64, StoreError> {
    let balance: Option<i64> =
        sqlx::query_scalar("SELECT balance FROM wallets WHERE user_id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(conn)
            .await?;
    Ok(balance.unwrap_or(0))
}

/// Credits `amount` tickets, creating the wallet if absent. Upsert and log
/// append commit together. Returns the new balance.
pub async fn credit(
    pool: &PgPool,
    user_id: Uuid,
    amount: i64,
    tx_type: TransactionType,
    description: &str,
) -> Result<i64, StoreError> {
    ensure_positive(amount)?;
    let mut tx = pool.begin().await?;

    let balance: i64 = sqlx::query_scalar(
        "INSERT INTO wallets (user_id, balance) VALUES ($1, $2)
         ON CONFLICT (user_id) DO UPDATE SET balance = wallets.balance + EXCLUDED.balance
         RETURNING balance",
    )
    .bind(user_id)
    .bind(amount)
    .fetch_one(&mut *tx)
    .await?;

    append_entry(&mut tx, user_id, amount, tx_type, description).await?;
    tx.commit().await?;

    tracing::info!(%user_id, amount, balance, "wallet credited");
    Ok(balance)
}

/// Debits `amount` tickets inside a caller-owned transaction. The guarded
/// UPDATE is a compare-and-swap: zero rows affected means the balance was
/// short (or the wallet absent) and nothing was mutated.
pub async fn debit(
    conn: &mut PgConnection,
    user_id: Uuid,
    amount: i64,
    tx_type: TransactionType,
    description: &str,
) -> Result<(), StoreError> {
    ensure_positive(amount)?;
    let updated = sqlx::query(
        "UPDATE wallets SET balance = balance - $2 WHERE user_id = $1 AND balance >= $2",
    )
    .bind(user_id)
    .bind(amount)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    if updated == 0 {
        let available = sqlx::query_scalar("SELECT balance FROM wallets WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&mut *conn)
            .await?
            .unwrap_or(0);
        return Err(StoreError::InsufficientFunds {
            required: amount,
            available,
        });
    }

    append_entry(conn, user_id, -amount, tx_type, description).await
}

/// Most recent ledger entries, newest first.
pub async fn recent_transactions(
    pool: &PgPool,
    user_id: Uuid,
    limit: i64,
) -> Result<Vec<WalletTransaction>, StoreError> {
    let entries = sqlx::query_as::<_, WalletTransaction>(
        "SELECT id, user_id, amount, tx_type, description, created_at
         FROM wallet_transactions
         WHERE user_id = $1
         ORDER BY created_at DESC, id DESC
         LIMIT $2",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(entries)
}

/// A zero or negative amount would let `credit` drain a wallet (or `debit`
/// refill one) through the sign baked into the ledger write; reject it before
/// any statement runs.
fn ensure_positive(amount: i64) -> Result<(), StoreError> {
    if amount <= 0 {
        return Err(StoreError::InvalidAmount(amount));
    }
    Ok(())
}

async fn append_entry(
    conn: &mut PgConnection,
    user_id: Uuid,
    amount: i64,
    tx_type: TransactionType,
    description: &str,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO wallet_transactions (user_id, amount, tx_type, description)
         VALUES ($1, $2, $3, $4)",
    )
    .bind(user_id)
    .bind(amount)
    .bind(tx_type)
    .bind(description)
    .execute(conn)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_guard_rejects_zero_and_negative() {
        assert!(matches!(ensure_positive(0), Err(StoreError::InvalidAmount(0))));
        assert!(matches!(
            ensure_positive(-150),
            Err(StoreError::InvalidAmount(-150))
        ));
        assert!(ensure_positive(1).is_ok());
    }

    #[tokio::test]
    async fn credit_rejects_non_positive_amounts_before_any_io() {
        // Lazy pool: no server behind it, so reaching the database would fail
        // loudly instead of silently passing.
        let pool = PgPool::connect_lazy("postgres://unused@localhost/unused").unwrap();
        let user = Uuid::new_v4();
        for amount in [0, -5] {
            let err = credit(&pool, user, amount, TransactionType::Deposit, "top-up")
                .await
                .unwrap_err();
            assert!(matches!(err, StoreError::InvalidAmount(got) if got == amount));
        }
    }
}
