// src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Reader,
    Translator,
    Moderator,
    Admin,
}

impl UserRole {
    /// Roles allowed to touch the studio pricing surface.
    pub fn can_manage_pricing(self) -> bool {
        matches!(self, Self::Translator | Self::Moderator | Self::Admin)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub role: UserRole,
    pub is_banned: bool,
    pub created_at: DateTime<Utc>,
}

/// Ledger entry kind, stored as TEXT. Append-only log; positive amounts are
/// credits, negative amounts are debits.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Deposit,
    Unlock,
    Mock,
}

#[derive(Serialize, Deserialize, Clone, Debug, FromRow)]
pub struct WalletTransaction {
    pub id: i64,
    pub user_id: Uuid,
    pub amount: i64,
    pub tx_type: TransactionType,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, FromRow)]
pub struct Chapter {
    pub id: Uuid,
    pub novel_id: Uuid,
    pub title: String,
    pub body: String,
    pub word_count: i64,
    pub price: i64,
    pub is_locked: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Chapter {
    /// A chapter is free unless it is both locked and carries a price.
    /// A price of 0 must never be charged for, whatever `is_locked` says.
    pub fn is_premium(&self) -> bool {
        self.is_locked && self.price > 0
    }
}

/// One row of `GET /wallet/history`: the purchase joined with its chapter
/// and novel, newest first.
#[derive(Serialize, Deserialize, Clone, Debug, FromRow)]
pub struct PurchaseHistoryEntry {
    pub chapter_id: Uuid,
    pub chapter_title: String,
    pub novel_title: String,
    pub novel_slug: String,
    pub price: i64,
    pub purchased_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Claims {
    pub sub: String, // user_id
    pub exp: usize,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SetPriceRequest {
    #[serde(default)]
    pub discount_percent: i64,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SuggestPriceQuery {
    pub word_count: u64,
    #[serde(default)]
    pub format: Option<String>,
}
