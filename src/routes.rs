// src/routes.rs
use crate::auth;
use crate::config::Config;
use crate::db;
use crate::error::UnlockError;
use crate::models::{Chapter, SetPriceRequest, SuggestPriceQuery, TransactionType};
use crate::pricing;
use crate::purchases;
use crate::store::PgStore;
use crate::unlock::{self, UnlockOutcome};
use crate::wallet;
use actix_web::{HttpRequest, HttpResponse, delete, get, post, put, web};
use moka::future::Cache;
use serde_json::json;
use uuid::Uuid;

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(get_chapter);
    cfg.service(unlock_chapter);
    cfg.service(has_purchased);
    cfg.service(get_balance);
    cfg.service(get_history);
    cfg.service(get_transactions);
    cfg.service(suggest_price);
    cfg.service(set_chapter_price);
    cfg.service(clear_chapter_price);
}

/// Dev-only surface, registered only when `ENABLE_MOCK_TOPUP=true`.
pub fn init_dev_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(mock_topup);
}

fn chapter_cache_key(chapter_id: Uuid, user_id: Option<Uuid>) -> String {
    match user_id {
        Some(user_id) => format!("chapter_{}_user_{}", chapter_id, user_id),
        None => format!("chapter_{}_anon", chapter_id),
    }
}

#[get("/chapters/{chapter_id}")]
pub async fn get_chapter(
    pool: web::Data<sqlx::PgPool>,
    cache: web::Data<Cache<String, serde_json::Value>>,
    config: web::Data<Config>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, actix_web::Error> {
    let chapter_id = path.into_inner();
    // Free chapters are readable without signing in.
    let user_id = auth::get_user_id_from_request(&req, &config);

    let cache_key = chapter_cache_key(chapter_id, user_id);
    if let Some(cached_response) = cache.get(&cache_key).await {
        tracing::debug!("Cache hit for key: {}", cache_key);
        return Ok(HttpResponse::Ok().json(cached_response));
    }

    let chapter = match db::get_chapter_by_id(&pool, chapter_id).await {
        Ok(Some(c)) if c.published_at.is_some() => c,
        Ok(_) => return Ok(HttpResponse::NotFound().json(json!({"error": "Chapter not found"}))),
        Err(e) => {
            tracing::error!("Database error fetching chapter: {}", e);
            return Ok(
                HttpResponse::InternalServerError().json(json!({"error": "Internal server error"}))
            );
        }
    };

    let has_access = if !chapter.is_premium() {
        true
    } else {
        match user_id {
            Some(user_id) => match purchases::has_purchased(&pool, user_id, chapter_id).await {
                Ok(purchased) => purchased,
                Err(e) => {
                    tracing::error!("Database error checking purchase: {}", e);
                    return Ok(HttpResponse::InternalServerError()
                        .json(json!({"error": "Internal server error"})));
                }
            },
            None => false,
        }
    };

    let balance = if has_access {
        None
    } else {
        match user_id {
            Some(user_id) => match wallet::get_balance(&pool, user_id).await {
                Ok(balance) => Some(balance),
                Err(e) => {
                    tracing::warn!("Failed to read balance for locked chapter view: {}", e);
                    None
                }
            },
            None => None,
        }
    };

    let (response, cacheable) = chapter_view(&chapter, has_access, balance);
    if cacheable {
        cache.insert(cache_key, response.clone()).await;
    }
    Ok(HttpResponse::Ok().json(response))
}

/// Builds the chapter payload and says whether it may be cached. Locked views
/// carry the reader's current balance, which goes stale the moment they top
/// up, so only granted views enter the cache.
fn chapter_view(
    chapter: &Chapter,
    has_access: bool,
    balance: Option<i64>,
) -> (serde_json::Value, bool) {
    if has_access {
        (
            json!({
                "chapter": {
                    "id": chapter.id,
                    "novel_id": chapter.novel_id,
                    "title": chapter.title,
                    "body": chapter.body,
                },
                "access_granted": true,
            }),
            true,
        )
    } else {
        // Body withheld; tell the reader what an unlock would cost them.
        (
            json!({
                "chapter": {
                    "id": chapter.id,
                    "novel_id": chapter.novel_id,
                    "title": chapter.title,
                },
                "access_granted": false,
                "price": chapter.price,
                "balance": balance,
            }),
            false,
        )
    }
}

#[post("/chapters/{chapter_id}/unlock")]
pub async fn unlock_chapter(
    store: web::Data<PgStore>,
    cache: web::Data<Cache<String, serde_json::Value>>,
    config: web::Data<Config>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, actix_web::Error> {
    let chapter_id = path.into_inner();
    // The price is always the stored one; it is never read from the request.
    let user_id = auth::get_user_id_from_request(&req, &config);

    match unlock::unlock_chapter(store.get_ref(), user_id, chapter_id).await {
        Ok(UnlockOutcome::Unlocked { chapter_title }) => {
            // Best-effort revalidation of the cached chapter view; the
            // purchase row is already committed either way.
            cache
                .invalidate(&chapter_cache_key(chapter_id, user_id))
                .await;
            Ok(HttpResponse::Ok().json(json!({
                "success": format!("Unlocked \"{}\"", chapter_title),
            })))
        }
        Ok(UnlockOutcome::AlreadyUnlocked) => Ok(HttpResponse::Ok().json(json!({
            "success": "Chapter already unlocked",
        }))),
        Err(err) => {
            let mut status = match &err {
                UnlockError::Unauthenticated => HttpResponse::Unauthorized(),
                UnlockError::ChapterNotFound => HttpResponse::NotFound(),
                UnlockError::NotPremium => HttpResponse::UnprocessableEntity(),
                UnlockError::InsufficientFunds { .. } => HttpResponse::PaymentRequired(),
                UnlockError::Internal(_) => HttpResponse::InternalServerError(),
            };
            // Terminal outcomes must not be resubmitted; internal failures
            // may be, the purchase row keeps retries idempotent.
            Ok(status.json(json!({
                "error": err.to_string(),
                "retryable": err.is_retryable(),
            })))
        }
    }
}

#[get("/chapters/{chapter_id}/purchased")]
pub async fn has_purchased(
    pool: web::Data<sqlx::PgPool>,
    config: web::Data<Config>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, actix_web::Error> {
    let chapter_id = path.into_inner();
    let user_id = match auth::get_user_id_from_request(&req, &config) {
        Some(id) => id,
        None => return Ok(HttpResponse::Unauthorized().json(json!({"error": "Unauthorized"}))),
    };

    match purchases::has_purchased(&pool, user_id, chapter_id).await {
        Ok(purchased) => Ok(HttpResponse::Ok().json(json!({"purchased": purchased}))),
        Err(e) => {
            tracing::error!("Database error checking purchase: {}", e);
            Ok(HttpResponse::InternalServerError().json(json!({"error": "Internal server error"})))
        }
    }
}

#[get("/wallet/balance")]
pub async fn get_balance(
    pool: web::Data<sqlx::PgPool>,
    config: web::Data<Config>,
    req: HttpRequest,
) -> Result<HttpResponse, actix_web::Error> {
    let user_id = match auth::get_user_id_from_request(&req, &config) {
        Some(id) => id,
        None => return Ok(HttpResponse::Unauthorized().json(json!({"error": "Unauthorized"}))),
    };

    match wallet::get_balance(&pool, user_id).await {
        Ok(balance) => Ok(HttpResponse::Ok().json(json!({"balance": balance}))),
        Err(e) => {
            tracing::error!("Database error fetching balance: {}", e);
            Ok(HttpResponse::InternalServerError().json(json!({"error": "Internal server error"})))
        }
    }
}

#[get("/wallet/history")]
pub async fn get_history(
    pool: web::Data<sqlx::PgPool>,
    config: web::Data<Config>,
    req: HttpRequest,
) -> Result<HttpResponse, actix_web::Error> {
    let user_id = match auth::get_user_id_from_request(&req, &config) {
        Some(id) => id,
        None => return Ok(HttpResponse::Unauthorized().json(json!({"error": "Unauthorized"}))),
    };

    match purchases::purchase_history(&pool, user_id).await {
        Ok(entries) => Ok(HttpResponse::Ok().json(json!({"purchases": entries}))),
        Err(e) => {
            tracing::error!("Database error fetching purchase history: {}", e);
            Ok(HttpResponse::InternalServerError().json(json!({"error": "Internal server error"})))
        }
    }
}

/// Raw ledger entries, newest first. Deposits show up positive, unlocks
/// negative.
#[get("/wallet/transactions")]
pub async fn get_transactions(
    pool: web::Data<sqlx::PgPool>,
    config: web::Data<Config>,
    req: HttpRequest,
) -> Result<HttpResponse, actix_web::Error> {
    let user_id = match auth::get_user_id_from_request(&req, &config) {
        Some(id) => id,
        None => return Ok(HttpResponse::Unauthorized().json(json!({"error": "Unauthorized"}))),
    };

    match wallet::recent_transactions(&pool, user_id, 50).await {
        Ok(entries) => Ok(HttpResponse::Ok().json(json!({"transactions": entries}))),
        Err(e) => {
            tracing::error!("Database error fetching wallet transactions: {}", e);
            Ok(HttpResponse::InternalServerError().json(json!({"error": "Internal server error"})))
        }
    }
}

/// Dev convenience mirroring the original platform's mock top-up button.
#[post("/wallet/mock-topup")]
pub async fn mock_topup(
    pool: web::Data<sqlx::PgPool>,
    config: web::Data<Config>,
    req: HttpRequest,
) -> Result<HttpResponse, actix_web::Error> {
    let user_id = match auth::get_user_id_from_request(&req, &config) {
        Some(id) => id,
        None => return Ok(HttpResponse::Unauthorized().json(json!({"error": "Unauthorized"}))),
    };

    match wallet::credit(&pool, user_id, 1000, TransactionType::Mock, "Mock top-up").await {
        Ok(balance) => Ok(HttpResponse::Ok().json(json!({"balance": balance}))),
        Err(e) => {
            tracing::error!("Mock top-up failed: {}", e);
            Ok(HttpResponse::InternalServerError().json(json!({"error": "Internal server error"})))
        }
    }
}

#[get("/studio/pricing/suggest")]
pub async fn suggest_price(
    query: web::Query<SuggestPriceQuery>,
) -> Result<HttpResponse, actix_web::Error> {
    let format = pricing::NovelFormat::from_db(query.format.as_deref().unwrap_or("WN"));
    let range = pricing::suggested_price_range(query.word_count, format);
    Ok(HttpResponse::Ok().json(range))
}

/// Resolves the requesting user and enforces the studio role gate.
async fn studio_user(
    pool: &sqlx::PgPool,
    config: &Config,
    req: &HttpRequest,
) -> Result<Uuid, HttpResponse> {
    let user_id = match auth::get_user_id_from_request(req, config) {
        Some(id) => id,
        None => {
            return Err(HttpResponse::Unauthorized().json(json!({"error": "Unauthorized"})));
        }
    };

    match db::get_user_by_id(pool, user_id).await {
        Ok(Some(user)) if user.role.can_manage_pricing() && !user.is_banned => Ok(user_id),
        Ok(_) => Err(HttpResponse::Forbidden().json(json!({"error": "Forbidden"}))),
        Err(e) => {
            tracing::error!("Database error resolving studio user: {}", e);
            Err(HttpResponse::InternalServerError().json(json!({"error": "Internal server error"})))
        }
    }
}

#[put("/studio/chapters/{chapter_id}/price")]
pub async fn set_chapter_price(
    pool: web::Data<sqlx::PgPool>,
    config: web::Data<Config>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Json<SetPriceRequest>,
) -> Result<HttpResponse, actix_web::Error> {
    let chapter_id = path.into_inner();
    if let Err(resp) = studio_user(&pool, &config, &req).await {
        return Ok(resp);
    }

    let chapter = match db::get_chapter_by_id(&pool, chapter_id).await {
        Ok(Some(c)) => c,
        Ok(None) => return Ok(HttpResponse::NotFound().json(json!({"error": "Chapter not found"}))),
        Err(e) => {
            tracing::error!("Database error fetching chapter: {}", e);
            return Ok(
                HttpResponse::InternalServerError().json(json!({"error": "Internal server error"}))
            );
        }
    };

    if !pricing::can_chapter_be_premium(chapter.word_count.max(0) as u64) {
        return Ok(HttpResponse::UnprocessableEntity()
            .json(json!({"error": "Chapter is too short to be premium"})));
    }

    let novel_words = match db::get_novel_word_count_for_chapter(&pool, chapter_id).await {
        Ok(total) => total,
        Err(e) => {
            tracing::error!("Database error computing novel word count: {}", e);
            return Ok(
                HttpResponse::InternalServerError().json(json!({"error": "Internal server error"}))
            );
        }
    };
    if !pricing::can_have_premium_chapters(novel_words.max(0) as u64) {
        return Ok(HttpResponse::UnprocessableEntity()
            .json(json!({"error": "Novel is too short for premium chapters"})));
    }

    let format = match db::get_novel_format_for_chapter(&pool, chapter_id).await {
        Ok(stored) => pricing::NovelFormat::from_db(stored.as_deref().unwrap_or("WN")),
        Err(e) => {
            tracing::error!("Database error fetching novel format: {}", e);
            return Ok(
                HttpResponse::InternalServerError().json(json!({"error": "Internal server error"}))
            );
        }
    };

    let price = pricing::calculate_chapter_price(
        chapter.word_count.max(0) as u64,
        format,
        body.discount_percent,
    );

    match db::set_chapter_price(&pool, chapter_id, price, true).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({"price": price}))),
        Err(e) => {
            tracing::error!("Database error storing chapter price: {}", e);
            Ok(HttpResponse::InternalServerError().json(json!({"error": "Internal server error"})))
        }
    }
}

/// Makes a chapter free again. A zero price is only ever representable as
/// `is_locked = false`.
#[delete("/studio/chapters/{chapter_id}/price")]
pub async fn clear_chapter_price(
    pool: web::Data<sqlx::PgPool>,
    config: web::Data<Config>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, actix_web::Error> {
    let chapter_id = path.into_inner();
    if let Err(resp) = studio_user(&pool, &config, &req).await {
        return Ok(resp);
    }

    match db::set_chapter_price(&pool, chapter_id, 0, false).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({"price": 0}))),
        Err(e) => {
            tracing::error!("Database error clearing chapter price: {}", e);
            Ok(HttpResponse::InternalServerError().json(json!({"error": "Internal server error"})))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn chapter(price: i64) -> Chapter {
        Chapter {
            id: Uuid::new_v4(),
            novel_id: Uuid::new_v4(),
            title: "Chương 3".to_string(),
            body: "Nội dung chương".to_string(),
            word_count: 1200,
            price,
            is_locked: true,
            published_at: Some(Utc::now()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn granted_views_carry_the_body_and_are_cacheable() {
        let chapter = chapter(150);
        let (payload, cacheable) = chapter_view(&chapter, true, None);
        assert!(cacheable);
        assert_eq!(payload["access_granted"], true);
        assert_eq!(payload["chapter"]["body"], "Nội dung chương");
    }

    #[test]
    fn locked_views_report_price_and_balance_but_never_enter_the_cache() {
        let chapter = chapter(150);
        let (payload, cacheable) = chapter_view(&chapter, false, Some(850));
        assert!(!cacheable);
        assert_eq!(payload["access_granted"], false);
        assert!(payload["chapter"].get("body").is_none());
        assert_eq!(payload["price"], 150);
        assert_eq!(payload["balance"], 850);
    }
}
