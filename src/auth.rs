// src/auth.rs
//
// Token validation only. Sign-in and credential storage live in the external
// auth provider; it issues the JWTs we verify here with the shared secret.

use crate::config::Config;
use crate::models::Claims;
use actix_web::HttpRequest;
use jsonwebtoken::{DecodingKey, Validation, decode};
use uuid::Uuid;

/// Resolves the requesting user from the `Authorization: Bearer` header.
/// Missing, malformed or expired tokens all read as "not authenticated".
pub fn get_user_id_from_request(req: &HttpRequest, config: &Config) -> Option<Uuid> {
    let header = req.headers().get("Authorization")?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?;

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_ref()),
        &Validation::default(),
    )
    .ok()?
    .claims;

    Uuid::parse_str(&claims.sub).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn test_config() -> Config {
        Config {
            database_url: String::new(),
            jwt_secret: "sổ-tay-bí-mật".to_string(),
            bind_addr: Config::default_bind_addr(),
            publish_sweep_secs: 60,
            enable_mock_topup: false,
        }
    }

    fn token_for(user_id: Uuid, secret: &str, expires_in: Duration) -> String {
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (Utc::now() + expires_in).timestamp() as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_ref()),
        )
        .unwrap()
    }

    #[test]
    fn valid_bearer_token_resolves_the_user() {
        let config = test_config();
        let user_id = Uuid::new_v4();
        let token = token_for(user_id, &config.jwt_secret, Duration::hours(1));
        let req = TestRequest::default()
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_http_request();
        assert_eq!(get_user_id_from_request(&req, &config), Some(user_id));
    }

    #[test]
    fn missing_or_malformed_headers_read_as_unauthenticated() {
        let config = test_config();
        let bare = TestRequest::default().to_http_request();
        assert_eq!(get_user_id_from_request(&bare, &config), None);

        let token = token_for(Uuid::new_v4(), &config.jwt_secret, Duration::hours(1));
        let no_scheme = TestRequest::default()
            .insert_header(("Authorization", token))
            .to_http_request();
        assert_eq!(get_user_id_from_request(&no_scheme, &config), None);
    }

    #[test]
    fn wrong_secret_or_expired_tokens_are_rejected() {
        let config = test_config();
        let forged = token_for(Uuid::new_v4(), "some-other-secret", Duration::hours(1));
        let req = TestRequest::default()
            .insert_header(("Authorization", format!("Bearer {forged}")))
            .to_http_request();
        assert_eq!(get_user_id_from_request(&req, &config), None);

        let expired = token_for(Uuid::new_v4(), &config.jwt_secret, Duration::hours(-2));
        let req = TestRequest::default()
            .insert_header(("Authorization", format!("Bearer {expired}")))
            .to_http_request();
        assert_eq!(get_user_id_from_request(&req, &config), None);
    }
}
