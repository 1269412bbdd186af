//! Badge capability tokens. The dashboard issues a signed payload that the
//! client renders as a QR code; the clock endpoint resolves it back to a
//! user. Possession of the badge is what authorizes the clock action, so
//! two hardenings are available through config: an expiry (`BADGE_TOKEN_TTL`,
//! 0 keeps badges valid forever) and single-use enforcement
//! (`BADGE_SINGLE_USE`), which remembers seen `jti` values in a cache.

use derive_more::Display;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use moka::future::Cache;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::auth::jwt::{TokenType, now};
use crate::config::Config;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct BadgeClaims {
    pub user_id: u64,
    pub jti: String,
    pub iat: usize,
    pub token_type: TokenType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<usize>,
}

#[derive(Debug, Display, PartialEq, Eq)]
pub enum BadgeError {
    #[display(fmt = "badge token invalid or expired")]
    Invalid,
    #[display(fmt = "badge token already used")]
    Replayed,
}

impl std::error::Error for BadgeError {}

/// jti values already accepted while single-use mode is on. Entries only
/// matter until the matching badge expires; 24h covers the no-expiry case
/// for a full working day.
static SEEN_BADGES: Lazy<Cache<String, ()>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(100_000)
        .time_to_live(Duration::from_secs(86_400))
        .build()
});

pub fn issue(user_id: u64, config: &Config) -> String {
    let issued_at = now();
    let claims = BadgeClaims {
        user_id,
        jti: Uuid::new_v4().to_string(),
        iat: issued_at,
        token_type: TokenType::Badge,
        exp: (config.badge_token_ttl > 0).then(|| issued_at + config.badge_token_ttl),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .expect("HS256 signing cannot fail with a valid secret")
}

/// Signature and expiry check only; replay enforcement is a separate step
/// so the caller can order it after authorization.
pub fn verify(token: &str, secret: &str) -> Result<BadgeClaims, BadgeError> {
    let mut validation = Validation::default();
    // exp is optional on badges; enforced when present
    validation.required_spec_claims.clear();

    let claims = decode::<BadgeClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|_| BadgeError::Invalid)?;

    if claims.token_type != TokenType::Badge {
        return Err(BadgeError::Invalid);
    }

    Ok(claims)
}

/// Marks a badge as spent. Returns `Replayed` if this `jti` was already
/// accepted. The cache entry API makes check-and-insert atomic.
pub async fn consume(claims: &BadgeClaims) -> Result<(), BadgeError> {
    let entry = SEEN_BADGES.entry(claims.jti.clone()).or_insert(()).await;
    if entry.is_fresh() {
        Ok(())
    } else {
        Err(BadgeError::Replayed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(ttl: usize) -> Config {
        Config {
            jwt_secret: "badge-test-secret".into(),
            badge_token_ttl: ttl,
            ..Config::for_tests()
        }
    }

    #[test]
    fn badge_round_trips_without_expiry() {
        let cfg = config(0);
        let token = issue(42, &cfg);

        let claims = verify(&token, &cfg.jwt_secret).unwrap();
        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.exp, None);
    }

    #[test]
    fn tampered_badge_is_rejected() {
        let cfg = config(0);
        let mut token = issue(42, &cfg);
        // flip a character in the payload segment
        let flipped = token.pop().map(|c| if c == 'A' { 'B' } else { 'A' }).unwrap();
        token.push(flipped);

        assert_eq!(verify(&token, &cfg.jwt_secret), Err(BadgeError::Invalid));
    }

    #[test]
    fn badge_signed_with_other_secret_is_rejected() {
        let cfg = config(0);
        let token = issue(42, &cfg);
        assert_eq!(verify(&token, "another-secret"), Err(BadgeError::Invalid));
    }

    #[test]
    fn session_token_is_not_a_badge() {
        let cfg = config(0);
        let access = crate::auth::jwt::generate_access_token(
            42,
            "a@example.com".into(),
            crate::model::role::Role::Employee,
            None,
            &cfg.jwt_secret,
            900,
        );
        assert_eq!(verify(&access, &cfg.jwt_secret), Err(BadgeError::Invalid));
    }

    #[test]
    fn ttl_sets_expiry_claim() {
        let cfg = config(300);
        let token = issue(42, &cfg);
        let claims = verify(&token, &cfg.jwt_secret).unwrap();
        assert!(claims.exp.is_some());
        assert!(claims.exp.unwrap() >= claims.iat + 300);
    }

    #[tokio::test]
    async fn single_use_badge_cannot_be_replayed() {
        let cfg = config(0);
        let token = issue(42, &cfg);
        let claims = verify(&token, &cfg.jwt_secret).unwrap();

        assert_eq!(consume(&claims).await, Ok(()));
        assert_eq!(consume(&claims).await, Err(BadgeError::Replayed));
    }
}
