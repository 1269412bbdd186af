use std::time::{SystemTime, UNIX_EPOCH};

use crate::model::role::Role;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    /// Login email.
    pub sub: String,
    pub role: Role,
    pub exp: usize,
    pub jti: String,
    pub token_type: TokenType,
    pub employee_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
    /// Badge capability token, issued for QR rendering. Verified by the
    /// badge module, never accepted as a login session.
    Badge,
}

pub fn now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as usize)
        .unwrap_or(0)
}

fn sign(claims: &Claims, secret: &str) -> String {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("HS256 signing cannot fail with a valid secret")
}

pub fn generate_access_token(
    user_id: u64,
    email: String,
    role: Role,
    employee_id: Option<String>,
    secret: &str,
    ttl: usize,
) -> String {
    let claims = Claims {
        user_id,
        sub: email,
        role,
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
        token_type: TokenType::Access,
        employee_id,
    };

    sign(&claims, secret)
}

pub fn generate_refresh_token(
    user_id: u64,
    email: String,
    role: Role,
    employee_id: Option<String>,
    secret: &str,
    ttl: usize,
) -> (String, Claims) {
    let claims = Claims {
        user_id,
        sub: email,
        role,
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
        token_type: TokenType::Refresh,
        employee_id,
    };

    let token = sign(&claims, secret);

    (token, claims)
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_token_round_trips() {
        let token = generate_access_token(
            7,
            "jane@example.com".into(),
            Role::Staff,
            Some("EMP-7".into()),
            "secret",
            900,
        );

        let claims = verify_token(&token, "secret").unwrap();
        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.role, Role::Staff);
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(claims.employee_id.as_deref(), Some("EMP-7"));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token =
            generate_access_token(7, "jane@example.com".into(), Role::Admin, None, "secret", 900);
        assert!(verify_token(&token, "other").is_err());
    }
}
