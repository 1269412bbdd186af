use dotenvy::dotenv;
use std::env;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    /// Seconds a badge token stays valid. 0 means badges never expire.
    pub badge_token_ttl: usize,
    /// When true, each badge token is accepted exactly once.
    pub badge_single_use: bool,

    /// Upper bound on any single storage call made by the clock engine.
    pub storage_timeout_ms: u64,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_clock_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,
}

fn env_or<T: std::str::FromStr>(key: &str, default: &str) -> T
where
    T::Err: std::fmt::Debug,
{
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .unwrap_or_else(|e| panic!("{} must be a valid value: {:?}", key, e))
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        Self {
            server_addr: env::var("SERVER_ADDR").expect("SERVER_ADDR must be set"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            access_token_ttl: env_or("ACCESS_TOKEN_TTL", "900"), // 15 min
            refresh_token_ttl: env_or("REFRESH_TOKEN_TTL", "604800"), // 7 days

            badge_token_ttl: env_or("BADGE_TOKEN_TTL", "0"),
            badge_single_use: env_or("BADGE_SINGLE_USE", "false"),

            storage_timeout_ms: env_or("STORAGE_TIMEOUT_MS", "5000"),

            rate_login_per_min: env_or("RATE_LOGIN_PER_MIN", "60"),
            rate_refresh_per_min: env_or("RATE_REFRESH_PER_MIN", "30"),
            rate_clock_per_min: env_or("RATE_CLOCK_PER_MIN", "120"),
            rate_protected_per_min: env_or("RATE_PROTECTED_PER_MIN", "1000"),

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api/v1".to_string()),
        }
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            server_addr: "127.0.0.1:0".into(),
            database_url: String::new(),
            jwt_secret: "test-secret".into(),
            access_token_ttl: 900,
            refresh_token_ttl: 604800,
            badge_token_ttl: 0,
            badge_single_use: false,
            storage_timeout_ms: 5000,
            rate_login_per_min: 60,
            rate_refresh_per_min: 30,
            rate_clock_per_min: 120,
            rate_protected_per_min: 1000,
            api_prefix: "/api/v1".into(),
        }
    }
}
