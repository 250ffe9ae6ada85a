use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Settings of the external identity provider whose ID tokens we accept.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    pub issuer: String,
    pub audience: String, // OAuth client id
    pub secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub identity: IdentityConfig,
    pub storage: StorageConfig,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn env_minutes(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET")?,
            issuer: env_or("JWT_ISSUER", "coursehub"),
            audience: env_or("JWT_AUDIENCE", "coursehub-users"),
            ttl_minutes: env_minutes("JWT_TTL_MINUTES", 60),
            refresh_ttl_minutes: env_minutes("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14),
        };
        let identity = IdentityConfig {
            issuer: env_or("IDENTITY_ISSUER", "https://accounts.google.com"),
            audience: std::env::var("IDENTITY_AUDIENCE").context("IDENTITY_AUDIENCE")?,
            secret: std::env::var("IDENTITY_SECRET").context("IDENTITY_SECRET")?,
        };
        let storage = StorageConfig {
            endpoint: std::env::var("S3_ENDPOINT").context("S3_ENDPOINT")?,
            bucket: std::env::var("S3_BUCKET").context("S3_BUCKET")?,
            access_key: std::env::var("S3_ACCESS_KEY").context("S3_ACCESS_KEY")?,
            secret_key: std::env::var("S3_SECRET_KEY").context("S3_SECRET_KEY")?,
            region: env_or("S3_REGION", "us-east-1"),
        };
        Ok(Self {
            database_url,
            jwt,
            identity,
            storage,
        })
    }
}
