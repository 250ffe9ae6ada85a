use anyhow::Context;
use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::config::IdentityConfig;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Who the external provider says the caller is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub subject: String,
    pub display_name: String,
    pub email: String,
}

/// Verifies credentials issued by the external identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify(&self, credential: &str) -> anyhow::Result<VerifiedIdentity>;
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    email: Option<String>,
    name: Option<String>,
}

/// Checks an HS256-signed ID token against the configured issuer and audience.
pub struct JwtIdentityProvider {
    decoding: DecodingKey,
    issuer: String,
    audience: String,
}

impl JwtIdentityProvider {
    pub fn new(cfg: &IdentityConfig) -> Self {
        Self {
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
        }
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn verify(&self, credential: &str) -> anyhow::Result<VerifiedIdentity> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<IdTokenClaims>(credential, &self.decoding, &validation)
            .context("decode id token")?;
        let claims = data.claims;

        let email = claims
            .email
            .map(|e| e.trim().to_lowercase())
            .filter(|e| is_valid_email(e))
            .context("id token carries no valid email")?;
        let display_name = claims
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());

        debug!(subject = %claims.sub, "id token verified");
        Ok(VerifiedIdentity {
            subject: claims.sub,
            display_name,
            email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;
    use time::OffsetDateTime;

    fn provider() -> JwtIdentityProvider {
        JwtIdentityProvider::new(&IdentityConfig {
            issuer: "https://id.example".into(),
            audience: "client-123".into(),
            secret: "idp-secret".into(),
        })
    }

    fn token(claims: serde_json::Value) -> String {
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"idp-secret"),
        )
        .unwrap()
    }

    fn exp() -> i64 {
        OffsetDateTime::now_utc().unix_timestamp() + 600
    }

    #[test]
    fn email_regex() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.d"));
    }

    #[tokio::test]
    async fn accepts_valid_id_token() {
        let t = token(json!({
            "sub": "g-42", "email": "Ada@Example.com", "name": "Ada Lovelace",
            "iss": "https://id.example", "aud": "client-123", "exp": exp(),
        }));
        let id = provider().verify(&t).await.unwrap();
        assert_eq!(id.subject, "g-42");
        assert_eq!(id.email, "ada@example.com");
        assert_eq!(id.display_name, "Ada Lovelace");
    }

    #[tokio::test]
    async fn display_name_falls_back_to_email() {
        let t = token(json!({
            "sub": "g-1", "email": "grace@example.com",
            "iss": "https://id.example", "aud": "client-123", "exp": exp(),
        }));
        let id = provider().verify(&t).await.unwrap();
        assert_eq!(id.display_name, "grace");
    }

    #[tokio::test]
    async fn rejects_wrong_audience_and_missing_email() {
        let wrong_aud = token(json!({
            "sub": "g-1", "email": "x@example.com",
            "iss": "https://id.example", "aud": "someone-else", "exp": exp(),
        }));
        assert!(provider().verify(&wrong_aud).await.is_err());

        let no_email = token(json!({
            "sub": "g-1", "iss": "https://id.example", "aud": "client-123", "exp": exp(),
        }));
        assert!(provider().verify(&no_email).await.is_err());
    }
}
