use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use super::{claims::TokenKind, jwt::JwtKeys};
use crate::{access::Actor, error::AppError};

/// Authenticated caller. Rejects the request with 401 when the bearer token is
/// missing, invalid or not an access token.
pub struct AuthUser(pub Actor);

/// Caller that may be anonymous: no `Authorization` header yields
/// [`Actor::anonymous`], a bad token is still rejected.
pub struct MaybeAuthUser(pub Actor);

fn bearer(parts: &Parts) -> Result<Option<&str>, AppError> {
    let Some(header) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = header
        .to_str()
        .map_err(|_| AppError::Unauthenticated("Invalid Authorization header".into()))?;
    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .map(Some)
        .ok_or_else(|| AppError::Unauthenticated("Invalid Authorization header".into()))
}

fn actor_from_token(keys: &JwtKeys, token: &str) -> Result<Actor, AppError> {
    let claims = keys.verify(token).map_err(|_| {
        warn!("invalid or expired token");
        AppError::Unauthenticated("Invalid or expired token".into())
    })?;
    if claims.kind != TokenKind::Access {
        return Err(AppError::Unauthenticated("Access token required".into()));
    }
    Ok(Actor::new(claims.sub, claims.role))
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer(parts)?
            .ok_or_else(|| AppError::Unauthenticated("Missing Authorization header".into()))?;
        let keys = JwtKeys::from_ref(state);
        actor_from_token(&keys, token).map(AuthUser)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match bearer(parts)? {
            Some(token) => {
                let keys = JwtKeys::from_ref(state);
                actor_from_token(&keys, token).map(MaybeAuthUser)
            }
            None => Ok(MaybeAuthUser(Actor::anonymous())),
        }
    }
}
