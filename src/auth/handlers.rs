use axum::{
    extract::{FromRef, Path, State},
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{AuthResponse, PublicUser, RefreshRequest, RoleRequest, SignInRequest},
    extractors::AuthUser,
    jwt::JwtKeys,
    repo_types::User,
};
use crate::{
    error::{AppError, AppResult},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/sign-in", post(sign_in))
        .route("/auth/refresh", post(refresh))
        .route("/auth/select-role", post(select_role))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/admin/users/:id/role", put(set_user_role))
}

fn auth_response(state: &AppState, user: &User, message: String) -> AppResult<AuthResponse> {
    let keys = JwtKeys::from_ref(state);
    let pair = keys.sign_pair(user.id, user.role)?;
    Ok(AuthResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        user: PublicUser::from(user),
        needs_role: user.needs_role(),
        message,
    })
}

#[instrument(skip(state, payload))]
pub async fn sign_in(
    State(state): State<AppState>,
    Json(payload): Json<SignInRequest>,
) -> AppResult<Json<AuthResponse>> {
    let identity = state
        .identity
        .verify(payload.credential.trim())
        .await
        .map_err(|e| {
            warn!(error = %e, "identity verification failed");
            AppError::Unauthenticated("Invalid credential".into())
        })?;

    let (user, created) = User::find_or_create(&state.db, &identity).await?;
    if created {
        info!(user_id = %user.id, email = %user.email, "user created on first sign-in");
    }
    info!(user_id = %user.id, role = %user.role, "user signed in");

    let message = if user.needs_role() {
        "Signed in. Please select a role to continue.".to_string()
    } else {
        user.role.greeting().to_string()
    };
    Ok(Json(auth_response(&state, &user, message)?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| AppError::Unauthenticated(e.to_string()))?;

    // the role may have changed since the refresh token was issued
    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthenticated("User not found".into()))?;

    Ok(Json(auth_response(&state, &user, "Tokens refreshed".into())?))
}

#[instrument(skip(state, payload))]
pub async fn select_role(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Json(payload): Json<RoleRequest>,
) -> AppResult<Json<AuthResponse>> {
    if !payload.role.is_assignable() {
        return Err(AppError::validation("Role must be 'admin' or 'user'"));
    }
    let user = User::select_role(&state.db, actor.user_id, payload.role)
        .await?
        .ok_or_else(|| AppError::conflict("Role has already been selected"))?;

    info!(user_id = %user.id, role = %user.role, "role selected");
    let message = user.role.greeting().to_string();
    Ok(Json(auth_response(&state, &user, message)?))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> AppResult<Json<PublicUser>> {
    let user = User::find_by_id(&state.db, actor.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthenticated("User not found".into()))?;
    Ok(Json(PublicUser::from(&user)))
}

#[instrument(skip(state, payload))]
pub async fn set_user_role(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<RoleRequest>,
) -> AppResult<Json<PublicUser>> {
    if !actor.is_admin() {
        warn!(user_id = %actor.user_id, "non-admin tried to change a role");
        return Err(AppError::forbidden("Only an admin can change roles"));
    }
    if !payload.role.is_assignable() {
        return Err(AppError::validation("Role must be 'admin' or 'user'"));
    }
    let user = User::set_role(&state.db, user_id, payload.role)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    info!(admin_id = %actor.user_id, %user_id, role = %user.role, "role changed by admin");
    Ok(Json(PublicUser::from(&user)))
}
