//! Session endpoints.
//!
//! - POST `/` - Login with username/email and password, returns a bearer token
//! - POST `/logout` - Revoke the presented token until its natural expiry
//! - GET `/me` - Return the authenticated identity
//! - GET `/status` - Lightweight auth check that never fails

use axum::{
    Json, Router,
    extract::State,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::{ApiError, ResultExt};
use crate::auth::{Auth, AuthenticatedUser, MaybeAuth};
use crate::db::{AccountStatus, Database, UserRole};
use crate::impl_has_auth_state;
use crate::password::verify_password;
use crate::rate_limit::{RateLimitConfig, rate_limit_login};
use crate::token::{TokenSigner, TokenType};

#[derive(Clone)]
pub struct SessionsState {
    pub db: Database,
    pub signer: Arc<TokenSigner>,
    pub rate_limit: RateLimitConfig,
}

impl_has_auth_state!(SessionsState);

pub fn router(state: SessionsState) -> Router {
    let login_routes = Router::new()
        .route("/", post(login))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.rate_limit.clone(),
            rate_limit_login,
        ));

    Router::new()
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/status", get(status))
        .with_state(state)
        .merge(login_routes)
}

/// Public view of a user, returned from login and `/me`.
#[derive(Serialize)]
struct UserInfo {
    id: i64,
    username: String,
    email: String,
    role: UserRole,
}

impl From<&AuthenticatedUser> for UserInfo {
    fn from(user: &AuthenticatedUser) -> Self {
        Self {
            id: user.user_id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

#[derive(Deserialize)]
struct LoginRequest {
    /// Username or email address
    login: String,
    password: String,
}

#[derive(Serialize)]
struct LoginResponse {
    success: bool,
    token: String,
    expires_at: u64,
    user: UserInfo,
}

async fn login(
    State(state): State<SessionsState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .users()
        .get_by_login(payload.login.trim())
        .await
        .db_err("Failed to look up user")?
        .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    if !verify_password(&payload.password, &user.password_hash) {
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    if user.status != AccountStatus::Active {
        return Err(ApiError::forbidden("Account not active"));
    }

    let issued = state
        .signer
        .issue(user.id, TokenType::Auth)
        .map_err(|e| ApiError::internal("Failed to issue session token", e))?;

    Ok(Json(LoginResponse {
        success: true,
        token: issued.token,
        expires_at: issued.expires_at,
        user: UserInfo {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
        },
    }))
}

/// Logout: put the presented token's jti on the ledger until the token
/// would have expired anyway.
async fn logout(
    State(state): State<SessionsState>,
    Auth(user): Auth,
) -> Result<impl IntoResponse, ApiError> {
    state
        .db
        .revocations()
        .revoke(&user.claims.jti, user.claims.exp as i64)
        .await
        .db_err("Failed to revoke session token")?;

    Ok(Json(serde_json::json!({ "success": true })))
}

async fn me(Auth(user): Auth) -> impl IntoResponse {
    Json(serde_json::json!({
        "success": true,
        "user": UserInfo::from(&user),
    }))
}

/// Auth status check for clients restoring state. Anonymous requests get a
/// 200 with `authenticated: false` instead of a rejection.
async fn status(MaybeAuth(user): MaybeAuth) -> impl IntoResponse {
    match user {
        Some(user) => Json(serde_json::json!({
            "authenticated": true,
            "user": UserInfo::from(&user),
        })),
        None => Json(serde_json::json!({ "authenticated": false })),
    }
}
