//! Account lifecycle endpoints.
//!
//! - POST `/` - Register a new account (issues an email verification token)
//! - POST `/verify` - Consume a verification token and activate the account
//! - POST `/reset-request` - Request a password reset token by email
//! - POST `/reset` - Consume a reset token and set a new password
//!
//! The verify and reset endpoints share the one-time consumption contract:
//! the domain mutation and the revocation of the consumed token commit in
//! one transaction, so a token can never take effect twice or be consumed
//! without its effect.

use axum::{Json, Router, extract::State, http::StatusCode, middleware, response::IntoResponse, routing::post};
use serde::Deserialize;
use std::sync::Arc;

use super::error::{ApiError, ResultExt};
use crate::db::{AccountStatus, Database};
use crate::mail::Mailer;
use crate::password::{MIN_PASSWORD_LENGTH, hash_password};
use crate::rate_limit::{RateLimitConfig, rate_limit_register, rate_limit_reset_request};
use crate::token::{Claims, TokenSigner, TokenType, unix_now};

#[derive(Clone)]
pub struct AccountState {
    pub db: Database,
    pub signer: Arc<TokenSigner>,
    pub mailer: Arc<dyn Mailer>,
    pub rate_limit: RateLimitConfig,
}

pub fn router(state: AccountState) -> Router {
    let register_routes = Router::new()
        .route("/", post(register))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.rate_limit.clone(),
            rate_limit_register,
        ));

    let reset_request_routes = Router::new()
        .route("/reset-request", post(reset_request))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.rate_limit.clone(),
            rate_limit_reset_request,
        ));

    Router::new()
        .route("/verify", post(verify_email))
        .route("/reset", post(reset_password))
        .with_state(state)
        .merge(register_routes)
        .merge(reset_request_routes)
}

/// Decode a one-time token and check it against the ledger. Both failure
/// modes produce the same stale-token response so a caller cannot tell a
/// consumed token from a forged one.
async fn decode_one_time(
    state: &AccountState,
    token: &str,
    expected: TokenType,
) -> Result<Claims, ApiError> {
    let claims = state
        .signer
        .decode(token, expected)
        .map_err(|_| ApiError::stale_token("Invalid or expired token"))?;

    if state.db.revocations().is_revoked(&claims.jti).await {
        return Err(ApiError::stale_token("Invalid or expired token"));
    }

    Ok(claims)
}

fn validate_username(username: &str) -> Result<(), ApiError> {
    if username.is_empty() {
        return Err(ApiError::bad_request("Username cannot be empty"));
    }

    if username.len() > 32 {
        return Err(ApiError::bad_request(
            "Username cannot be longer than 32 characters",
        ));
    }

    // Only allow alphanumeric and underscores
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ApiError::bad_request(
            "Username can only contain letters, numbers, and underscores",
        ));
    }

    Ok(())
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    if email.is_empty() || email.len() > 254 || !email.contains('@') {
        return Err(ApiError::bad_request("Invalid email address"));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::bad_request(
            "Password must be at least 8 characters",
        ));
    }
    Ok(())
}

#[derive(Deserialize)]
struct RegisterRequest {
    username: String,
    email: String,
    password: String,
}

async fn register(
    State(state): State<AccountState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = payload.username.trim();
    let email = payload.email.trim();

    validate_username(username)?;
    validate_email(email)?;
    validate_password(&payload.password)?;

    let password_hash = hash_password(&payload.password)
        .map_err(|e| ApiError::internal("Failed to hash password", e))?;

    let user_id = match state.db.users().create(username, email, &password_hash).await {
        Ok(id) => id,
        Err(e) if is_unique_violation(&e) => {
            return Err(ApiError::conflict("Username or email is already taken"));
        }
        Err(e) => return Err(ApiError::db_error("Failed to create user", e)),
    };

    let issued = state
        .signer
        .issue(user_id, TokenType::Verify)
        .map_err(|e| ApiError::internal("Failed to issue verification token", e))?;

    state.mailer.send_verification(email, &issued.token);

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "success": true,
            "message": "Account created. Check your email to verify it.",
        })),
    ))
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation())
}

#[derive(Deserialize)]
struct VerifyRequest {
    token: String,
}

/// Consume a verification token and activate the account. One-time: the
/// activation and the ledger entry commit together.
async fn verify_email(
    State(state): State<AccountState>,
    Json(payload): Json<VerifyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let claims = decode_one_time(&state, &payload.token, TokenType::Verify).await?;

    let user = state
        .db
        .users()
        .get_by_id(claims.user_id)
        .await
        .db_err("Failed to load user")?
        .ok_or_else(|| ApiError::unauthorized("Access denied"))?;

    if user.status == AccountStatus::Disabled {
        return Err(ApiError::unauthorized("Access denied"));
    }

    let mut tx = state.db.begin().await.db_err("Failed to begin transaction")?;
    state
        .db
        .users()
        .activate_in_tx(&mut tx, user.id)
        .await
        .db_err("Failed to activate user")?;
    state
        .db
        .revocations()
        .revoke_in_tx(&mut tx, &claims.jti, claims.exp as i64)
        .await
        .db_err("Failed to consume verification token")?;
    tx.commit().await.db_err("Failed to commit verification")?;

    Ok(Json(serde_json::json!({ "success": true })))
}

#[derive(Deserialize)]
struct ResetRequestRequest {
    email: String,
}

/// Issue a password reset token. The response never reveals whether the
/// email matched an account.
async fn reset_request(
    State(state): State<AccountState>,
    Json(payload): Json<ResetRequestRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = payload.email.trim();
    validate_email(email)?;

    let user = state
        .db
        .users()
        .get_by_email(email)
        .await
        .db_err("Failed to look up email")?;

    if let Some(user) = user {
        if user.status == AccountStatus::Active {
            let issued = state
                .signer
                .issue(user.id, TokenType::Reset)
                .map_err(|e| ApiError::internal("Failed to issue reset token", e))?;
            state.mailer.send_password_reset(&user.email, &issued.token);
        }
    }

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "If the address matches an account, a reset link is on its way.",
    })))
}

#[derive(Deserialize)]
struct ResetRequest {
    token: String,
    password: String,
}

/// Consume a reset token and set the new password. One-time: the password
/// update and the ledger entry commit together. The token watermark
/// advances so sessions issued before the reset stop validating.
async fn reset_password(
    State(state): State<AccountState>,
    Json(payload): Json<ResetRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let claims = decode_one_time(&state, &payload.token, TokenType::Reset).await?;

    validate_password(&payload.password)?;

    let user = state
        .db
        .users()
        .get_by_id(claims.user_id)
        .await
        .db_err("Failed to load user")?
        .ok_or_else(|| ApiError::unauthorized("Access denied"))?;

    if user.status == AccountStatus::Disabled {
        return Err(ApiError::unauthorized("Access denied"));
    }

    let password_hash = hash_password(&payload.password)
        .map_err(|e| ApiError::internal("Failed to hash password", e))?;

    let mut tx = state.db.begin().await.db_err("Failed to begin transaction")?;
    state
        .db
        .users()
        .set_password_in_tx(&mut tx, user.id, &password_hash, unix_now() as i64)
        .await
        .db_err("Failed to update password")?;
    state
        .db
        .revocations()
        .revoke_in_tx(&mut tx, &claims.jti, claims.exp as i64)
        .await
        .db_err("Failed to consume reset token")?;
    tx.commit().await.db_err("Failed to commit password reset")?;

    Ok(Json(serde_json::json!({ "success": true })))
}
