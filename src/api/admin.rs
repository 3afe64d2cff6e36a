//! Admin API endpoints.
//!
//! All endpoints require admin role.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
};
use std::sync::Arc;

use super::error::{ApiError, ResultExt};
use crate::auth::AdminAuth;
use crate::db::Database;
use crate::impl_has_auth_state;
use crate::token::{TokenSigner, unix_now};

/// State for admin endpoints.
#[derive(Clone)]
pub struct AdminState {
    pub db: Database,
    pub signer: Arc<TokenSigner>,
}

impl_has_auth_state!(AdminState);

pub fn router(state: AdminState) -> Router {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/{id}/disable", post(disable_user))
        .with_state(state)
}

/// List all users.
async fn list_users(
    State(state): State<AdminState>,
    AdminAuth(_admin): AdminAuth,
) -> Result<impl IntoResponse, ApiError> {
    let users = state
        .db
        .users()
        .list()
        .await
        .db_err("Failed to list users")?;

    Ok(Json(serde_json::json!({ "success": true, "users": users })))
}

/// Disable an account. Advancing the token watermark kills every
/// outstanding token for the user, so no per-token enumeration is needed.
async fn disable_user(
    State(state): State<AdminState>,
    AdminAuth(_admin): AdminAuth,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let disabled = state
        .db
        .users()
        .disable(id, unix_now() as i64)
        .await
        .db_err("Failed to disable user")?;

    if !disabled {
        return Err(ApiError::not_found("User not found"));
    }

    Ok(Json(serde_json::json!({ "success": true })))
}
