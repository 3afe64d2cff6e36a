//! Axum extractors for bearer-token authorization.

use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::error;

use super::bearer::extract_credential;
use super::errors::{ApiAuthError, AuthErrorKind};
use super::state::HasAuthState;
use super::types::AuthenticatedUser;
use crate::db::{AccountStatus, UserRole};
use crate::token::TokenType;

/// Core authorization logic shared by all extractors.
///
/// Check order matters: the signature is verified before any claim is
/// trusted, the revocation ledger is consulted before the user row is
/// loaded, and the per-user watermark check needs the row so it runs after
/// the lookup.
async fn authorize_request<S>(parts: &Parts, state: &S) -> Result<AuthenticatedUser, AuthErrorKind>
where
    S: HasAuthState + Send + Sync,
{
    let credential = extract_credential(parts)?;

    let claims = state
        .signer()
        .decode(credential, TokenType::Auth)
        .map_err(|_| AuthErrorKind::InvalidToken)?;

    if state.db().revocations().is_revoked(&claims.jti).await {
        return Err(AuthErrorKind::Revoked);
    }

    let user = state
        .db()
        .users()
        .get_by_id(claims.user_id)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to load user for authorization");
            AuthErrorKind::Storage
        })?
        .ok_or(AuthErrorKind::SubjectNotFound)?;

    // Tokens minted before the user's last invalidation event are dead even
    // though no ledger entry names them.
    if (claims.iat as i64) < user.tokens_valid_after {
        return Err(AuthErrorKind::Revoked);
    }

    if user.status != AccountStatus::Active {
        return Err(AuthErrorKind::AccountInactive);
    }

    Ok(AuthenticatedUser {
        user_id: user.id,
        username: user.username,
        email: user.email,
        status: user.status,
        role: user.role,
        claims,
    })
}

/// Extractor for endpoints that require an authenticated, active user.
pub struct Auth(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for Auth
where
    S: HasAuthState + Send + Sync,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        authorize_request(parts, state)
            .await
            .map(Auth)
            .map_err(ApiAuthError::from)
    }
}

/// Extractor for admin-only endpoints. Authenticated non-admins get 403.
pub struct AdminAuth(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for AdminAuth
where
    S: HasAuthState + Send + Sync,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Auth(user) = Auth::from_request_parts(parts, state).await?;

        if user.role != UserRole::Admin {
            return Err(ApiAuthError::from(AuthErrorKind::InsufficientRole));
        }

        Ok(AdminAuth(user))
    }
}

/// Optional authorization - never fails, returns `None` for anonymous or
/// unauthorizable requests.
pub struct MaybeAuth(pub Option<AuthenticatedUser>);

impl<S> FromRequestParts<S> for MaybeAuth
where
    S: HasAuthState + Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuth(authorize_request(parts, state).await.ok()))
    }
}
