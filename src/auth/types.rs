//! Authenticated identity types.

use crate::db::{AccountStatus, UserRole};
use crate::token::Claims;

/// The identity produced by a successful authorization: the user row looked
/// up from the token's subject, plus the verified claims themselves (the
/// claims carry the jti and expiry needed for logout).
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub status: AccountStatus,
    pub role: UserRole,
    /// Verified claims from the presented token
    pub claims: Claims,
}
