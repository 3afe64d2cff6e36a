//! Authorization error types and their wire mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Internal failure kinds from the authorization path.
///
/// The wire response deliberately collapses the cryptographic kinds into one
/// body so a caller cannot probe which check failed; the kinds stay distinct
/// here for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    /// No credential in any accepted location
    MissingCredential,
    /// Credential present but not a bearer token
    MalformedCredential,
    /// Bad signature, expired, wrong type, or undecodable
    InvalidToken,
    /// Token id is in the revocation ledger, or predates the user's watermark
    Revoked,
    /// No user row for the token's subject
    SubjectNotFound,
    /// User exists but the account is not active
    AccountInactive,
    /// Authenticated but the role does not allow the operation
    InsufficientRole,
    /// Datastore unavailable outside the fail-closed revocation path
    Storage,
}

/// Rejection type for the auth extractors; converts to the JSON error
/// contract shared by all API responses.
#[derive(Debug)]
pub struct ApiAuthError(pub(super) AuthErrorKind);

impl ApiAuthError {
    pub fn kind(&self) -> AuthErrorKind {
        self.0
    }

    fn status_code(&self) -> StatusCode {
        match self.0 {
            AuthErrorKind::MissingCredential
            | AuthErrorKind::MalformedCredential
            | AuthErrorKind::InvalidToken
            | AuthErrorKind::Revoked
            | AuthErrorKind::SubjectNotFound
            | AuthErrorKind::AccountInactive => StatusCode::UNAUTHORIZED,
            AuthErrorKind::InsufficientRole => StatusCode::FORBIDDEN,
            AuthErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the client should discard its stored credential and
    /// re-authenticate rather than retry.
    fn is_stale_credential(&self) -> bool {
        matches!(self.0, AuthErrorKind::InvalidToken | AuthErrorKind::Revoked)
    }

    fn message(&self) -> &'static str {
        match self.0 {
            AuthErrorKind::MissingCredential | AuthErrorKind::MalformedCredential => {
                "Authentication required"
            }
            AuthErrorKind::InvalidToken | AuthErrorKind::Revoked => "Invalid or expired token",
            AuthErrorKind::SubjectNotFound | AuthErrorKind::AccountInactive => "Access denied",
            AuthErrorKind::InsufficientRole => "Insufficient permissions",
            AuthErrorKind::Storage => "Internal server error",
        }
    }
}

impl From<AuthErrorKind> for ApiAuthError {
    fn from(kind: AuthErrorKind) -> Self {
        Self(kind)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reset_token: Option<bool>,
}

impl IntoResponse for ApiAuthError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            message: self.message(),
            reset_token: self.is_stale_credential().then_some(true),
        };
        (self.status_code(), Json(body)).into_response()
    }
}
