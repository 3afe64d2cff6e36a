//! Bearer credential extraction from request parts.

use axum::http::{header, request::Parts};

use super::errors::AuthErrorKind;

/// Header some reverse proxies rewrite `Authorization` into before the
/// request reaches the application.
const PROXY_AUTH_HEADER: &str = "x-authorization";

/// Query parameter fallback for long-lived streaming connections that
/// cannot set custom headers.
const TOKEN_QUERY_PARAM: &str = "token";

/// Extract the bearer credential from a request.
///
/// Sources, in order: the `Authorization` header, the proxy-rewritten
/// `X-Authorization` variant, and the `token` query parameter. A present
/// but non-Bearer `Authorization` header is malformed, not missing.
pub fn extract_credential(parts: &Parts) -> Result<&str, AuthErrorKind> {
    for name in [header::AUTHORIZATION.as_str(), PROXY_AUTH_HEADER] {
        if let Some(value) = parts.headers.get(name) {
            let value = value
                .to_str()
                .map_err(|_| AuthErrorKind::MalformedCredential)?;
            let token = strip_bearer(value).ok_or(AuthErrorKind::MalformedCredential)?;
            if token.is_empty() {
                return Err(AuthErrorKind::MalformedCredential);
            }
            return Ok(token);
        }
    }

    if let Some(token) = query_param(parts.uri.query(), TOKEN_QUERY_PARAM) {
        if token.is_empty() {
            return Err(AuthErrorKind::MalformedCredential);
        }
        return Ok(token);
    }

    Err(AuthErrorKind::MissingCredential)
}

/// Strip the `Bearer ` scheme prefix, case-insensitively.
fn strip_bearer(value: &str) -> Option<&str> {
    let (scheme, rest) = value.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") {
        Some(rest.trim())
    } else {
        None
    }
}

/// Find a raw query parameter value. Tokens are base64url plus dots, so no
/// percent-decoding is needed.
fn query_param<'a>(query: Option<&'a str>, name: &str) -> Option<&'a str> {
    query?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}
