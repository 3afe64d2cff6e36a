//! Rate limiting for authentication endpoints.
//!
//! Uses a token bucket algorithm with per-IP tracking to prevent brute force
//! and signup spam.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use std::{num::NonZeroU32, sync::Arc};

/// Per-IP rate limiter for endpoint-specific limiting.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Per-minute quotas, injected from the server configuration so tests can
/// raise or lower them.
#[derive(Debug, Clone, Copy)]
pub struct RateLimits {
    /// Login attempts per minute per IP
    pub login_per_minute: u32,
    /// Registrations per minute per IP
    pub register_per_minute: u32,
    /// Password reset requests per minute per IP
    pub reset_request_per_minute: u32,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            login_per_minute: 10,
            register_per_minute: 3,
            reset_request_per_minute: 3,
        }
    }
}

/// Rate limiters for the authentication endpoints.
#[derive(Clone)]
pub struct RateLimitConfig {
    pub login: Arc<IpLimiter>,
    pub register: Arc<IpLimiter>,
    pub reset_request: Arc<IpLimiter>,
}

impl RateLimitConfig {
    pub fn new(limits: RateLimits) -> Self {
        Self {
            login: Arc::new(RateLimiter::keyed(Quota::per_minute(
                NonZeroU32::new(limits.login_per_minute.max(1)).unwrap(),
            ))),
            register: Arc::new(RateLimiter::keyed(Quota::per_minute(
                NonZeroU32::new(limits.register_per_minute.max(1)).unwrap(),
            ))),
            reset_request: Arc::new(RateLimiter::keyed(Quota::per_minute(
                NonZeroU32::new(limits.reset_request_per_minute.max(1)).unwrap(),
            ))),
        }
    }
}

/// Extract the client IP: first hop of X-Forwarded-For when behind a proxy,
/// otherwise the socket address.
pub fn client_ip(request: &Request) -> Option<String> {
    use axum::extract::ConnectInfo;
    use std::net::SocketAddr;

    if let Some(forwarded_for) = request.headers().get("x-forwarded-for") {
        if let Ok(value) = forwarded_for.to_str() {
            if let Some(first_ip) = value.split(',').next() {
                let ip = first_ip.trim();
                if !ip.is_empty() {
                    return Some(ip.to_string());
                }
            }
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
}

async fn check_limiter(limiter: &IpLimiter, message: &'static str, request: Request, next: Next) -> Response {
    // Requests with no determinable IP share one bucket rather than
    // bypassing the limiter.
    let ip = client_ip(&request).unwrap_or_default();

    match limiter.check_key(&ip) {
        Ok(_) => next.run(request).await,
        Err(_) => (StatusCode::TOO_MANY_REQUESTS, message).into_response(),
    }
}

/// Middleware for rate limiting login attempts.
pub async fn rate_limit_login(
    State(config): State<RateLimitConfig>,
    request: Request,
    next: Next,
) -> Response {
    check_limiter(
        &config.login,
        "Too many login attempts. Please wait before trying again.",
        request,
        next,
    )
    .await
}

/// Middleware for rate limiting registration.
pub async fn rate_limit_register(
    State(config): State<RateLimitConfig>,
    request: Request,
    next: Next,
) -> Response {
    check_limiter(
        &config.register,
        "Too many signup attempts. Please wait before trying again.",
        request,
        next,
    )
    .await
}

/// Middleware for rate limiting password reset requests.
pub async fn rate_limit_reset_request(
    State(config): State<RateLimitConfig>,
    request: Request,
    next: Next,
) -> Response {
    check_limiter(
        &config.reset_request,
        "Too many reset requests. Please wait before trying again.",
        request,
        next,
    )
    .await
}
