mod account;
mod admin;
mod error;
mod sessions;

use axum::Router;
use std::sync::Arc;

use crate::db::Database;
use crate::mail::Mailer;
use crate::rate_limit::RateLimitConfig;
use crate::token::TokenSigner;

/// Create the API router.
pub fn create_api_router(
    db: Database,
    signer: Arc<TokenSigner>,
    mailer: Arc<dyn Mailer>,
    rate_limit: RateLimitConfig,
) -> Router {
    let account_state = account::AccountState {
        db: db.clone(),
        signer: signer.clone(),
        mailer,
        rate_limit: rate_limit.clone(),
    };

    let sessions_state = sessions::SessionsState {
        db: db.clone(),
        signer: signer.clone(),
        rate_limit,
    };

    let admin_state = admin::AdminState { db, signer };

    Router::new()
        .nest("/account", account::router(account_state))
        .nest("/sessions", sessions::router(sessions_state))
        .nest("/admin", admin::router(admin_state))
}
