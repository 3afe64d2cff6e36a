pub mod api;
pub mod auth;
pub mod cleanup;
pub mod cli;
pub mod db;
pub mod mail;
pub mod password;
pub mod rate_limit;
pub mod token;

use api::create_api_router;
use axum::Router;
use db::Database;
use mail::Mailer;
use rate_limit::{RateLimitConfig, RateLimits};
use std::net::SocketAddr;
use std::sync::Arc;
use token::{TokenSigner, TokenTtls};
use tokio::net::TcpListener;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Secret for signing tokens
    pub token_secret: Vec<u8>,
    /// Per-type token lifetimes
    pub ttls: TokenTtls,
    /// Outbound mail sink for verification and reset tokens
    pub mailer: Arc<dyn Mailer>,
    /// Per-IP quotas for the authentication endpoints
    pub rate_limits: RateLimits,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let signer = Arc::new(TokenSigner::new(&config.token_secret, config.ttls));
    let rate_limit = RateLimitConfig::new(config.rate_limits);

    let api_router = create_api_router(
        config.db.clone(),
        signer,
        config.mailer.clone(),
        rate_limit,
    );

    Router::new().nest("/api", api_router)
}

/// Run cleanup tasks and spawn the background sweep scheduler.
/// Call this before starting the server.
pub async fn init_cleanup(db: &Database) {
    cleanup::run_cleanup(db).await;
    cleanup::spawn_cleanup_scheduler(db.clone());
}

/// Run the server on the given listener. This function blocks until the server exits.
/// Call `init_cleanup` before this to run cleanup on startup.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}
