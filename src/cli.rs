//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::db::Database;
use crate::mail::LogMailer;
use crate::password::hash_password;
use crate::rate_limit::RateLimits;
use crate::token::{self, TokenTtls};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "Rookery", about = "Token-authenticated account service")]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "7430")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, default_value = "rookery.db")]
    pub database: String,

    /// Path to file containing the token signing secret. Prefer using the
    /// TOKEN_SECRET env var instead
    #[arg(long)]
    pub token_secret_file: Option<String>,

    /// Session token lifetime in seconds
    #[arg(long, default_value_t = token::AUTH_TOKEN_TTL_SECS)]
    pub auth_ttl: u64,

    /// Password reset token lifetime in seconds
    #[arg(long, default_value_t = token::RESET_TOKEN_TTL_SECS)]
    pub reset_ttl: u64,

    /// Email verification token lifetime in seconds
    #[arg(long, default_value_t = token::VERIFY_TOKEN_TTL_SECS)]
    pub verify_ttl: u64,

    /// Create an admin user on startup and print its credentials
    #[arg(long)]
    pub create_admin: bool,

    /// Email address for the admin created with --create-admin
    #[arg(long, default_value = "admin@localhost")]
    pub admin_email: String,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load the token signing secret from environment variable or file.
/// Returns None and logs an error if no secret can be loaded at all; a weak
/// secret only warns, so development setups keep working.
pub fn load_token_secret(token_secret_file: Option<&str>) -> Option<Vec<u8>> {
    let secret = if let Ok(secret) = std::env::var("TOKEN_SECRET") {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var("TOKEN_SECRET") };
        secret
    } else if let Some(path) = token_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read token secret file");
                return None;
            }
        }
    } else {
        error!(
            "Token secret is required. Set TOKEN_SECRET environment variable (recommended) or use --token-secret-file"
        );
        return None;
    };

    let secret = secret.into_bytes();

    if token::secret_is_weak(&secret) {
        warn!(
            "Token signing secret is weak (shorter than {} bytes or a known placeholder). Tokens signed with it are forgeable",
            token::MIN_SECRET_LENGTH
        );
    }

    Some(secret)
}

/// Handle the --create-admin flag: create an active admin user with a
/// generated password and print the credentials once.
pub async fn handle_create_admin(db: &Database, email: &str) {
    match db.users().get_by_username("admin").await {
        Ok(Some(_)) => {
            println!();
            println!("Admin user already exists, not creating another");
            println!();
        }
        Ok(None) => {
            let password = uuid::Uuid::new_v4().simple().to_string();
            let password_hash = match hash_password(&password) {
                Ok(hash) => hash,
                Err(e) => {
                    error!(error = %e, "Failed to hash admin password");
                    std::process::exit(1);
                }
            };

            match db.users().create_admin("admin", email, &password_hash).await {
                Ok(_) => {
                    println!();
                    println!("Admin user created: admin");
                    println!("Password: {}", password);
                    println!();
                }
                Err(e) => {
                    error!(error = %e, "Failed to create admin user");
                    std::process::exit(1);
                }
            }
        }
        Err(e) => {
            error!(error = %e, "Failed to check for existing admin");
            std::process::exit(1);
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(args: &Args, db: Database, token_secret: Vec<u8>) -> ServerConfig {
    ServerConfig {
        db,
        token_secret,
        ttls: TokenTtls {
            auth: Duration::from_secs(args.auth_ttl),
            reset: Duration::from_secs(args.reset_ttl),
            verify: Duration::from_secs(args.verify_ttl),
        },
        mailer: Arc::new(LogMailer),
        rate_limits: RateLimits::default(),
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
