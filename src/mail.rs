//! Outbound mail boundary.
//!
//! Delivery is an external collaborator; this crate only decides *when* a
//! message carrying a token goes out. The default implementation records
//! the send in the log, which is also what development setups want.

use tracing::info;

/// Sink for the two token-carrying messages the account flows produce.
pub trait Mailer: Send + Sync {
    fn send_verification(&self, email: &str, token: &str);
    fn send_password_reset(&self, email: &str, token: &str);
}

/// Mailer that logs instead of delivering.
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send_verification(&self, email: &str, token: &str) {
        info!(email = %email, token = %token, "Verification mail queued");
    }

    fn send_password_reset(&self, email: &str, token: &str) {
        info!(email = %email, token = %token, "Password reset mail queued");
    }
}
