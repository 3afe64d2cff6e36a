//! Scheduled cleanup of expired revocation entries and stale signups.
//!
//! Correctness never depends on the sweep running: revoked entries are only
//! deleted once the token they name has expired on its own. The sweep just
//! keeps the ledger small.

use crate::db::Database;
use std::time::Duration;
use tracing::{error, info};

/// Interval between cleanup runs.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60); // 1 hour

/// Run all cleanup tasks once.
pub async fn run_cleanup(db: &Database) {
    match db.revocations().sweep().await {
        Ok(count) if count > 0 => info!("Swept {} expired revocation entries", count),
        Ok(_) => {}
        Err(e) => error!("Failed to sweep revocation ledger: {}", e),
    }

    match db.users().cleanup_pending().await {
        Ok(count) if count > 0 => info!("Cleaned up {} stale pending users", count),
        Ok(_) => {}
        Err(e) => error!("Failed to clean up pending users: {}", e),
    }
}

/// Spawn a background task that runs cleanup periodically.
/// Returns a handle that can be used to abort the task.
pub fn spawn_cleanup_scheduler(db: Database) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);

        loop {
            interval.tick().await;
            run_cleanup(&db).await;
        }
    })
}
