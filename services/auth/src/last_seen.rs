//! Best-effort background update of an account's last-seen timestamp
//!
//! The update runs detached from the request that triggered it: it may outlive
//! the response, is never cancelled by it, and its outcome is visible only in
//! the logs.

use chrono::Utc;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::config::LastSeenConfig;
use crate::repositories::{AccountStore, RepositoryError, with_deadline};

/// Spawn the last-seen update. The handle resolves to whether the update landed;
/// callers are free to drop it.
pub fn spawn_last_seen_update(
    accounts: Arc<dyn AccountStore>,
    account_id: Uuid,
    config: LastSeenConfig,
) -> JoinHandle<bool> {
    tokio::spawn(async move {
        for attempt in 1..=config.attempts {
            let call = accounts.touch_last_seen(account_id, Utc::now());
            match with_deadline(config.attempt_timeout, call).await {
                Ok(()) => {
                    debug!(%account_id, attempt, "Updated last seen");
                    return true;
                }
                Err(RepositoryError::NotFound) => {
                    warn!(%account_id, "Account vanished before last seen update");
                    return false;
                }
                Err(e) => {
                    warn!(%account_id, attempt, "Last seen update failed: {}", e);
                    if attempt < config.attempts {
                        tokio::time::sleep(config.backoff).await;
                    }
                }
            }
        }

        error!(
            %account_id,
            "Giving up on last seen update after {} attempts", config.attempts
        );
        false
    })
}
