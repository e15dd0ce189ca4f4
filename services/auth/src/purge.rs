//! Periodic removal of expired refresh sessions

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::warn;

use crate::session::SessionManager;

/// Spawn the purge loop. It runs once immediately, then every `every`, until
/// the handle is aborted or the runtime shuts down.
pub fn spawn_session_purge(session_manager: SessionManager, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = session_manager.purge_expired().await {
                warn!("Expired session purge failed: {}", e);
            }
        }
    })
}
