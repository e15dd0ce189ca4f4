//! Refresh session model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Refresh session entity. Backs exactly one outstanding refresh token; only the
/// hash of the token's session id is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshSession {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RefreshSession {
    /// Whether the session is past its own expiry at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// New session creation payload
#[derive(Debug, Clone)]
pub struct NewRefreshSession {
    pub owner_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}
