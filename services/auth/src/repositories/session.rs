//! Refresh session repository backed by PostgreSQL

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::{info, warn};
use uuid::Uuid;

use super::{RepositoryError, RepositoryResult, SessionStore};
use crate::models::{NewRefreshSession, RefreshSession};

/// Restricts `rs` (refresh_sessions) to live rows whose owner `a` (accounts) is live.
/// Every session query joins through this clause.
const LIVE_SESSION: &str = "a.id = rs.owner_id AND a.deleted_at IS NULL AND rs.deleted_at IS NULL";

const SESSION_COLUMNS: &str =
    "rs.id, rs.owner_id, rs.token_hash, rs.expires_at, rs.created_at, rs.updated_at";

/// Refresh session repository
#[derive(Clone)]
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    /// Create a new session repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn session_from_row(row: &PgRow) -> RepositoryResult<RefreshSession> {
    Ok(RefreshSession {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        token_hash: row.try_get("token_hash")?,
        expires_at: row.try_get("expires_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn expect_any(rows_affected: u64) -> RepositoryResult<u64> {
    if rows_affected == 0 {
        Err(RepositoryError::NotFound)
    } else {
        Ok(rows_affected)
    }
}

#[async_trait]
impl SessionStore for PgSessionRepository {
    async fn create(&self, new_session: &NewRefreshSession) -> RepositoryResult<RefreshSession> {
        info!("Creating refresh session for account: {}", new_session.owner_id);

        let row = sqlx::query(
            r#"
            INSERT INTO refresh_sessions (id, owner_id, token_hash, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, owner_id, token_hash, expires_at, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new_session.owner_id)
        .bind(&new_session.token_hash)
        .bind(new_session.expires_at)
        .fetch_one(&self.pool)
        .await?;

        session_from_row(&row)
    }

    async fn find_by_hash(&self, token_hash: &str) -> RepositoryResult<RefreshSession> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {SESSION_COLUMNS}
            FROM refresh_sessions rs
            JOIN accounts a ON a.id = rs.owner_id
            WHERE {LIVE_SESSION} AND rs.token_hash = $1
            "#
        ))
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => session_from_row(&row),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn rotate(
        &self,
        old_hash: &str,
        new_hash: &str,
        new_expiry: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        let mut tx = self.pool.begin().await?;

        // Row lock: a concurrent rotation of the same hash waits here, then
        // re-evaluates against the committed hash and finds nothing.
        let row = sqlx::query(&format!(
            r#"
            SELECT rs.id
            FROM refresh_sessions rs
            JOIN accounts a ON a.id = rs.owner_id
            WHERE {LIVE_SESSION} AND rs.token_hash = $1 AND rs.expires_at > NOW()
            FOR UPDATE OF rs
            "#
        ))
        .bind(old_hash)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            warn!("Rotation found no live session for the presented hash");
            return Err(RepositoryError::NotFound);
        };
        let id: Uuid = row.try_get("id")?;

        sqlx::query(
            r#"
            UPDATE refresh_sessions
            SET token_hash = $2, expires_at = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(new_hash)
        .bind(new_expiry)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn delete_by_hash(&self, token_hash: &str) -> RepositoryResult<()> {
        let result = sqlx::query(&format!(
            r#"
            DELETE FROM refresh_sessions rs
            USING accounts a
            WHERE {LIVE_SESSION} AND rs.token_hash = $1
            "#
        ))
        .bind(token_hash)
        .execute(&self.pool)
        .await?;

        expect_any(result.rows_affected()).map(|_| ())
    }

    async fn delete_by_id(&self, id: Uuid) -> RepositoryResult<()> {
        let result = sqlx::query(&format!(
            r#"
            DELETE FROM refresh_sessions rs
            USING accounts a
            WHERE {LIVE_SESSION} AND rs.id = $1
            "#
        ))
        .bind(id)
        .execute(&self.pool)
        .await?;

        expect_any(result.rows_affected()).map(|_| ())
    }

    async fn delete_by_owner(&self, owner_id: Uuid) -> RepositoryResult<u64> {
        info!("Revoking all refresh sessions for account: {}", owner_id);

        let result = sqlx::query(&format!(
            r#"
            DELETE FROM refresh_sessions rs
            USING accounts a
            WHERE {LIVE_SESSION} AND rs.owner_id = $1
            "#
        ))
        .bind(owner_id)
        .execute(&self.pool)
        .await?;

        expect_any(result.rows_affected())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> RepositoryResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM refresh_sessions
            WHERE expires_at <= $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
