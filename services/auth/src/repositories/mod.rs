//! Persistence seams for accounts and refresh sessions
//!
//! The authentication engine talks to storage only through [`AccountStore`] and
//! [`SessionStore`]. Every lookup excludes tombstoned rows, and session lookups
//! additionally exclude sessions whose owning account is tombstoned.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::DatabaseError;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Account, NewAccount, NewRefreshSession, RefreshSession};

pub mod account;
pub mod memory;
pub mod session;

pub use account::PgAccountRepository;
pub use memory::MemoryStore;
pub use session::PgSessionRepository;

/// Errors reported by the stores
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// No live row matched
    #[error("record not found")]
    NotFound,

    /// A unique constraint rejected the write
    #[error("duplicate value violates {0}")]
    Duplicate(String),

    /// The store did not answer within the caller's deadline
    #[error("storage call timed out")]
    Timeout,

    /// Backend failure
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        let err = DatabaseError::Query(err);
        match err.unique_violation() {
            Some(constraint) => RepositoryError::Duplicate(constraint),
            None => RepositoryError::Database(err),
        }
    }
}

/// Type alias for store results
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Identity lookups and account mutations
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Insert a new account; a duplicate email fails with `Duplicate`
    async fn create(&self, new_account: &NewAccount) -> RepositoryResult<Account>;

    /// Find a live account by its exact (case-sensitive) email
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Account>;

    /// Find a live account by id
    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Account>;

    /// Change the email of a live account
    async fn update_email(&self, id: Uuid, email: &str) -> RepositoryResult<()>;

    /// Replace the password hash of a live account
    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> RepositoryResult<()>;

    /// Record the last time the account was seen
    async fn touch_last_seen(&self, id: Uuid, at: DateTime<Utc>) -> RepositoryResult<()>;

    /// Tombstone a live account
    async fn soft_delete(&self, id: Uuid) -> RepositoryResult<()>;
}

/// Refresh session persistence, keyed by the hashed session id
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a new session; a hash collision fails with `Duplicate`
    async fn create(&self, new_session: &NewRefreshSession) -> RepositoryResult<RefreshSession>;

    /// Find a live session, owned by a live account, by hash
    async fn find_by_hash(&self, token_hash: &str) -> RepositoryResult<RefreshSession>;

    /// Atomically replace the hash and expiry of the live, unexpired session
    /// identified by `old_hash`. Of several concurrent rotations of the same
    /// hash exactly one succeeds; the others fail with `NotFound`.
    async fn rotate(
        &self,
        old_hash: &str,
        new_hash: &str,
        new_expiry: DateTime<Utc>,
    ) -> RepositoryResult<()>;

    /// Hard-delete the session with this hash
    async fn delete_by_hash(&self, token_hash: &str) -> RepositoryResult<()>;

    /// Hard-delete the session with this id
    async fn delete_by_id(&self, id: Uuid) -> RepositoryResult<()>;

    /// Hard-delete every session of an owner, returning how many were removed
    async fn delete_by_owner(&self, owner_id: Uuid) -> RepositoryResult<u64>;

    /// Hard-delete every session that expired at or before `now`, whatever the
    /// state of its owner. Removing nothing is not an error.
    async fn delete_expired(&self, now: DateTime<Utc>) -> RepositoryResult<u64>;
}

/// Run a store call under a deadline; an elapsed deadline drops the call
/// (rolling back any open transaction) and reports `Timeout`.
pub async fn with_deadline<T>(
    deadline: std::time::Duration,
    call: impl std::future::Future<Output = RepositoryResult<T>>,
) -> RepositoryResult<T> {
    tokio::time::timeout(deadline, call)
        .await
        .unwrap_or(Err(RepositoryError::Timeout))
}
