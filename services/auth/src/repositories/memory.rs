//! In-memory account and session stores
//!
//! Mirrors the PostgreSQL schema constraints: emails and session hashes are
//! unique, lookups skip tombstoned accounts, and every mutation happens under
//! one lock so a rotation is atomic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{AccountStore, RepositoryError, RepositoryResult, SessionStore};
use crate::models::{Account, NewAccount, NewRefreshSession, RefreshSession};

#[derive(Debug, Default)]
struct MemoryState {
    accounts: HashMap<Uuid, Account>,
    sessions: HashMap<Uuid, RefreshSession>,
}

impl MemoryState {
    fn live_account(&self, id: Uuid) -> Option<&Account> {
        self.accounts.get(&id).filter(|a| a.deleted_at.is_none())
    }

    fn live_account_mut(&mut self, id: Uuid) -> RepositoryResult<&mut Account> {
        self.accounts
            .get_mut(&id)
            .filter(|a| a.deleted_at.is_none())
            .ok_or(RepositoryError::NotFound)
    }

    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.accounts
            .values()
            .any(|a| a.email == email && Some(a.id) != except)
    }

    fn hash_taken(&self, token_hash: &str) -> bool {
        self.sessions.values().any(|s| s.token_hash == token_hash)
    }

    fn live_session_ids(&self, matches: impl Fn(&RefreshSession) -> bool) -> Vec<Uuid> {
        self.sessions
            .values()
            .filter(|s| matches(s) && self.live_account(s.owner_id).is_some())
            .map(|s| s.id)
            .collect()
    }

    fn remove_sessions(&mut self, ids: Vec<Uuid>) -> RepositoryResult<u64> {
        if ids.is_empty() {
            return Err(RepositoryError::NotFound);
        }
        for id in &ids {
            self.sessions.remove(id);
        }
        Ok(ids.len() as u64)
    }
}

/// Account and session store held in process memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of session rows currently stored, owned by live accounts or not
    pub async fn session_count(&self) -> usize {
        self.state.lock().await.sessions.len()
    }

    /// Sessions currently stored for an owner
    pub async fn sessions_of(&self, owner_id: Uuid) -> Vec<RefreshSession> {
        self.state
            .lock()
            .await
            .sessions
            .values()
            .filter(|s| s.owner_id == owner_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn create(&self, new_account: &NewAccount) -> RepositoryResult<Account> {
        let mut state = self.state.lock().await;
        if state.email_taken(&new_account.email, None) {
            return Err(RepositoryError::Duplicate("accounts_email_key".to_string()));
        }

        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            email: new_account.email.clone(),
            password_hash: new_account.password_hash.clone(),
            role: new_account.role,
            last_seen: now,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        state.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Account> {
        let state = self.state.lock().await;
        state
            .accounts
            .values()
            .find(|a| a.email == email && a.deleted_at.is_none())
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Account> {
        let state = self.state.lock().await;
        state.live_account(id).cloned().ok_or(RepositoryError::NotFound)
    }

    async fn update_email(&self, id: Uuid, email: &str) -> RepositoryResult<()> {
        let mut state = self.state.lock().await;
        state.live_account_mut(id)?;
        if state.email_taken(email, Some(id)) {
            return Err(RepositoryError::Duplicate("accounts_email_key".to_string()));
        }

        let account = state.live_account_mut(id)?;
        account.email = email.to_string();
        account.updated_at = Utc::now();
        Ok(())
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> RepositoryResult<()> {
        let mut state = self.state.lock().await;
        let account = state.live_account_mut(id)?;
        account.password_hash = password_hash.to_string();
        account.updated_at = Utc::now();
        Ok(())
    }

    async fn touch_last_seen(&self, id: Uuid, at: DateTime<Utc>) -> RepositoryResult<()> {
        let mut state = self.state.lock().await;
        state.live_account_mut(id)?.last_seen = at;
        Ok(())
    }

    async fn soft_delete(&self, id: Uuid) -> RepositoryResult<()> {
        let mut state = self.state.lock().await;
        let account = state.live_account_mut(id)?;
        let now = Utc::now();
        account.deleted_at = Some(now);
        account.updated_at = now;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create(&self, new_session: &NewRefreshSession) -> RepositoryResult<RefreshSession> {
        let mut state = self.state.lock().await;
        if !state.accounts.contains_key(&new_session.owner_id) {
            return Err(RepositoryError::NotFound);
        }
        if state.hash_taken(&new_session.token_hash) {
            return Err(RepositoryError::Duplicate(
                "refresh_sessions_token_hash_key".to_string(),
            ));
        }

        let now = Utc::now();
        let session = RefreshSession {
            id: Uuid::new_v4(),
            owner_id: new_session.owner_id,
            token_hash: new_session.token_hash.clone(),
            expires_at: new_session.expires_at,
            created_at: now,
            updated_at: now,
        };
        state.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn find_by_hash(&self, token_hash: &str) -> RepositoryResult<RefreshSession> {
        let state = self.state.lock().await;
        state
            .live_session_ids(|s| s.token_hash == token_hash)
            .first()
            .and_then(|id| state.sessions.get(id))
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn rotate(
        &self,
        old_hash: &str,
        new_hash: &str,
        new_expiry: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let id = state
            .live_session_ids(|s| s.token_hash == old_hash && !s.is_expired_at(now))
            .first()
            .copied()
            .ok_or(RepositoryError::NotFound)?;

        if state.hash_taken(new_hash) {
            return Err(RepositoryError::Duplicate(
                "refresh_sessions_token_hash_key".to_string(),
            ));
        }

        let session = state.sessions.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        session.token_hash = new_hash.to_string();
        session.expires_at = new_expiry;
        session.updated_at = now;
        Ok(())
    }

    async fn delete_by_hash(&self, token_hash: &str) -> RepositoryResult<()> {
        let mut state = self.state.lock().await;
        let ids = state.live_session_ids(|s| s.token_hash == token_hash);
        state.remove_sessions(ids).map(|_| ())
    }

    async fn delete_by_id(&self, id: Uuid) -> RepositoryResult<()> {
        let mut state = self.state.lock().await;
        let ids = state.live_session_ids(|s| s.id == id);
        state.remove_sessions(ids).map(|_| ())
    }

    async fn delete_by_owner(&self, owner_id: Uuid) -> RepositoryResult<u64> {
        let mut state = self.state.lock().await;
        let ids = state.live_session_ids(|s| s.owner_id == owner_id);
        state.remove_sessions(ids)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> RepositoryResult<u64> {
        let mut state = self.state.lock().await;
        let before = state.sessions.len();
        state.sessions.retain(|_, s| !s.is_expired_at(now));
        Ok((before - state.sessions.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use chrono::Duration;

    async fn account(store: &MemoryStore, email: &str) -> Account {
        AccountStore::create(
            store,
            &NewAccount {
                email: email.to_string(),
                password_hash: "hash".to_string(),
                role: Role::User,
            },
        )
        .await
        .unwrap()
    }

    async fn session(store: &MemoryStore, owner_id: Uuid, hash: &str) -> RefreshSession {
        SessionStore::create(
            store,
            &NewRefreshSession {
                owner_id,
                token_hash: hash.to_string(),
                expires_at: Utc::now() + Duration::hours(1),
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_email_is_unique_and_case_sensitive() {
        let store = MemoryStore::new();
        account(&store, "a@x.com").await;

        let duplicate = AccountStore::create(
            &store,
            &NewAccount {
                email: "a@x.com".to_string(),
                password_hash: "hash".to_string(),
                role: Role::User,
            },
        )
        .await;
        assert!(matches!(duplicate, Err(RepositoryError::Duplicate(_))));

        account(&store, "A@x.com").await;
        assert!(store.find_by_email("a@X.com").await.is_err());
    }

    #[tokio::test]
    async fn test_soft_deleted_account_is_invisible() {
        let store = MemoryStore::new();
        let owner = account(&store, "a@x.com").await;
        session(&store, owner.id, "h1").await;

        store.soft_delete(owner.id).await.unwrap();

        assert!(matches!(
            store.find_by_id(owner.id).await,
            Err(RepositoryError::NotFound)
        ));
        assert!(matches!(
            store.find_by_email("a@x.com").await,
            Err(RepositoryError::NotFound)
        ));
        assert!(matches!(
            store.find_by_hash("h1").await,
            Err(RepositoryError::NotFound)
        ));
        assert!(matches!(
            store.rotate("h1", "h2", Utc::now() + Duration::hours(1)).await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_session_hash_is_unique() {
        let store = MemoryStore::new();
        let owner = account(&store, "a@x.com").await;
        session(&store, owner.id, "h1").await;

        let duplicate = SessionStore::create(
            &store,
            &NewRefreshSession {
                owner_id: owner.id,
                token_hash: "h1".to_string(),
                expires_at: Utc::now() + Duration::hours(1),
            },
        )
        .await;
        assert!(matches!(duplicate, Err(RepositoryError::Duplicate(_))));
    }

    #[tokio::test]
    async fn test_rotate_replaces_hash_in_place() {
        let store = MemoryStore::new();
        let owner = account(&store, "a@x.com").await;
        let original = session(&store, owner.id, "h1").await;
        let new_expiry = Utc::now() + Duration::hours(2);

        store.rotate("h1", "h2", new_expiry).await.unwrap();

        assert!(store.find_by_hash("h1").await.is_err());
        let rotated = store.find_by_hash("h2").await.unwrap();
        assert_eq!(rotated.id, original.id);
        assert_eq!(rotated.expires_at, new_expiry);
        assert_eq!(store.session_count().await, 1);

        assert!(matches!(
            store.rotate("h1", "h3", new_expiry).await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_rotate_rejects_expired_session() {
        let store = MemoryStore::new();
        let owner = account(&store, "a@x.com").await;
        SessionStore::create(
            &store,
            &NewRefreshSession {
                owner_id: owner.id,
                token_hash: "old".to_string(),
                expires_at: Utc::now() - Duration::minutes(1),
            },
        )
        .await
        .unwrap();

        let result = store
            .rotate("old", "new", Utc::now() + Duration::hours(1))
            .await;
        assert!(matches!(result, Err(RepositoryError::NotFound)));
    }

    #[tokio::test]
    async fn test_deletes_report_not_found_when_nothing_matched() {
        let store = MemoryStore::new();
        let owner = account(&store, "a@x.com").await;
        let first = session(&store, owner.id, "h1").await;
        session(&store, owner.id, "h2").await;
        session(&store, owner.id, "h3").await;

        store.delete_by_id(first.id).await.unwrap();
        assert!(matches!(
            store.delete_by_id(first.id).await,
            Err(RepositoryError::NotFound)
        ));

        store.delete_by_hash("h2").await.unwrap();
        assert!(matches!(
            store.delete_by_hash("h2").await,
            Err(RepositoryError::NotFound)
        ));

        assert_eq!(store.delete_by_owner(owner.id).await.unwrap(), 1);
        assert!(matches!(
            store.delete_by_owner(owner.id).await,
            Err(RepositoryError::NotFound)
        ));
        assert_eq!(store.session_count().await, 0);
    }
}
