//! Refresh session lifecycle: login, refresh-token rotation and logout
//!
//! Every successful login opens one refresh session; every successful refresh
//! rotates it in place, so a refresh token is usable exactly once. The store's
//! transaction isolation is the only concurrency control: the manager holds no
//! locks and keeps no session state between calls.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::error::{AuthError, AuthResult};
use crate::jwt::{JwtService, TokenError, hash_session_id, new_session_id};
use crate::last_seen::spawn_last_seen_update;
use crate::models::{Account, NewRefreshSession};
use crate::password::{dummy_password_hash, verify_password};
use crate::repositories::{
    AccountStore, RepositoryError, RepositoryResult, SessionStore, with_deadline,
};

/// Access and refresh token issued together
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Session manager orchestrating the token codec and the stores
#[derive(Clone)]
pub struct SessionManager {
    accounts: Arc<dyn AccountStore>,
    sessions: Arc<dyn SessionStore>,
    jwt_service: JwtService,
    config: SessionConfig,
}

fn signing_failure(err: TokenError) -> AuthError {
    error!("Failed to issue token: {}", err);
    AuthError::Internal
}

impl SessionManager {
    /// Create a new session manager
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        sessions: Arc<dyn SessionStore>,
        jwt_service: JwtService,
        config: SessionConfig,
    ) -> Self {
        Self {
            accounts,
            sessions,
            jwt_service,
            config,
        }
    }

    /// The token codec used by this manager
    pub fn jwt_service(&self) -> &JwtService {
        &self.jwt_service
    }

    async fn bounded<T>(
        &self,
        call: impl std::future::Future<Output = RepositoryResult<T>>,
    ) -> RepositoryResult<T> {
        with_deadline(self.config.store_timeout, call).await
    }

    fn issue_access_token(&self, account: &Account) -> AuthResult<String> {
        self.jwt_service
            .generate_access_token(account.id, account.role)
            .map_err(signing_failure)
    }

    /// Authenticate with email and password and open a new refresh session
    pub async fn login(&self, email: &str, password: &str) -> AuthResult<TokenPair> {
        let account = match self.bounded(self.accounts.find_by_email(email)).await {
            Ok(account) => account,
            Err(RepositoryError::NotFound) => {
                // Same Argon2 cost as a wrong password
                verify_password(password, dummy_password_hash());
                warn!("Login rejected: no live account for the given email");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => return Err(AuthError::storage("Failed to load account for login", e)),
        };

        if !verify_password(password, &account.password_hash) {
            warn!(account_id = %account.id, "Login rejected: password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let access_token = self.issue_access_token(&account)?;
        let refresh_token = self.open_session(account.id).await?;

        spawn_last_seen_update(self.accounts.clone(), account.id, self.config.last_seen);

        info!(account_id = %account.id, "Login succeeded");
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Persist a new session under a fresh id and return its refresh token.
    /// The token is handed out only once its row is stored.
    async fn open_session(&self, owner_id: Uuid) -> AuthResult<String> {
        for attempt in 1..=self.config.create_attempts {
            let jti = new_session_id();
            let refresh_token = self
                .jwt_service
                .generate_refresh_token(owner_id, &jti)
                .map_err(signing_failure)?;
            let new_session = NewRefreshSession {
                owner_id,
                token_hash: hash_session_id(&jti),
                expires_at: Utc::now() + self.jwt_service.refresh_token_ttl(),
            };

            match self.bounded(self.sessions.create(&new_session)).await {
                Ok(_) => return Ok(refresh_token),
                Err(RepositoryError::Duplicate(constraint)) => {
                    warn!(attempt, %constraint, "Session id collision, retrying with a fresh id");
                }
                Err(e) => return Err(AuthError::storage("Failed to create refresh session", e)),
            }
        }

        error!(
            "Could not persist a refresh session after {} attempts",
            self.config.create_attempts
        );
        Err(AuthError::StorageUnavailable)
    }

    /// Exchange a refresh token for a new token pair, rotating its session.
    ///
    /// The presented token is consumed: presenting it again fails with
    /// `InvalidRefreshToken`. Of concurrent refreshes with the same token
    /// exactly one succeeds.
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<TokenPair> {
        let claims = self
            .jwt_service
            .validate_refresh_token(refresh_token)
            .map_err(|e| {
                warn!("Refresh rejected: {}", e);
                AuthError::InvalidRefreshToken
            })?;
        let old_hash = hash_session_id(&claims.jti);

        let session = match self.bounded(self.sessions.find_by_hash(&old_hash)).await {
            Ok(session) => session,
            Err(RepositoryError::NotFound) => {
                warn!(account_id = %claims.sub, "Refresh rejected: unknown or revoked session");
                return Err(AuthError::InvalidRefreshToken);
            }
            Err(e) => return Err(AuthError::storage("Failed to load refresh session", e)),
        };

        if session.owner_id != claims.sub {
            warn!(session_id = %session.id, "Refresh rejected: token subject does not own the session");
            return Err(AuthError::InvalidRefreshToken);
        }

        // The row's expiry is authoritative over the token's embedded one.
        if session.is_expired_at(Utc::now()) {
            match self.bounded(self.sessions.delete_by_hash(&old_hash)).await {
                Ok(()) | Err(RepositoryError::NotFound) => {}
                Err(e) => error!(session_id = %session.id, "Failed to delete expired session: {}", e),
            }
            warn!(session_id = %session.id, "Refresh rejected: session expired");
            return Err(AuthError::InvalidRefreshToken);
        }

        let account = match self.bounded(self.accounts.find_by_id(session.owner_id)).await {
            Ok(account) => account,
            Err(RepositoryError::NotFound) => {
                warn!(session_id = %session.id, "Refresh rejected: owning account is gone");
                return Err(AuthError::InvalidRefreshToken);
            }
            Err(e) => return Err(AuthError::storage("Failed to load account for refresh", e)),
        };

        let access_token = self.issue_access_token(&account)?;
        let refresh_token = self.rotate_session(account.id, &old_hash).await?;

        info!(account_id = %account.id, session_id = %session.id, "Refresh token rotated");
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Atomically move the session stored under `old_hash` to a fresh id
    async fn rotate_session(&self, owner_id: Uuid, old_hash: &str) -> AuthResult<String> {
        for attempt in 1..=self.config.create_attempts {
            let jti = new_session_id();
            let refresh_token = self
                .jwt_service
                .generate_refresh_token(owner_id, &jti)
                .map_err(signing_failure)?;
            let new_hash = hash_session_id(&jti);
            let new_expiry = Utc::now() + self.jwt_service.refresh_token_ttl();

            let call = self.sessions.rotate(old_hash, &new_hash, new_expiry);
            match self.bounded(call).await {
                Ok(()) => return Ok(refresh_token),
                Err(RepositoryError::NotFound) => {
                    warn!(%owner_id, "Refresh rejected: session already rotated or revoked");
                    return Err(AuthError::InvalidRefreshToken);
                }
                Err(RepositoryError::Duplicate(constraint)) => {
                    warn!(attempt, %constraint, "Session id collision on rotation, retrying");
                }
                Err(e) => return Err(AuthError::storage("Failed to rotate refresh session", e)),
            }
        }

        error!(
            "Could not rotate refresh session after {} attempts",
            self.config.create_attempts
        );
        Err(AuthError::StorageUnavailable)
    }

    /// Revoke the session backing a refresh token
    pub async fn logout(&self, refresh_token: &str) -> AuthResult<()> {
        let claims = self
            .jwt_service
            .validate_refresh_token(refresh_token)
            .map_err(|e| {
                warn!("Logout rejected: {}", e);
                AuthError::InvalidRefreshToken
            })?;

        let token_hash = hash_session_id(&claims.jti);
        match self.bounded(self.sessions.delete_by_hash(&token_hash)).await {
            Ok(()) => {
                info!(account_id = %claims.sub, "Logged out");
                Ok(())
            }
            Err(RepositoryError::NotFound) => {
                warn!(account_id = %claims.sub, "Logout rejected: session already invalidated");
                Err(AuthError::InvalidRefreshToken)
            }
            Err(e) => Err(AuthError::storage("Failed to delete refresh session", e)),
        }
    }

    /// Revoke every refresh session of an account, returning how many were removed
    pub async fn revoke_all(&self, owner_id: Uuid) -> AuthResult<u64> {
        match self.bounded(self.sessions.delete_by_owner(owner_id)).await {
            Ok(count) => {
                info!(account_id = %owner_id, "Revoked {} refresh sessions", count);
                Ok(count)
            }
            Err(RepositoryError::NotFound) => Ok(0),
            Err(e) => Err(AuthError::storage("Failed to revoke refresh sessions", e)),
        }
    }

    /// Delete every expired refresh session, returning how many were removed.
    /// Sessions abandoned without a logout otherwise stay stored forever.
    pub async fn purge_expired(&self) -> AuthResult<u64> {
        match self.bounded(self.sessions.delete_expired(Utc::now())).await {
            Ok(count) => {
                if count > 0 {
                    info!("Purged {} expired refresh sessions", count);
                }
                Ok(count)
            }
            Err(e) => Err(AuthError::storage("Failed to purge expired refresh sessions", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::JwtConfig;
    use crate::models::{NewAccount, RefreshSession, Role};
    use crate::password::hash_password;
    use crate::repositories::MemoryStore;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn jwt_service() -> JwtService {
        JwtService::new(JwtConfig {
            access_secret: "access-secret-access-secret-0123456789".to_string(),
            refresh_secret: "refresh-secret-refresh-secret-0123456789".to_string(),
            access_token_expiry: 900,
            refresh_token_expiry: 86400,
        })
        .unwrap()
    }

    fn manager_over(store: &MemoryStore, sessions: Arc<dyn SessionStore>) -> SessionManager {
        SessionManager::new(
            Arc::new(store.clone()),
            sessions,
            jwt_service(),
            SessionConfig::default(),
        )
    }

    async fn setup(role: Role) -> (SessionManager, MemoryStore, Account) {
        let store = MemoryStore::new();
        let account = AccountStore::create(
            &store,
            &NewAccount {
                email: "a@x.com".to_string(),
                password_hash: hash_password("Passw0rd!").unwrap(),
                role,
            },
        )
        .await
        .unwrap();
        let manager = manager_over(&store, Arc::new(store.clone()));
        (manager, store, account)
    }

    #[tokio::test]
    async fn test_login_refresh_scenario() {
        let (manager, store, account) = setup(Role::User).await;

        let first = manager.login("a@x.com", "Passw0rd!").await.unwrap();
        let second = manager.refresh(&first.refresh_token).await.unwrap();

        assert_ne!(second.refresh_token, first.refresh_token);
        assert_eq!(
            manager.refresh(&first.refresh_token).await,
            Err(AuthError::InvalidRefreshToken)
        );
        assert_eq!(store.sessions_of(account.id).await.len(), 1);
    }

    #[tokio::test]
    async fn test_repeated_refresh_keeps_identity_and_one_live_row() {
        let (manager, store, account) = setup(Role::Admin).await;
        let mut pair = manager.login("a@x.com", "Passw0rd!").await.unwrap();

        for _ in 0..5 {
            pair = manager.refresh(&pair.refresh_token).await.unwrap();

            let claims = manager
                .jwt_service()
                .validate_access_token(&pair.access_token)
                .unwrap();
            assert_eq!(claims.sub, account.id);
            assert_eq!(claims.role, Role::Admin);
            assert_eq!(store.sessions_of(account.id).await.len(), 1);
        }
    }

    #[tokio::test]
    async fn test_login_records_last_seen_in_the_background() {
        let (manager, store, account) = setup(Role::User).await;
        let stale = Utc::now() - Duration::days(1);
        store.touch_last_seen(account.id, stale).await.unwrap();

        manager.login("a@x.com", "Passw0rd!").await.unwrap();

        let mut last_seen = stale;
        for _ in 0..100 {
            last_seen = store.find_by_id(account.id).await.unwrap().last_seen;
            if last_seen > stale {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(last_seen > stale + Duration::hours(23));
    }

    #[tokio::test]
    async fn test_refresh_token_is_single_use() {
        let (manager, _, _) = setup(Role::User).await;
        let pair = manager.login("a@x.com", "Passw0rd!").await.unwrap();

        let next = manager.refresh(&pair.refresh_token).await.unwrap();

        assert_eq!(
            manager.refresh(&pair.refresh_token).await,
            Err(AuthError::InvalidRefreshToken)
        );
        // The replay attempt does not disturb the rotated session
        assert!(manager.refresh(&next.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_login_stores_only_the_session_id_hash() {
        let (manager, store, account) = setup(Role::User).await;
        let pair = manager.login("a@x.com", "Passw0rd!").await.unwrap();

        let claims = manager
            .jwt_service()
            .validate_refresh_token(&pair.refresh_token)
            .unwrap();
        let sessions = store.sessions_of(account.id).await;

        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].token_hash, hash_session_id(&claims.jti));
        assert_ne!(sessions[0].token_hash, claims.jti);
        assert_ne!(sessions[0].token_hash, pair.refresh_token);
    }

    #[tokio::test]
    async fn test_expired_row_is_rejected_and_deleted() {
        let (manager, store, account) = setup(Role::User).await;
        let jti = new_session_id();
        let token_hash = hash_session_id(&jti);
        SessionStore::create(
            &store,
            &NewRefreshSession {
                owner_id: account.id,
                token_hash: token_hash.clone(),
                expires_at: Utc::now() - Duration::minutes(5),
            },
        )
        .await
        .unwrap();
        let token = manager
            .jwt_service()
            .generate_refresh_token(account.id, &jti)
            .unwrap();

        assert_eq!(
            manager.refresh(&token).await,
            Err(AuthError::InvalidRefreshToken)
        );
        assert!(matches!(
            store.find_by_hash(&token_hash).await,
            Err(RepositoryError::NotFound)
        ));
        assert_eq!(
            manager.refresh(&token).await,
            Err(AuthError::InvalidRefreshToken)
        );
    }

    #[tokio::test]
    async fn test_logout() {
        let (manager, store, account) = setup(Role::User).await;
        let never_issued = manager
            .jwt_service()
            .generate_refresh_token(account.id, &new_session_id())
            .unwrap();
        assert_eq!(
            manager.logout(&never_issued).await,
            Err(AuthError::InvalidRefreshToken)
        );

        let pair = manager.login("a@x.com", "Passw0rd!").await.unwrap();
        manager.logout(&pair.refresh_token).await.unwrap();
        assert!(store.sessions_of(account.id).await.is_empty());

        assert_eq!(
            manager.logout(&pair.refresh_token).await,
            Err(AuthError::InvalidRefreshToken)
        );
        assert_eq!(
            manager.refresh(&pair.refresh_token).await,
            Err(AuthError::InvalidRefreshToken)
        );
        assert_eq!(
            manager.logout("not-a-token").await,
            Err(AuthError::InvalidRefreshToken)
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_refresh_has_exactly_one_winner() {
        let (manager, store, account) = setup(Role::User).await;

        for _ in 0..10 {
            let pair = manager.login("a@x.com", "Passw0rd!").await.unwrap();
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let manager = manager.clone();
                    let token = pair.refresh_token.clone();
                    tokio::spawn(async move { manager.refresh(&token).await })
                })
                .collect();

            let mut successes = 0;
            for handle in handles {
                match handle.await.unwrap() {
                    Ok(_) => successes += 1,
                    Err(err) => assert_eq!(err, AuthError::InvalidRefreshToken),
                }
            }
            assert_eq!(successes, 1);
        }

        // One lineage per login, never forked by the races
        assert_eq!(store.sessions_of(account.id).await.len(), 10);
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let (manager, _, _) = setup(Role::User).await;

        assert_eq!(
            manager.login("nobody@x.com", "Passw0rd!").await,
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            manager.login("a@x.com", "wrong-Passw0rd!").await,
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            manager.login("A@x.com", "Passw0rd!").await,
            Err(AuthError::InvalidCredentials)
        );
    }

    #[tokio::test]
    async fn test_unknown_email_pays_for_a_password_verification() {
        let (manager, _, _) = setup(Role::User).await;
        // Initialise the placeholder hash outside the measurement
        let placeholder = dummy_password_hash();

        let started = std::time::Instant::now();
        assert!(!verify_password("Passw0rd!", placeholder));
        let one_verification = started.elapsed();

        let started = std::time::Instant::now();
        assert_eq!(
            manager.login("nobody@x.com", "Passw0rd!").await,
            Err(AuthError::InvalidCredentials)
        );
        let unknown_email = started.elapsed();

        assert!(unknown_email * 2 >= one_verification);
    }

    #[tokio::test]
    async fn test_soft_deleted_owner_cannot_login_or_refresh() {
        let (manager, store, account) = setup(Role::User).await;
        let pair = manager.login("a@x.com", "Passw0rd!").await.unwrap();

        store.soft_delete(account.id).await.unwrap();

        assert_eq!(
            manager.refresh(&pair.refresh_token).await,
            Err(AuthError::InvalidRefreshToken)
        );
        assert_eq!(
            manager.login("a@x.com", "Passw0rd!").await,
            Err(AuthError::InvalidCredentials)
        );
    }

    #[tokio::test]
    async fn test_foreign_or_tampered_refresh_tokens_are_rejected() {
        let (manager, _, _) = setup(Role::User).await;
        let pair = manager.login("a@x.com", "Passw0rd!").await.unwrap();

        // Access tokens are signed with the other secret
        assert_eq!(
            manager.refresh(&pair.access_token).await,
            Err(AuthError::InvalidRefreshToken)
        );

        let mut tampered = pair.refresh_token.clone();
        tampered.push('x');
        assert_eq!(
            manager.refresh(&tampered).await,
            Err(AuthError::InvalidRefreshToken)
        );

        // Same session id, different subject
        let claims = manager
            .jwt_service()
            .validate_refresh_token(&pair.refresh_token)
            .unwrap();
        let forged = manager
            .jwt_service()
            .generate_refresh_token(Uuid::new_v4(), &claims.jti)
            .unwrap();
        assert_eq!(
            manager.refresh(&forged).await,
            Err(AuthError::InvalidRefreshToken)
        );
        assert!(manager.refresh(&pair.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_revoke_all() {
        let (manager, store, account) = setup(Role::User).await;
        let first = manager.login("a@x.com", "Passw0rd!").await.unwrap();
        let second = manager.login("a@x.com", "Passw0rd!").await.unwrap();

        assert_eq!(manager.revoke_all(account.id).await.unwrap(), 2);
        assert_eq!(manager.revoke_all(account.id).await.unwrap(), 0);
        assert_eq!(store.session_count().await, 0);
        for token in [first.refresh_token, second.refresh_token] {
            assert_eq!(
                manager.refresh(&token).await,
                Err(AuthError::InvalidRefreshToken)
            );
        }
    }

    /// Session store that reports hash collisions on its first `create` calls
    struct CollidingSessions {
        inner: MemoryStore,
        collisions_left: AtomicU32,
        creates: AtomicU32,
    }

    #[async_trait]
    impl SessionStore for CollidingSessions {
        async fn create(&self, new_session: &NewRefreshSession) -> RepositoryResult<RefreshSession> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            if self.collisions_left.load(Ordering::SeqCst) > 0 {
                self.collisions_left.fetch_sub(1, Ordering::SeqCst);
                return Err(RepositoryError::Duplicate(
                    "refresh_sessions_token_hash_key".to_string(),
                ));
            }
            SessionStore::create(&self.inner, new_session).await
        }
        async fn find_by_hash(&self, token_hash: &str) -> RepositoryResult<RefreshSession> {
            self.inner.find_by_hash(token_hash).await
        }
        async fn rotate(
            &self,
            old_hash: &str,
            new_hash: &str,
            new_expiry: DateTime<Utc>,
        ) -> RepositoryResult<()> {
            self.inner.rotate(old_hash, new_hash, new_expiry).await
        }
        async fn delete_by_hash(&self, token_hash: &str) -> RepositoryResult<()> {
            self.inner.delete_by_hash(token_hash).await
        }
        async fn delete_by_id(&self, id: Uuid) -> RepositoryResult<()> {
            self.inner.delete_by_id(id).await
        }
        async fn delete_by_owner(&self, owner_id: Uuid) -> RepositoryResult<u64> {
            self.inner.delete_by_owner(owner_id).await
        }
        async fn delete_expired(&self, now: DateTime<Utc>) -> RepositoryResult<u64> {
            self.inner.delete_expired(now).await
        }
    }

    #[tokio::test]
    async fn test_login_retries_session_id_collisions() {
        let (_, store, account) = setup(Role::User).await;
        let sessions = Arc::new(CollidingSessions {
            inner: store.clone(),
            collisions_left: AtomicU32::new(2),
            creates: AtomicU32::new(0),
        });
        let manager = manager_over(&store, sessions.clone());

        let pair = manager.login("a@x.com", "Passw0rd!").await.unwrap();

        assert_eq!(sessions.creates.load(Ordering::SeqCst), 3);
        let claims = manager
            .jwt_service()
            .validate_refresh_token(&pair.refresh_token)
            .unwrap();
        let stored = store.sessions_of(account.id).await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].token_hash, hash_session_id(&claims.jti));
    }

    #[tokio::test]
    async fn test_login_gives_up_after_bounded_collisions() {
        let (_, store, account) = setup(Role::User).await;
        let sessions = Arc::new(CollidingSessions {
            inner: store.clone(),
            collisions_left: AtomicU32::new(u32::MAX),
            creates: AtomicU32::new(0),
        });
        let manager = manager_over(&store, sessions.clone());

        assert_eq!(
            manager.login("a@x.com", "Passw0rd!").await,
            Err(AuthError::StorageUnavailable)
        );
        assert_eq!(
            sessions.creates.load(Ordering::SeqCst),
            SessionConfig::default().create_attempts
        );
        assert!(store.sessions_of(account.id).await.is_empty());
    }

    /// Session store whose calls never complete
    struct StalledSessions;

    #[async_trait]
    impl SessionStore for StalledSessions {
        async fn create(&self, _: &NewRefreshSession) -> RepositoryResult<RefreshSession> {
            std::future::pending().await
        }
        async fn find_by_hash(&self, _: &str) -> RepositoryResult<RefreshSession> {
            std::future::pending().await
        }
        async fn rotate(&self, _: &str, _: &str, _: DateTime<Utc>) -> RepositoryResult<()> {
            std::future::pending().await
        }
        async fn delete_by_hash(&self, _: &str) -> RepositoryResult<()> {
            std::future::pending().await
        }
        async fn delete_by_id(&self, _: Uuid) -> RepositoryResult<()> {
            std::future::pending().await
        }
        async fn delete_by_owner(&self, _: Uuid) -> RepositoryResult<u64> {
            std::future::pending().await
        }
        async fn delete_expired(&self, _: DateTime<Utc>) -> RepositoryResult<u64> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_stalled_store_fails_the_request() {
        let (_, store, account) = setup(Role::User).await;
        let manager = SessionManager::new(
            Arc::new(store.clone()),
            Arc::new(StalledSessions),
            jwt_service(),
            SessionConfig {
                store_timeout: std::time::Duration::from_millis(20),
                ..SessionConfig::default()
            },
        );

        assert_eq!(
            manager.login("a@x.com", "Passw0rd!").await,
            Err(AuthError::StorageUnavailable)
        );

        let token = manager
            .jwt_service()
            .generate_refresh_token(account.id, &new_session_id())
            .unwrap();
        assert_eq!(
            manager.refresh(&token).await,
            Err(AuthError::StorageUnavailable)
        );
        assert_eq!(
            manager.logout(&token).await,
            Err(AuthError::StorageUnavailable)
        );
    }
}
