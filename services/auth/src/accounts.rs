//! Account management on top of the credential store

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{AuthError, AuthResult};
use crate::models::{Account, NewAccount, Role};
use crate::password::hash_password;
use crate::repositories::{AccountStore, RepositoryError, RepositoryResult, with_deadline};
use crate::session::SessionManager;
use crate::validation::{validate_email, validate_password};

/// Account service
#[derive(Clone)]
pub struct AccountService {
    accounts: Arc<dyn AccountStore>,
    session_manager: SessionManager,
    store_timeout: Duration,
}

/// Fold a lookup or mutation failure into the account error kinds
fn account_error(context: &str, err: RepositoryError) -> AuthError {
    match err {
        RepositoryError::NotFound => AuthError::AccountNotFound,
        RepositoryError::Duplicate(_) => AuthError::EmailAlreadyExists,
        e => AuthError::storage(context, e),
    }
}

impl AccountService {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        session_manager: SessionManager,
        store_timeout: Duration,
    ) -> Self {
        Self {
            accounts,
            session_manager,
            store_timeout,
        }
    }

    async fn bounded<T>(
        &self,
        call: impl std::future::Future<Output = RepositoryResult<T>>,
    ) -> RepositoryResult<T> {
        with_deadline(self.store_timeout, call).await
    }

    /// Self-service registration; new accounts always get the `user` role
    pub async fn register(&self, email: &str, password: &str) -> AuthResult<Account> {
        self.create_with_role(email, password, Role::User).await
    }

    /// Create an account with an explicit role
    pub async fn create_with_role(
        &self,
        email: &str,
        password: &str,
        role: Role,
    ) -> AuthResult<Account> {
        validate_email(email).map_err(AuthError::Validation)?;
        validate_password(password).map_err(AuthError::Validation)?;

        let new_account = NewAccount {
            email: email.to_string(),
            password_hash: hash_password(password)?,
            role,
        };

        let account = self
            .bounded(self.accounts.create(&new_account))
            .await
            .map_err(|e| account_error("Failed to create account", e))?;

        info!(account_id = %account.id, role = %account.role, "Account created");
        Ok(account)
    }

    pub async fn find_by_id(&self, id: Uuid) -> AuthResult<Account> {
        self.bounded(self.accounts.find_by_id(id))
            .await
            .map_err(|e| account_error("Failed to load account", e))
    }

    pub async fn find_by_email(&self, email: &str) -> AuthResult<Account> {
        self.bounded(self.accounts.find_by_email(email))
            .await
            .map_err(|e| account_error("Failed to load account", e))
    }

    pub async fn update_email(&self, id: Uuid, email: &str) -> AuthResult<()> {
        validate_email(email).map_err(AuthError::Validation)?;

        self.bounded(self.accounts.update_email(id, email))
            .await
            .map_err(|e| account_error("Failed to update email", e))?;

        info!(account_id = %id, "Email updated");
        Ok(())
    }

    /// Replace the password. Existing refresh sessions stay valid.
    pub async fn update_password(&self, id: Uuid, password: &str) -> AuthResult<()> {
        validate_password(password).map_err(AuthError::Validation)?;
        let password_hash = hash_password(password)?;

        self.bounded(self.accounts.update_password_hash(id, &password_hash))
            .await
            .map_err(|e| account_error("Failed to update password", e))?;

        info!(account_id = %id, "Password updated");
        Ok(())
    }

    /// Revoke every session of the account, then tombstone it
    pub async fn delete(&self, id: Uuid) -> AuthResult<()> {
        // Fail early on unknown ids so nothing is revoked for them
        self.find_by_id(id).await?;

        let revoked = self.session_manager.revoke_all(id).await?;

        self.bounded(self.accounts.soft_delete(id))
            .await
            .map_err(|e| account_error("Failed to delete account", e))?;

        info!(account_id = %id, revoked, "Account deleted");
        Ok(())
    }

    /// Seed the admin account unless a live account already holds the email.
    ///
    /// Returns `None` when the email belongs to a deleted account: emails are
    /// never reused, so no admin can be seeded under it.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> AuthResult<Option<Account>> {
        match self.find_by_email(email).await {
            Ok(account) => {
                if account.role != Role::Admin {
                    warn!(account_id = %account.id, "Admin email belongs to a non-admin account");
                }
                Ok(Some(account))
            }
            Err(AuthError::AccountNotFound) => {
                match self.create_with_role(email, password, Role::Admin).await {
                    Ok(account) => {
                        info!(account_id = %account.id, "Seeded admin account");
                        Ok(Some(account))
                    }
                    Err(AuthError::EmailAlreadyExists) => {
                        warn!("Admin email belongs to a deleted account, skipping admin seeding");
                        Ok(None)
                    }
                    Err(e) => {
                        error!("Failed to seed admin account: {}", e);
                        Err(e)
                    }
                }
            }
            Err(e) => {
                error!("Failed to seed admin account: {}", e);
                Err(e)
            }
        }
    }
}
