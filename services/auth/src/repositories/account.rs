//! Account repository backed by PostgreSQL

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::DatabaseError;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use super::{AccountStore, RepositoryError, RepositoryResult};
use crate::models::{Account, NewAccount, Role};

const ACCOUNT_COLUMNS: &str =
    "id, email, password_hash, role, last_seen, created_at, updated_at, deleted_at";

/// Account repository
#[derive(Clone)]
pub struct PgAccountRepository {
    pool: PgPool,
}

impl PgAccountRepository {
    /// Create a new account repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn account_from_row(row: &PgRow) -> RepositoryResult<Account> {
    let role: String = row.try_get("role")?;
    let role = role
        .parse::<Role>()
        .map_err(|e| DatabaseError::Query(sqlx::Error::Decode(Box::new(e))))?;

    Ok(Account {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        role,
        last_seen: row.try_get("last_seen")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        deleted_at: row.try_get("deleted_at")?,
    })
}

/// Turn an UPDATE's affected row count into NotFound when nothing matched
fn expect_one(rows_affected: u64) -> RepositoryResult<()> {
    if rows_affected == 0 {
        Err(RepositoryError::NotFound)
    } else {
        Ok(())
    }
}

#[async_trait]
impl AccountStore for PgAccountRepository {
    async fn create(&self, new_account: &NewAccount) -> RepositoryResult<Account> {
        info!("Creating account with role {}", new_account.role);

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO accounts (id, email, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new_account.email)
        .bind(&new_account.password_hash)
        .bind(new_account.role.as_str())
        .fetch_one(&self.pool)
        .await?;

        account_from_row(&row)
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Account> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {ACCOUNT_COLUMNS}
            FROM accounts
            WHERE email = $1 AND deleted_at IS NULL
            "#
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => account_from_row(&row),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Account> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {ACCOUNT_COLUMNS}
            FROM accounts
            WHERE id = $1 AND deleted_at IS NULL
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => account_from_row(&row),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn update_email(&self, id: Uuid, email: &str) -> RepositoryResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET email = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(email)
        .execute(&self.pool)
        .await?;

        expect_one(result.rows_affected())
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> RepositoryResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET password_hash = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;

        expect_one(result.rows_affected())
    }

    async fn touch_last_seen(&self, id: Uuid, at: DateTime<Utc>) -> RepositoryResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET last_seen = $2
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        expect_one(result.rows_affected())
    }

    async fn soft_delete(&self, id: Uuid) -> RepositoryResult<()> {
        info!("Soft-deleting account: {}", id);

        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET deleted_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        expect_one(result.rows_affected())
    }
}
