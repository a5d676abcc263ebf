//! User repository
//!
//! Database operations for users and their token lists.
//!
//! This module provides:
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait for SQLite and MySQL
//!
//! Users returned by this repository always carry their full token list,
//! oldest first.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

use super::{decode_id, no_backend};
use crate::db::{DynDatabasePool, StoreContext, StoreResult};
use crate::models::{AuthToken, DocumentId, User};

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user. A taken email is reported as
    /// [`StoreError::Duplicate`](crate::db::StoreError::Duplicate).
    async fn create(&self, user: &User) -> StoreResult<User>;

    /// Get user by ID
    async fn find_by_id(&self, id: DocumentId) -> StoreResult<Option<User>>;

    /// Get user by email
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Append a token to its user's token list
    async fn push_token(&self, token: &AuthToken) -> StoreResult<()>;

    /// Get the user holding `token` with the given access level
    async fn find_by_token(&self, token: &str, access: &str) -> StoreResult<Option<User>>;

    /// Pull one token from one user's list. Returns false if it was not there.
    async fn remove_token(&self, user_id: DocumentId, token: &str) -> StoreResult<bool>;

    /// Drop a user's expired tokens, returning how many were removed
    async fn remove_expired_tokens(&self, user_id: DocumentId) -> StoreResult<u64>;
}

/// SQLx-based user repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> StoreResult<User> {
        if let Some(pool) = self.pool.as_sqlite() {
            create_user_sqlite(pool, user).await
        } else if let Some(pool) = self.pool.as_mysql() {
            create_user_mysql(pool, user).await
        } else {
            Err(no_backend())
        }
    }

    async fn find_by_id(&self, id: DocumentId) -> StoreResult<Option<User>> {
        if let Some(pool) = self.pool.as_sqlite() {
            find_user_sqlite(pool, "id", &id.to_string()).await
        } else if let Some(pool) = self.pool.as_mysql() {
            find_user_mysql(pool, "id", &id.to_string()).await
        } else {
            Err(no_backend())
        }
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        if let Some(pool) = self.pool.as_sqlite() {
            find_user_sqlite(pool, "email", email).await
        } else if let Some(pool) = self.pool.as_mysql() {
            find_user_mysql(pool, "email", email).await
        } else {
            Err(no_backend())
        }
    }

    async fn push_token(&self, token: &AuthToken) -> StoreResult<()> {
        if let Some(pool) = self.pool.as_sqlite() {
            push_token_sqlite(pool, token).await
        } else if let Some(pool) = self.pool.as_mysql() {
            push_token_mysql(pool, token).await
        } else {
            Err(no_backend())
        }
    }

    async fn find_by_token(&self, token: &str, access: &str) -> StoreResult<Option<User>> {
        let user_id = if let Some(pool) = self.pool.as_sqlite() {
            token_owner_sqlite(pool, token, access).await?
        } else if let Some(pool) = self.pool.as_mysql() {
            token_owner_mysql(pool, token, access).await?
        } else {
            return Err(no_backend());
        };

        match user_id {
            Some(id) => self.find_by_id(id).await,
            None => Ok(None),
        }
    }

    async fn remove_token(&self, user_id: DocumentId, token: &str) -> StoreResult<bool> {
        const SQL: &str = "DELETE FROM user_tokens WHERE user_id = ? AND token = ?";

        let result = if let Some(pool) = self.pool.as_sqlite() {
            sqlx::query(SQL)
                .bind(user_id.to_string())
                .bind(token)
                .execute(pool)
                .await
                .context("Failed to remove token")?
                .rows_affected()
        } else if let Some(pool) = self.pool.as_mysql() {
            sqlx::query(SQL)
                .bind(user_id.to_string())
                .bind(token)
                .execute(pool)
                .await
                .context("Failed to remove token")?
                .rows_affected()
        } else {
            return Err(no_backend());
        };

        Ok(result > 0)
    }

    async fn remove_expired_tokens(&self, user_id: DocumentId) -> StoreResult<u64> {
        const SQL: &str = "DELETE FROM user_tokens WHERE user_id = ? AND expires_at < ?";
        let now = Utc::now();

        if let Some(pool) = self.pool.as_sqlite() {
            Ok(sqlx::query(SQL)
                .bind(user_id.to_string())
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to remove expired tokens")?
                .rows_affected())
        } else if let Some(pool) = self.pool.as_mysql() {
            Ok(sqlx::query(SQL)
                .bind(user_id.to_string())
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to remove expired tokens")?
                .rows_affected())
        } else {
            Err(no_backend())
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_user_sqlite(pool: &SqlitePool, user: &User) -> StoreResult<User> {
    sqlx::query(
        r#"
        INSERT INTO users (id, email, password_hash, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(user.id.to_string())
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(pool)
    .await
    .unique("email", "Failed to create user")?;

    for token in &user.tokens {
        push_token_sqlite(pool, token).await?;
    }

    Ok(user.clone())
}

/// `column` is always a literal from this module, never user input
async fn find_user_sqlite(
    pool: &SqlitePool,
    column: &'static str,
    value: &str,
) -> StoreResult<Option<User>> {
    let sql = format!(
        "SELECT id, email, password_hash, created_at, updated_at FROM users WHERE {} = ?",
        column
    );
    let row = sqlx::query(&sql)
        .bind(value)
        .fetch_optional(pool)
        .await
        .context("Failed to get user")?;

    let Some(row) = row else {
        return Ok(None);
    };
    let mut user = row_to_user_sqlite(&row)?;
    user.tokens = tokens_for_user_sqlite(pool, user.id).await?;
    Ok(Some(user))
}

async fn tokens_for_user_sqlite(pool: &SqlitePool, user_id: DocumentId) -> StoreResult<Vec<AuthToken>> {
    let rows = sqlx::query(
        r#"
        SELECT access, token, expires_at, created_at
        FROM user_tokens
        WHERE user_id = ?
        ORDER BY id ASC
        "#,
    )
    .bind(user_id.to_string())
    .fetch_all(pool)
    .await
    .context("Failed to load tokens")?;

    rows.iter()
        .map(|row| -> StoreResult<AuthToken> {
            Ok(AuthToken {
                user_id,
                access: row.try_get("access").context("Failed to read token")?,
                token: row.try_get("token").context("Failed to read token")?,
                expires_at: row.try_get("expires_at").context("Failed to read token")?,
                created_at: row.try_get("created_at").context("Failed to read token")?,
            })
        })
        .collect()
}

async fn push_token_sqlite(pool: &SqlitePool, token: &AuthToken) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO user_tokens (user_id, access, token, expires_at, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(token.user_id.to_string())
    .bind(&token.access)
    .bind(&token.token)
    .bind(token.expires_at)
    .bind(token.created_at)
    .execute(pool)
    .await
    .unique("token", "Failed to save token")?;

    Ok(())
}

async fn token_owner_sqlite(
    pool: &SqlitePool,
    token: &str,
    access: &str,
) -> StoreResult<Option<DocumentId>> {
    let row = sqlx::query("SELECT user_id FROM user_tokens WHERE token = ? AND access = ?")
        .bind(token)
        .bind(access)
        .fetch_optional(pool)
        .await
        .context("Failed to look up token")?;

    match row {
        Some(row) => {
            let id: String = row.try_get("user_id").context("Failed to read token")?;
            Ok(Some(decode_id(&id)?))
        }
        None => Ok(None),
    }
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> StoreResult<User> {
    let id: String = row.try_get("id").context("Failed to read user")?;

    Ok(User {
        id: decode_id(&id)?,
        email: row.try_get("email").context("Failed to read user")?,
        password_hash: row.try_get("password_hash").context("Failed to read user")?,
        tokens: Vec::new(),
        created_at: row.try_get("created_at").context("Failed to read user")?,
        updated_at: row.try_get("updated_at").context("Failed to read user")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_user_mysql(pool: &MySqlPool, user: &User) -> StoreResult<User> {
    sqlx::query(
        r#"
        INSERT INTO users (id, email, password_hash, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(user.id.to_string())
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(pool)
    .await
    .unique("email", "Failed to create user")?;

    for token in &user.tokens {
        push_token_mysql(pool, token).await?;
    }

    Ok(user.clone())
}

async fn find_user_mysql(
    pool: &MySqlPool,
    column: &'static str,
    value: &str,
) -> StoreResult<Option<User>> {
    let sql = format!(
        "SELECT id, email, password_hash, created_at, updated_at FROM users WHERE {} = ?",
        column
    );
    let row = sqlx::query(&sql)
        .bind(value)
        .fetch_optional(pool)
        .await
        .context("Failed to get user")?;

    let Some(row) = row else {
        return Ok(None);
    };
    let mut user = row_to_user_mysql(&row)?;
    user.tokens = tokens_for_user_mysql(pool, user.id).await?;
    Ok(Some(user))
}

async fn tokens_for_user_mysql(pool: &MySqlPool, user_id: DocumentId) -> StoreResult<Vec<AuthToken>> {
    let rows = sqlx::query(
        r#"
        SELECT access, token, expires_at, created_at
        FROM user_tokens
        WHERE user_id = ?
        ORDER BY id ASC
        "#,
    )
    .bind(user_id.to_string())
    .fetch_all(pool)
    .await
    .context("Failed to load tokens")?;

    rows.iter()
        .map(|row| -> StoreResult<AuthToken> {
            Ok(AuthToken {
                user_id,
                access: row.try_get("access").context("Failed to read token")?,
                token: row.try_get("token").context("Failed to read token")?,
                expires_at: row.try_get("expires_at").context("Failed to read token")?,
                created_at: row.try_get("created_at").context("Failed to read token")?,
            })
        })
        .collect()
}

async fn push_token_mysql(pool: &MySqlPool, token: &AuthToken) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO user_tokens (user_id, access, token, expires_at, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(token.user_id.to_string())
    .bind(&token.access)
    .bind(&token.token)
    .bind(token.expires_at)
    .bind(token.created_at)
    .execute(pool)
    .await
    .unique("token", "Failed to save token")?;

    Ok(())
}

async fn token_owner_mysql(
    pool: &MySqlPool,
    token: &str,
    access: &str,
) -> StoreResult<Option<DocumentId>> {
    let row = sqlx::query("SELECT user_id FROM user_tokens WHERE token = ? AND access = ?")
        .bind(token)
        .bind(access)
        .fetch_optional(pool)
        .await
        .context("Failed to look up token")?;

    match row {
        Some(row) => {
            let id: String = row.try_get("user_id").context("Failed to read token")?;
            Ok(Some(decode_id(&id)?))
        }
        None => Ok(None),
    }
}

fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> StoreResult<User> {
    let id: String = row.try_get("id").context("Failed to read user")?;

    Ok(User {
        id: decode_id(&id)?,
        email: row.try_get("email").context("Failed to read user")?,
        password_hash: row.try_get("password_hash").context("Failed to read user")?,
        tokens: Vec::new(),
        created_at: row.try_get("created_at").context("Failed to read user")?,
        updated_at: row.try_get("updated_at").context("Failed to read user")?,
    })
}
