//! Park repository
//!
//! Database operations for the parks collection.
//!
//! This module provides:
//! - `ParkRepository` trait defining the interface for park data access
//! - `SqlxParkRepository` implementing the trait for SQLite and MySQL

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlArguments;
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::{MySql, MySqlPool, Row, Sqlite, SqlitePool};
use std::sync::Arc;

use super::{decode_id, no_backend};
use crate::db::{DynDatabasePool, StoreContext, StoreResult};
use crate::models::{DocumentId, Park, ParkFilter, ParkPatch};

const PARK_COLUMNS: &str =
    "id, name, description, visited, location, creator_id, created_at, updated_at";

/// Park repository trait
#[async_trait]
pub trait ParkRepository: Send + Sync {
    /// Insert a new park document
    async fn create(&self, park: &Park) -> StoreResult<Park>;

    /// List parks matching the filter, oldest first
    async fn find(&self, filter: &ParkFilter) -> StoreResult<Vec<Park>>;

    /// Get a park by ID
    async fn find_by_id(&self, id: DocumentId) -> StoreResult<Option<Park>>;

    /// Patch the first park matching the filter, returning it after the update
    async fn find_one_and_update(
        &self,
        filter: &ParkFilter,
        patch: &ParkPatch,
    ) -> StoreResult<Option<Park>>;

    /// Delete the first park matching the filter, returning what was removed
    async fn find_one_and_remove(&self, filter: &ParkFilter) -> StoreResult<Option<Park>>;
}

/// SQLx-based park repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxParkRepository {
    pool: DynDatabasePool,
}

impl SqlxParkRepository {
    /// Create a new SQLx park repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ParkRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ParkRepository for SqlxParkRepository {
    async fn create(&self, park: &Park) -> StoreResult<Park> {
        if let Some(pool) = self.pool.as_sqlite() {
            create_park_sqlite(pool, park).await
        } else if let Some(pool) = self.pool.as_mysql() {
            create_park_mysql(pool, park).await
        } else {
            Err(no_backend())
        }
    }

    async fn find(&self, filter: &ParkFilter) -> StoreResult<Vec<Park>> {
        if let Some(pool) = self.pool.as_sqlite() {
            find_parks_sqlite(pool, filter, None).await
        } else if let Some(pool) = self.pool.as_mysql() {
            find_parks_mysql(pool, filter, None).await
        } else {
            Err(no_backend())
        }
    }

    async fn find_by_id(&self, id: DocumentId) -> StoreResult<Option<Park>> {
        let filter = ParkFilter {
            id: Some(id),
            ..ParkFilter::default()
        };
        self.find_one(&filter).await
    }

    async fn find_one_and_update(
        &self,
        filter: &ParkFilter,
        patch: &ParkPatch,
    ) -> StoreResult<Option<Park>> {
        let Some(park) = self.find_one(filter).await? else {
            return Ok(None);
        };

        // Only the patched columns are written, and only while the row still
        // matches the filter
        let scoped = ParkFilter {
            id: Some(park.id),
            ..*filter
        };
        if let Some(pool) = self.pool.as_sqlite() {
            update_park_sqlite(pool, &scoped, patch).await?;
        } else if let Some(pool) = self.pool.as_mysql() {
            update_park_mysql(pool, &scoped, patch).await?;
        } else {
            return Err(no_backend());
        }

        self.find_one(&scoped).await
    }

    async fn find_one_and_remove(&self, filter: &ParkFilter) -> StoreResult<Option<Park>> {
        let Some(park) = self.find_one(filter).await? else {
            return Ok(None);
        };

        let deleted = if let Some(pool) = self.pool.as_sqlite() {
            delete_park_sqlite(pool, &park).await?
        } else if let Some(pool) = self.pool.as_mysql() {
            delete_park_mysql(pool, &park).await?
        } else {
            return Err(no_backend());
        };

        Ok((deleted > 0).then_some(park))
    }
}

impl SqlxParkRepository {
    async fn find_one(&self, filter: &ParkFilter) -> StoreResult<Option<Park>> {
        let parks = if let Some(pool) = self.pool.as_sqlite() {
            find_parks_sqlite(pool, filter, Some(1)).await?
        } else if let Some(pool) = self.pool.as_mysql() {
            find_parks_mysql(pool, filter, Some(1)).await?
        } else {
            return Err(no_backend());
        };
        Ok(parks.into_iter().next())
    }
}

/// A value bound into a generated statement
enum SqlValue {
    Text(String),
    OptText(Option<String>),
    Bool(bool),
    OptBool(Option<bool>),
    Time(DateTime<Utc>),
}

/// Build the ` WHERE ...` clause for a filter, empty when it matches all
fn where_clause(filter: &ParkFilter) -> (String, Vec<SqlValue>) {
    let mut conditions = Vec::new();
    let mut values = Vec::new();

    if let Some(id) = filter.id {
        conditions.push("id = ?");
        values.push(SqlValue::Text(id.to_string()));
    }
    if let Some(visited) = filter.visited {
        conditions.push("visited = ?");
        values.push(SqlValue::Bool(visited));
    }
    if let Some(creator) = filter.creator {
        conditions.push("creator_id = ?");
        values.push(SqlValue::Text(creator.to_string()));
    }

    if conditions.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", conditions.join(" AND ")), values)
    }
}

/// Build `SELECT ... WHERE ...` for a filter. Both backends use `?`
/// placeholders, so the SQL is shared and only binding differs.
fn select_sql(filter: &ParkFilter, limit: Option<u32>) -> (String, Vec<SqlValue>) {
    let (clause, values) = where_clause(filter);

    let mut sql = format!("SELECT {} FROM parks{}", PARK_COLUMNS, clause);
    sql.push_str(" ORDER BY created_at ASC, id ASC");
    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }

    (sql, values)
}

/// Build a single `UPDATE` that sets only the fields present in `patch`.
/// Absent fields keep their stored value.
fn update_sql(filter: &ParkFilter, patch: &ParkPatch) -> (String, Vec<SqlValue>) {
    let (clause, filter_values) = where_clause(filter);

    let mut values = vec![
        SqlValue::OptBool(patch.visited),
        SqlValue::OptText(patch.description.clone()),
        SqlValue::Bool(patch.location.is_some()),
        SqlValue::OptText(patch.location.clone().flatten()),
        SqlValue::Time(Utc::now()),
    ];
    values.extend(filter_values);

    let sql = format!(
        "UPDATE parks SET visited = COALESCE(?, visited), description = COALESCE(?, description), \
         location = CASE WHEN ? THEN ? ELSE location END, updated_at = ?{}",
        clause
    );
    (sql, values)
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_park_sqlite(pool: &SqlitePool, park: &Park) -> StoreResult<Park> {
    sqlx::query(
        r#"
        INSERT INTO parks (id, name, description, visited, location, creator_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(park.id.to_string())
    .bind(&park.name)
    .bind(&park.description)
    .bind(park.visited)
    .bind(&park.location)
    .bind(park.creator.map(|c| c.to_string()))
    .bind(park.created_at)
    .bind(park.updated_at)
    .execute(pool)
    .await
    .unique("_id", "Failed to create park")?;

    Ok(park.clone())
}

async fn find_parks_sqlite(
    pool: &SqlitePool,
    filter: &ParkFilter,
    limit: Option<u32>,
) -> StoreResult<Vec<Park>> {
    let (sql, values) = select_sql(filter, limit);
    let rows = bind_sqlite(sqlx::query(&sql), values)
        .fetch_all(pool)
        .await
        .context("Failed to list parks")?;

    rows.iter().map(row_to_park_sqlite).collect()
}

async fn update_park_sqlite(
    pool: &SqlitePool,
    filter: &ParkFilter,
    patch: &ParkPatch,
) -> StoreResult<()> {
    let (sql, values) = update_sql(filter, patch);
    bind_sqlite(sqlx::query(&sql), values)
        .execute(pool)
        .await
        .context("Failed to update park")?;

    Ok(())
}

async fn delete_park_sqlite(pool: &SqlitePool, park: &Park) -> StoreResult<u64> {
    let result = sqlx::query("DELETE FROM parks WHERE id = ?")
        .bind(park.id.to_string())
        .execute(pool)
        .await
        .context("Failed to delete park")?;

    Ok(result.rows_affected())
}

fn bind_sqlite<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    values: Vec<SqlValue>,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for value in values {
        query = match value {
            SqlValue::Text(s) => query.bind(s),
            SqlValue::OptText(s) => query.bind(s),
            SqlValue::Bool(b) => query.bind(b),
            SqlValue::OptBool(b) => query.bind(b),
            SqlValue::Time(t) => query.bind(t),
        };
    }
    query
}

fn row_to_park_sqlite(row: &sqlx::sqlite::SqliteRow) -> StoreResult<Park> {
    let id: String = row.try_get("id").context("Failed to read park")?;
    let creator: Option<String> = row.try_get("creator_id").context("Failed to read park")?;

    Ok(Park {
        id: decode_id(&id)?,
        name: row.try_get("name").context("Failed to read park")?,
        description: row.try_get("description").context("Failed to read park")?,
        visited: row.try_get("visited").context("Failed to read park")?,
        location: row.try_get("location").context("Failed to read park")?,
        creator: creator.as_deref().map(decode_id).transpose()?,
        created_at: row.try_get("created_at").context("Failed to read park")?,
        updated_at: row.try_get("updated_at").context("Failed to read park")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_park_mysql(pool: &MySqlPool, park: &Park) -> StoreResult<Park> {
    sqlx::query(
        r#"
        INSERT INTO parks (id, name, description, visited, location, creator_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(park.id.to_string())
    .bind(&park.name)
    .bind(&park.description)
    .bind(park.visited)
    .bind(&park.location)
    .bind(park.creator.map(|c| c.to_string()))
    .bind(park.created_at)
    .bind(park.updated_at)
    .execute(pool)
    .await
    .unique("_id", "Failed to create park")?;

    Ok(park.clone())
}

async fn find_parks_mysql(
    pool: &MySqlPool,
    filter: &ParkFilter,
    limit: Option<u32>,
) -> StoreResult<Vec<Park>> {
    let (sql, values) = select_sql(filter, limit);
    let rows = bind_mysql(sqlx::query(&sql), values)
        .fetch_all(pool)
        .await
        .context("Failed to list parks")?;

    rows.iter().map(row_to_park_mysql).collect()
}

async fn update_park_mysql(
    pool: &MySqlPool,
    filter: &ParkFilter,
    patch: &ParkPatch,
) -> StoreResult<()> {
    let (sql, values) = update_sql(filter, patch);
    bind_mysql(sqlx::query(&sql), values)
        .execute(pool)
        .await
        .context("Failed to update park")?;

    Ok(())
}

async fn delete_park_mysql(pool: &MySqlPool, park: &Park) -> StoreResult<u64> {
    let result = sqlx::query("DELETE FROM parks WHERE id = ?")
        .bind(park.id.to_string())
        .execute(pool)
        .await
        .context("Failed to delete park")?;

    Ok(result.rows_affected())
}

fn bind_mysql(
    mut query: Query<'_, MySql, MySqlArguments>,
    values: Vec<SqlValue>,
) -> Query<'_, MySql, MySqlArguments> {
    for value in values {
        query = match value {
            SqlValue::Text(s) => query.bind(s),
            SqlValue::OptText(s) => query.bind(s),
            SqlValue::Bool(b) => query.bind(b),
            SqlValue::OptBool(b) => query.bind(b),
            SqlValue::Time(t) => query.bind(t),
        };
    }
    query
}

fn row_to_park_mysql(row: &sqlx::mysql::MySqlRow) -> StoreResult<Park> {
    let id: String = row.try_get("id").context("Failed to read park")?;
    let creator: Option<String> = row.try_get("creator_id").context("Failed to read park")?;

    Ok(Park {
        id: decode_id(&id)?,
        name: row.try_get("name").context("Failed to read park")?,
        description: row.try_get("description").context("Failed to read park")?,
        visited: row.try_get("visited").context("Failed to read park")?,
        location: row.try_get("location").context("Failed to read park")?,
        creator: creator.as_deref().map(decode_id).transpose()?,
        created_at: row.try_get("created_at").context("Failed to read park")?,
        updated_at: row.try_get("updated_at").context("Failed to read park")?,
    })
}
