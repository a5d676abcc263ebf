//! Database layer
//!
//! The document store behind the site. Two collections live here, parks and
//! users (with each user's token list), backed by SQLite by default or MySQL
//! when configured.
//!
//! # Usage
//!
//! ```ignore
//! use slackers_guide::config::DatabaseConfig;
//! use slackers_guide::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

mod error;
pub mod migrations;
pub mod pool;
pub mod repositories;

pub use error::{StoreError, StoreResult};
pub(crate) use error::StoreContext;
pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
