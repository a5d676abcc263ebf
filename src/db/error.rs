//! Store error types
//!
//! Every document store operation returns a [`StoreResult`]. Failures are
//! handed back to the caller as-is; nothing in this layer retries.

/// Error raised by a document store operation
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique index rejected the write
    #[error("Duplicate key: {0}")]
    Duplicate(&'static str),

    /// The query failed (connectivity, constraint, syntax)
    #[error("{context}: {source}")]
    Query {
        context: &'static str,
        #[source]
        source: sqlx::Error,
    },

    /// A stored row could not be mapped back into a document
    #[error("Invalid stored document: {0}")]
    Decode(String),

    #[error("Database pool exposes no backend")]
    NoBackend,
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Attach a description to a failed sqlx call, like `anyhow::Context`.
pub(crate) trait StoreContext<T> {
    fn context(self, context: &'static str) -> StoreResult<T>;

    /// Same as [`StoreContext::context`], but a unique-index violation is
    /// reported as [`StoreError::Duplicate`] for `key`.
    fn unique(self, key: &'static str, context: &'static str) -> StoreResult<T>;
}

impl<T> StoreContext<T> for Result<T, sqlx::Error> {
    fn context(self, context: &'static str) -> StoreResult<T> {
        self.map_err(|source| StoreError::Query { context, source })
    }

    fn unique(self, key: &'static str, context: &'static str) -> StoreResult<T> {
        self.map_err(|source| match source {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => StoreError::Duplicate(key),
            source => StoreError::Query { context, source },
        })
    }
}
