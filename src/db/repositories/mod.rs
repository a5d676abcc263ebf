//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles the operations for one collection.

pub mod park;
pub mod user;

pub use park::{ParkRepository, SqlxParkRepository};
pub use user::{SqlxUserRepository, UserRepository};

use super::{StoreError, StoreResult};
use crate::models::DocumentId;

/// Parse an id column back into a [`DocumentId`]
fn decode_id(raw: &str) -> StoreResult<DocumentId> {
    DocumentId::parse(raw).ok_or_else(|| StoreError::Decode(format!("invalid id `{}`", raw)))
}

fn no_backend() -> StoreError {
    StoreError::NoBackend
}
