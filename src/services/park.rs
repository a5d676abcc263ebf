//! Park service
//!
//! Business logic for the park guide:
//! - Creating parks, optionally owned by the requesting user
//! - Listing all or visited parks
//! - Owner-scoped update and removal
//!
//! Path ids arrive as raw strings. Anything that is not a well-formed
//! [`DocumentId`] is reported as [`ParkServiceError::NotFound`] without
//! touching the store.

use std::sync::Arc;

use crate::db::repositories::ParkRepository;
use crate::db::StoreError;
use crate::models::{
    CreateParkInput, DocumentId, Park, ParkFilter, UpdateParkInput, ValidationErrors,
};

/// Error types for park service operations
#[derive(Debug, thiserror::Error)]
pub enum ParkServiceError {
    /// The payload failed schema validation
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// Unknown id, malformed id, or a park the caller does not own
    #[error("Park not found")]
    NotFound,

    /// The store rejected the operation
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Park service for managing park documents
pub struct ParkService {
    repo: Arc<dyn ParkRepository>,
}

impl ParkService {
    /// Create a new park service
    pub fn new(repo: Arc<dyn ParkRepository>) -> Self {
        Self { repo }
    }

    /// Validate and store a new park.
    ///
    /// `creator` is the authenticated user, if any. Anonymous parks are
    /// stored without an owner and can never be changed through the API.
    pub async fn create(
        &self,
        input: &CreateParkInput,
        creator: Option<DocumentId>,
    ) -> Result<Park, ParkServiceError> {
        let new_park = input.validate()?;
        let park = self.repo.create(&Park::new(new_park, creator)).await?;

        tracing::info!(park_id = %park.id, creator = ?park.creator, "Park created");
        Ok(park)
    }

    /// Every park, oldest first
    pub async fn list(&self) -> Result<Vec<Park>, ParkServiceError> {
        Ok(self.repo.find(&ParkFilter::all()).await?)
    }

    /// Parks marked as visited, oldest first
    pub async fn list_visited(&self) -> Result<Vec<Park>, ParkServiceError> {
        Ok(self.repo.find(&ParkFilter::visited()).await?)
    }

    /// Get a park by its path id
    pub async fn get(&self, id: &str) -> Result<Park, ParkServiceError> {
        let id = parse_id(id)?;
        self.repo
            .find_by_id(id)
            .await?
            .ok_or(ParkServiceError::NotFound)
    }

    /// Resolve a path id to a park `owner` created
    pub async fn find_owned(&self, id: &str, owner: DocumentId) -> Result<Park, ParkServiceError> {
        let id = parse_id(id)?;
        self.repo
            .find(&ParkFilter::owned(id, owner))
            .await?
            .into_iter()
            .next()
            .ok_or(ParkServiceError::NotFound)
    }

    /// Apply the whitelisted fields of `input` to a park `owner` created.
    ///
    /// Unknown, malformed and foreign ids are reported as not found before
    /// the payload is validated.
    pub async fn update(
        &self,
        id: &str,
        owner: DocumentId,
        input: &UpdateParkInput,
    ) -> Result<Park, ParkServiceError> {
        let park = self.find_owned(id, owner).await?;
        let patch = input.validate()?;

        let park = self
            .repo
            .find_one_and_update(&ParkFilter::owned(park.id, owner), &patch)
            .await?
            .ok_or(ParkServiceError::NotFound)?;

        tracing::info!(park_id = %park.id, "Park updated");
        Ok(park)
    }

    /// Remove a park `owner` created, returning it
    pub async fn remove(&self, id: &str, owner: DocumentId) -> Result<Park, ParkServiceError> {
        let id = parse_id(id)?;

        let park = self
            .repo
            .find_one_and_remove(&ParkFilter::owned(id, owner))
            .await?
            .ok_or(ParkServiceError::NotFound)?;

        tracing::info!(park_id = %park.id, "Park removed");
        Ok(park)
    }
}

fn parse_id(id: &str) -> Result<DocumentId, ParkServiceError> {
    DocumentId::parse(id).ok_or(ParkServiceError::NotFound)
}
