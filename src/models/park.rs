//! Park model
//!
//! A park listed in the guide, with the schema rules its documents must
//! satisfy before they reach the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::{required_trimmed, ValidationError, ValidationErrors};
use super::DocumentId;

/// Minimum length of `name` and `description`, after trimming
pub const MIN_TEXT_LENGTH: usize = 5;

/// Park document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Park {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub name: String,
    pub description: String,
    pub visited: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Owning user; anonymous parks have none and cannot be edited
    #[serde(rename = "_creator", default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<DocumentId>,
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub updated_at: DateTime<Utc>,
}

impl Park {
    /// Build a new park document from validated input
    pub fn new(input: NewPark, creator: Option<DocumentId>) -> Self {
        let now = Utc::now();
        Self {
            id: DocumentId::new(),
            name: input.name,
            description: input.description,
            visited: input.visited,
            location: None,
            creator,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Raw create payload, as received
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateParkInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub visited: Option<bool>,
}

/// Create payload that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPark {
    pub name: String,
    pub description: String,
    pub visited: bool,
}

impl CreateParkInput {
    /// Trim and check every field, collecting all failures
    pub fn validate(&self) -> Result<NewPark, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let name = required_trimmed(self.name.as_deref(), "name", MIN_TEXT_LENGTH, &mut errors);
        let description = required_trimmed(
            self.description.as_deref(),
            "description",
            MIN_TEXT_LENGTH,
            &mut errors,
        );
        errors.into_result()?;

        Ok(NewPark {
            name,
            description,
            visited: self.visited.unwrap_or(false),
        })
    }
}

/// Raw PATCH payload.
///
/// Only `visited`, `description` and `location` are read; any other key in
/// the request body is dropped during deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateParkInput {
    pub visited: Option<bool>,
    pub description: Option<String>,
    pub location: Option<String>,
}

/// Validated PATCH payload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParkPatch {
    pub visited: Option<bool>,
    pub description: Option<String>,
    /// `Some(None)` clears the location
    pub location: Option<Option<String>>,
}

impl UpdateParkInput {
    pub fn validate(&self) -> Result<ParkPatch, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let description = self.description.as_deref().map(str::trim).map(|d| {
            if d.is_empty() {
                errors.push(ValidationError::Required { field: "description" });
            } else if d.chars().count() < MIN_TEXT_LENGTH {
                errors.push(ValidationError::TooShort {
                    field: "description",
                    min: MIN_TEXT_LENGTH,
                });
            }
            d.to_string()
        });
        errors.into_result()?;

        let location = self.location.as_deref().map(str::trim).map(|l| {
            if l.is_empty() {
                None
            } else {
                Some(l.to_string())
            }
        });

        Ok(ParkPatch {
            visited: self.visited,
            description,
            location,
        })
    }
}

/// Filter for park queries; unset fields match everything
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParkFilter {
    pub id: Option<DocumentId>,
    pub visited: Option<bool>,
    pub creator: Option<DocumentId>,
}

impl ParkFilter {
    /// Match every park
    pub fn all() -> Self {
        Self::default()
    }

    /// Match parks whose `visited` flag is set
    pub fn visited() -> Self {
        Self {
            visited: Some(true),
            ..Self::default()
        }
    }

    /// Match one park, but only if `creator` owns it
    pub fn owned(id: DocumentId, creator: DocumentId) -> Self {
        Self {
            id: Some(id),
            creator: Some(creator),
            ..Self::default()
        }
    }
}
