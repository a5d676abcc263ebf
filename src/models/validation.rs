//! Field validation errors shared by the park and user schemas

use serde_json::{Map, Value};
use std::fmt;

/// A single rejected field
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Path `{field}` is required.")]
    Required { field: &'static str },

    #[error("Path `{field}` is shorter than the minimum allowed length ({min}).")]
    TooShort { field: &'static str, min: usize },

    #[error("{value} is not a valid email")]
    InvalidEmail { value: String },

    #[error("{value} is already registered")]
    DuplicateEmail { value: String },
}

impl ValidationError {
    /// Name of the field the error refers to
    pub fn field(&self) -> &'static str {
        match self {
            Self::Required { field } | Self::TooShort { field, .. } => field,
            Self::InvalidEmail { .. } | Self::DuplicateEmail { .. } => "email",
        }
    }
}

/// Every field error found while validating one document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: ValidationError) {
        self.0.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.0
    }

    /// Whether any error refers to `field`
    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field() == field)
    }

    /// `Ok(())` when nothing was collected
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Field name to message map, used as the error payload
    pub fn details(&self) -> Value {
        let mut map = Map::new();
        for error in &self.0 {
            map.entry(error.field())
                .or_insert_with(|| Value::String(error.to_string()));
        }
        Value::Object(map)
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self(vec![error])
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "Validation failed: {}", messages.join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Trim a required string field and enforce a minimum length
pub(crate) fn required_trimmed(
    value: Option<&str>,
    field: &'static str,
    min: usize,
    errors: &mut ValidationErrors,
) -> String {
    let trimmed = value.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        errors.push(ValidationError::Required { field });
    } else if trimmed.chars().count() < min {
        errors.push(ValidationError::TooShort { field, min });
    }
    trimmed.to_string()
}
