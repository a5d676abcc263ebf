//! View error types

use thiserror::Error;

/// Page rendering errors
#[derive(Debug, Error)]
pub enum ViewError {
    /// An embedded template is missing or not valid UTF-8
    #[error("Template not loaded: {0}")]
    NotLoaded(String),

    /// Template parsing or rendering error
    #[error("Template error: {0}")]
    TemplateError(String),
}
