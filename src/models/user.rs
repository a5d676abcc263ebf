//! User model
//!
//! A registered visitor of the guide. Only the id and email ever leave the
//! server; the password hash and the token list are skipped on
//! serialization.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::validation::{ValidationError, ValidationErrors};
use super::{AuthToken, DocumentId};

/// Minimum password length, checked before hashing
pub const MIN_PASSWORD_LENGTH: usize = 6;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

/// Check that a string looks like `local@domain.tld`
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// User entity
#[derive(Debug, Clone, Serialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub email: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Issued tokens, oldest first
    #[serde(skip_serializing)]
    pub tokens: Vec<AuthToken>,
    #[serde(skip_serializing)]
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new user.
    ///
    /// The password must already be hashed, see
    /// `services::password::hash_password()`.
    pub fn new(email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: DocumentId::new(),
            email,
            password_hash,
            tokens: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether `token` is in this user's list as a live auth token
    pub fn has_valid_token(&self, token: &str) -> bool {
        self.tokens
            .iter()
            .any(|t| t.token == token && t.is_valid_auth())
    }
}

/// Email and password, as accepted by register and login.
///
/// Unknown keys in the body are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Registration payload that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub password: String,
}

impl Credentials {
    /// Validate for registration, collecting every field error
    pub fn validate(&self) -> Result<NewUser, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let email = self.email.as_deref().map(str::trim).unwrap_or_default();
        if email.is_empty() {
            errors.push(ValidationError::Required { field: "email" });
        } else if !is_valid_email(email) {
            errors.push(ValidationError::InvalidEmail {
                value: email.to_string(),
            });
        }

        let password = self.password.as_deref().unwrap_or_default();
        if password.is_empty() {
            errors.push(ValidationError::Required { field: "password" });
        } else if password.chars().count() < MIN_PASSWORD_LENGTH {
            errors.push(ValidationError::TooShort {
                field: "password",
                min: MIN_PASSWORD_LENGTH,
            });
        }

        errors.into_result()?;
        Ok(NewUser {
            email: email.to_string(),
            password: password.to_string(),
        })
    }

    /// Both fields present, email trimmed; no format checks.
    pub fn login_pair(&self) -> Option<(&str, &str)> {
        let email = self.email.as_deref()?.trim();
        let password = self.password.as_deref()?;
        if email.is_empty() || password.is_empty() {
            return None;
        }
        Some((email, password))
    }
}
