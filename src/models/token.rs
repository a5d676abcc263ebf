//! Auth token model

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::DocumentId;

/// Access level of tokens issued on register and login
pub const ACCESS_AUTH: &str = "auth";

/// One entry in a user's token list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    /// Owning user
    #[serde(skip)]
    pub user_id: DocumentId,
    pub access: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl AuthToken {
    /// Issue a fresh `auth` token for a user, valid for `ttl_days`.
    ///
    /// Lifetimes past the range of `DateTime` saturate instead of panicking.
    pub fn issue(user_id: DocumentId, ttl_days: i64) -> Self {
        let now = Utc::now();
        let expires_at = Duration::try_days(ttl_days)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(if ttl_days < 0 {
                DateTime::<Utc>::MIN_UTC
            } else {
                DateTime::<Utc>::MAX_UTC
            });

        Self {
            user_id,
            access: ACCESS_AUTH.to_string(),
            token: Uuid::new_v4().simple().to_string(),
            expires_at,
            created_at: now,
        }
    }

    /// Check if the token has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }

    /// Whether the token grants `auth` access and has not expired
    pub fn is_valid_auth(&self) -> bool {
        self.access == ACCESS_AUTH && !self.is_expired()
    }
}
