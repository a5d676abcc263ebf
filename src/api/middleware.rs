//! API middleware
//!
//! Contains:
//! - Shared application state
//! - The `ApiError` response type
//! - Token authentication via the `x-auth` header

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderName, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;

use crate::config::AuthConfig;
use crate::db::repositories::{SqlxParkRepository, SqlxUserRepository};
use crate::db::StoreError;
use crate::models::{User, ValidationErrors};
use crate::services::{ParkService, UserService, UserServiceError};
use crate::views::Views;

/// Header carrying the auth token, on requests and on register/login responses
pub static X_AUTH: HeaderName = HeaderName::from_static("x-auth");

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub park_service: Arc<ParkService>,
    pub user_service: Arc<UserService>,
    pub views: Arc<Views>,
}

impl AppState {
    /// Wire repositories, services and templates on top of a migrated pool
    pub fn new(pool: crate::db::DynDatabasePool, auth: &AuthConfig) -> anyhow::Result<Self> {
        auth.validate()?;
        let park_service = ParkService::new(SqlxParkRepository::boxed(pool.clone()));
        let user_service =
            UserService::with_token_ttl(SqlxUserRepository::boxed(pool), auth.token_ttl_days);
        let views = Views::load().context("Failed to load page templates")?;

        Ok(Self {
            park_service: Arc::new(park_service),
            user_service: Arc::new(user_service),
            views: Arc::new(views),
        })
    }
}

/// Authenticated user and the token it was resolved from
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: User,
    pub token: String,
}

/// The authenticated user if a valid token came with the request.
///
/// Only populated on routes behind [`optional_auth`] or [`require_auth`].
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<AuthenticatedUser>);

impl<S: Send + Sync> FromRequestParts<S> for MaybeUser {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<AuthenticatedUser>().cloned()))
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    /// 401, empty body
    pub fn unauthorized() -> Self {
        Self::new("UNAUTHORIZED", "Authentication required")
    }

    /// 404, empty body
    pub fn not_found() -> Self {
        Self::new("NOT_FOUND", "Not found")
    }

    /// 400, empty body
    pub fn bad_request() -> Self {
        Self::new("BAD_REQUEST", "Bad request")
    }

    /// 400 with the field messages under `details`
    pub fn validation(errors: &ValidationErrors) -> Self {
        Self::with_details("VALIDATION_ERROR", errors.to_string(), errors.details())
    }

    /// 400 for a request body that is not the JSON we expect
    pub fn invalid_body(message: impl Into<String>) -> Self {
        Self::new("INVALID_BODY", message)
    }

    pub fn store_error(error: &StoreError) -> Self {
        tracing::error!(error = %error, "Store operation failed");
        Self::new("STORE_ERROR", error.to_string())
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    /// Status code for this error, and whether it carries a JSON body
    fn status(&self) -> (StatusCode, bool) {
        match self.error.code.as_str() {
            "UNAUTHORIZED" => (StatusCode::UNAUTHORIZED, false),
            "NOT_FOUND" => (StatusCode::NOT_FOUND, false),
            "BAD_REQUEST" => (StatusCode::BAD_REQUEST, false),
            "VALIDATION_ERROR" | "INVALID_BODY" | "STORE_ERROR" => (StatusCode::BAD_REQUEST, true),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, true),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.status() {
            (status, true) => (status, Json(self)).into_response(),
            (status, false) => status.into_response(),
        }
    }
}

/// Extract the auth token from request headers
fn extract_token(parts: &axum::http::HeaderMap) -> Option<String> {
    parts
        .get(&X_AUTH)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Resolve the request's token, logging store failures
async fn resolve(state: &AppState, token: &str) -> Option<User> {
    match state.user_service.authenticate(token).await {
        Ok(user) => Some(user),
        Err(UserServiceError::InvalidToken) => None,
        Err(e) => {
            tracing::warn!(error = %e, "Token lookup failed");
            None
        }
    }
}

/// Authentication middleware.
///
/// Rejects with 401 and an empty body unless `x-auth` names a live token.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(request.headers()).ok_or_else(ApiError::unauthorized)?;
    let user = resolve(&state, &token)
        .await
        .ok_or_else(ApiError::unauthorized)?;

    request
        .extensions_mut()
        .insert(AuthenticatedUser { user, token });
    Ok(next.run(request).await)
}

/// Optional authentication middleware.
///
/// Attaches the user when the token is valid and lets the request through
/// either way.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = extract_token(request.headers()) {
        if let Some(user) = resolve(&state, &token).await {
            request
                .extensions_mut()
                .insert(AuthenticatedUser { user, token });
        }
    }
    next.run(request).await
}
