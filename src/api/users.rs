//! User API endpoints
//!
//! - POST /users - Register, responds with the token in `x-auth`
//! - GET /users/me - Current user (auth)
//! - POST /users/login - Login, responds with a new token in `x-auth`
//! - DELETE /users/me/token - Logout the current token (auth)

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderValue, StatusCode},
    response::IntoResponse,
    Extension, Json,
};

use crate::api::common::JsonBody;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, X_AUTH};
use crate::models::{AuthToken, Credentials, User};
use crate::services::UserServiceError;

/// `x-auth` header plus the sanitized user body
fn auth_response(user: User, token: &AuthToken) -> Result<impl IntoResponse, ApiError> {
    let value = HeaderValue::from_str(&token.token)
        .map_err(|e| ApiError::internal_error(format!("Invalid token header: {}", e)))?;
    Ok(([(X_AUTH.clone(), value)], Json(user)))
}

/// POST /users
pub async fn register(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<Credentials>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, token) = state
        .user_service
        .register(&body)
        .await
        .map_err(|e| match e {
            UserServiceError::Validation(errors) => ApiError::validation(&errors),
            UserServiceError::Store(e) => ApiError::store_error(&e),
            e => ApiError::internal_error(e.to_string()),
        })?;

    auth_response(user, &token)
}

/// GET /users/me
pub async fn me(Extension(auth): Extension<AuthenticatedUser>) -> Json<User> {
    Json(auth.user)
}

/// POST /users/login
///
/// Every failure, including an unreadable body, is a bare 400.
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body.map_err(|_| ApiError::bad_request())?;

    let (user, token) = state.user_service.login(&body).await.map_err(|e| {
        if !matches!(e, UserServiceError::InvalidCredentials) {
            tracing::warn!(error = %e, "Login failed");
        }
        ApiError::bad_request()
    })?;

    auth_response(user, &token)
}

/// DELETE /users/me/token
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<StatusCode, ApiError> {
    state
        .user_service
        .logout(&auth.user, &auth.token)
        .await
        .map_err(|e| {
            tracing::warn!(user_id = %auth.user.id, error = %e, "Logout failed");
            ApiError::bad_request()
        })?;

    Ok(StatusCode::OK)
}
