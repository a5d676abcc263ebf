//! Park API endpoints
//!
//! - POST /parks - Create a park (owner set when authenticated)
//! - GET /parks, GET /allParks - List every park
//! - GET /visitedParks - List visited parks
//! - GET /parks/{id} - Get one park
//! - PATCH /parks/{id} - Update an owned park (auth)
//! - DELETE /parks/{id} - Remove an owned park (auth)

use axum::{
    extract::{Path, State},
    Extension, Json,
};

use crate::api::common::{JsonBody, ParkResponse, ParksResponse};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, MaybeUser};
use crate::models::{CreateParkInput, Park, UpdateParkInput};
use crate::services::ParkServiceError;

fn map_error(e: ParkServiceError) -> ApiError {
    match e {
        ParkServiceError::Validation(errors) => ApiError::validation(&errors),
        ParkServiceError::NotFound => ApiError::not_found(),
        ParkServiceError::Store(e) => ApiError::store_error(&e),
    }
}

/// POST /parks
pub async fn create_park(
    State(state): State<AppState>,
    MaybeUser(auth): MaybeUser,
    JsonBody(body): JsonBody<CreateParkInput>,
) -> Result<Json<Park>, ApiError> {
    let creator = auth.map(|a| a.user.id);
    let park = state
        .park_service
        .create(&body, creator)
        .await
        .map_err(map_error)?;

    Ok(Json(park))
}

/// GET /parks and GET /allParks
pub async fn list_parks(State(state): State<AppState>) -> Result<Json<ParksResponse>, ApiError> {
    let parks = state.park_service.list().await.map_err(map_error)?;
    Ok(Json(ParksResponse { parks }))
}

/// GET /visitedParks
pub async fn list_visited_parks(
    State(state): State<AppState>,
) -> Result<Json<ParksResponse>, ApiError> {
    let parks = state.park_service.list_visited().await.map_err(map_error)?;
    Ok(Json(ParksResponse { parks }))
}

/// GET /parks/{id}
pub async fn get_park(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ParkResponse>, ApiError> {
    let park = state.park_service.get(&id).await.map_err(map_error)?;
    Ok(Json(ParkResponse { park }))
}

/// PATCH /parks/{id}
///
/// Only `visited`, `description` and `location` are taken from the body.
/// A bad id or someone else's park is 404 whatever the body holds.
pub async fn update_park(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    body: Result<JsonBody<UpdateParkInput>, ApiError>,
) -> Result<Json<ParkResponse>, ApiError> {
    state
        .park_service
        .find_owned(&id, auth.user.id)
        .await
        .map_err(map_error)?;
    let JsonBody(body) = body?;

    let park = state
        .park_service
        .update(&id, auth.user.id, &body)
        .await
        .map_err(map_error)?;

    Ok(Json(ParkResponse { park }))
}

/// DELETE /parks/{id}
pub async fn delete_park(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<Json<ParkResponse>, ApiError> {
    let park = state
        .park_service
        .remove(&id, auth.user.id)
        .await
        .map_err(map_error)?;

    Ok(Json(ParkResponse { park }))
}
