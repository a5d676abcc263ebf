//! Common API utilities and shared types

use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use serde::Serialize;

use crate::api::middleware::ApiError;
use crate::models::Park;

/// `Json` extractor whose rejections are reported as `ApiError`
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::invalid_body(rejection.body_text())
    }
}

/// `{"parks": [...]}`
#[derive(Debug, Serialize)]
pub struct ParksResponse {
    pub parks: Vec<Park>,
}

/// `{"park": {...}}`
#[derive(Debug, Serialize)]
pub struct ParkResponse {
    pub park: Park,
}
