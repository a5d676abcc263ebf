//! Site page endpoints
//!
//! - GET / - Home page
//! - GET /about - About page
//! - GET /contact - Contact page
//! - GET /bad - Fixed error payload

use axum::{extract::State, response::Html, Json};
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState};
use crate::views::Page;

fn render(state: &AppState, page: Page) -> Result<Html<String>, ApiError> {
    state.views.render_page(page).map(Html).map_err(|e| {
        tracing::error!(error = %e, template = page.template(), "Page render failed");
        ApiError::internal_error(e.to_string())
    })
}

/// GET /
pub async fn home(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    render(&state, Page::Home)
}

/// GET /about
pub async fn about(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    render(&state, Page::About)
}

/// GET /contact
pub async fn contact(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    render(&state, Page::Contact)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BadResponse {
    pub error_message: &'static str,
}

/// GET /bad
pub async fn bad() -> Json<BadResponse> {
    Json(BadResponse {
        error_message: "Unable to handle request",
    })
}
