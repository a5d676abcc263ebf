//! API layer - HTTP handlers and routing
//!
//! This module contains every HTTP endpoint of the site:
//! - Marketing pages (home, about, contact)
//! - Park API endpoints
//! - User/Auth API endpoints

pub mod common;
pub mod middleware;
pub mod parks;
pub mod site;
pub mod users;

#[cfg(test)]
mod tests;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub use middleware::{ApiError, AppState, AuthenticatedUser, MaybeUser, X_AUTH};

/// Build the route table
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Protected routes (need a valid token)
    let protected_routes = Router::new()
        .route(
            "/parks/{id}",
            axum::routing::patch(parks::update_park).delete(parks::delete_park),
        )
        .route("/users/me", get(users::me))
        .route("/users/me/token", axum::routing::delete(users::logout))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Routes that record the caller when a token is present
    let identified_routes = Router::new()
        .route("/parks", post(parks::create_park))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::optional_auth,
        ));

    // Public routes
    Router::new()
        .route("/", get(site::home))
        .route("/about", get(site::about))
        .route("/contact", get(site::contact))
        .route("/bad", get(site::bad))
        .route("/parks", get(parks::list_parks))
        .route("/allParks", get(parks::list_parks))
        .route("/visitedParks", get(parks::list_visited_parks))
        .route("/parks/{id}", get(parks::get_park))
        .route("/users", post(users::register))
        .route("/users/login", post(users::login))
        .merge(identified_routes)
        .merge(protected_routes)
}

fn cors_layer(cors_origin: &str) -> CorsLayer {
    let origin = match cors_origin.parse::<HeaderValue>() {
        Ok(origin) if cors_origin != "*" => AllowOrigin::exact(origin),
        Ok(_) => AllowOrigin::any(),
        Err(e) => {
            tracing::warn!(cors_origin, error = %e, "Invalid CORS origin, allowing any");
            AllowOrigin::any()
        }
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, X_AUTH.clone()])
        .expose_headers([X_AUTH.clone()])
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    Router::new()
        .merge(build_api_router(state.clone()))
        .layer(cors_layer(cors_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
