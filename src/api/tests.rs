//! End-to-end tests for the HTTP API, run against the full router on an
//! in-memory database.

use axum::http::{HeaderValue, StatusCode};
use axum_test::{TestRequest, TestServer};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{build_router, AppState, X_AUTH};
use crate::config::AuthConfig;
use crate::db::repositories::{SqlxParkRepository, SqlxUserRepository};
use crate::db::{create_test_pool, migrations};
use crate::models::DocumentId;
use crate::services::{ParkService, UserService};
use crate::views::Views;

async fn test_server_with(auth: AuthConfig) -> TestServer {
    let pool = create_test_pool().await.expect("Failed to create test pool");
    migrations::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    let state = AppState::new(pool, &auth).expect("Failed to build state");
    TestServer::new(build_router(state, "*")).expect("Failed to start test server")
}

async fn test_server() -> TestServer {
    test_server_with(AuthConfig::default()).await
}

fn auth_header(token: &str) -> HeaderValue {
    HeaderValue::from_str(token).unwrap()
}

/// Register a user, returning its id and token
async fn register(server: &TestServer, email: &str) -> (String, String) {
    let response = server
        .post("/users")
        .json(&json!({ "email": email, "password": "password123" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let token = response
        .headers()
        .get(&X_AUTH)
        .expect("x-auth header should be set")
        .to_str()
        .unwrap()
        .to_string();
    let body = response.json::<Value>();
    (body["_id"].as_str().unwrap().to_string(), token)
}

/// PATCH bodies ranging from well-formed to unreadable
fn with_patch_body(request: TestRequest, kind: u8) -> TestRequest {
    match kind {
        0 => request,
        1 => request.json(&json!({ "visited": true })),
        2 => request.json(&json!({ "visited": "yes" })),
        3 => request.json(&json!({ "description": "meh" })),
        _ => request.text("not json"),
    }
}

async fn create_park(server: &TestServer, token: Option<&str>, name: &str, visited: bool) -> Value {
    let mut request = server.post("/parks").json(&json!({
        "name": name,
        "description": "Large city park",
        "visited": visited,
    }));
    if let Some(token) = token {
        request = request.add_header(X_AUTH.clone(), auth_header(token));
    }
    let response = request.await;
    assert_eq!(response.status_code(), StatusCode::OK);
    response.json::<Value>()
}

// ============================================================================
// Site pages
// ============================================================================

#[tokio::test]
async fn test_site_pages_render() {
    let server = test_server().await;

    for (path, title) in [("/", "Slackers Guide to Charleston"), ("/about", "About Me"), ("/contact", "Contact Us")] {
        let response = server.get(path).await;
        assert_eq!(response.status_code(), StatusCode::OK);

        let content_type = response.headers().get("content-type").unwrap().to_str().unwrap();
        assert!(content_type.starts_with("text/html"));
        assert!(response.text().contains(&format!("<title>{}</title>", title)));
    }
}

#[tokio::test]
async fn test_bad_route() {
    let server = test_server().await;

    let response = server.get("/bad").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>(), json!({ "errorMessage": "Unable to handle request" }));
}

// ============================================================================
// Park creation and listing
// ============================================================================

#[tokio::test]
async fn test_create_park_anonymous() {
    let server = test_server().await;

    let park = create_park(&server, None, "Hampton Park", false).await;

    assert_eq!(park["name"], "Hampton Park");
    assert_eq!(park["description"], "Large city park");
    assert_eq!(park["visited"], false);
    assert!(DocumentId::parse(park["_id"].as_str().unwrap()).is_some());
    assert!(park.get("_creator").is_none());
}

#[tokio::test]
async fn test_create_park_records_creator() {
    let server = test_server().await;
    let (user_id, token) = register(&server, "slacker@example.com").await;

    let park = create_park(&server, Some(&token), "Hampton Park", false).await;
    assert_eq!(park["_creator"], user_id);
}

#[tokio::test]
async fn test_create_park_with_bad_token_is_anonymous() {
    let server = test_server().await;

    let park = create_park(&server, Some("not-a-token"), "Hampton Park", false).await;
    assert!(park.get("_creator").is_none());
}

#[tokio::test]
async fn test_create_park_validation() {
    let server = test_server().await;

    let response = server
        .post("/parks")
        .json(&json!({ "name": "  Park  ", "description": "tiny" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert!(body["error"]["details"]["name"].is_string());
    assert!(body["error"]["details"]["description"].is_string());
}

#[tokio::test]
async fn test_create_park_malformed_body() {
    let server = test_server().await;

    let response = server
        .post("/parks")
        .json(&json!({ "name": "Hampton Park", "description": "Large city park", "visited": "yes" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"]["code"], "INVALID_BODY");
}

#[tokio::test]
async fn test_list_parks() {
    let server = test_server().await;
    create_park(&server, None, "Hampton Park", true).await;
    create_park(&server, None, "Waterfront Park", false).await;
    create_park(&server, None, "Colonial Lake", true).await;

    for path in ["/parks", "/allParks"] {
        let body = server.get(path).await.json::<Value>();
        let mut names: Vec<&str> = body["parks"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["name"].as_str().unwrap())
            .collect();
        names.sort_unstable();
        assert_eq!(names, vec!["Colonial Lake", "Hampton Park", "Waterfront Park"]);
    }

    let visited = server.get("/visitedParks").await.json::<Value>();
    let visited = visited["parks"].as_array().unwrap();
    assert_eq!(visited.len(), 2);
    assert!(visited.iter().all(|p| p["visited"] == true));
}

// ============================================================================
// Get by id
// ============================================================================

#[tokio::test]
async fn test_get_park_by_id() {
    let server = test_server().await;
    let park = create_park(&server, None, "Hampton Park", false).await;

    let response = server.get(&format!("/parks/{}", park["_id"].as_str().unwrap())).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["park"], park);
}

#[tokio::test]
async fn test_get_park_bogus_and_missing_ids() {
    let server = test_server().await;

    let response = server.get("/parks/123").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert!(response.text().is_empty());

    let response = server.get(&format!("/parks/{}", DocumentId::new())).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert!(response.text().is_empty());
}

// ============================================================================
// Update
// ============================================================================

#[tokio::test]
async fn test_update_park_requires_auth() {
    let server = test_server().await;
    let park = create_park(&server, None, "Hampton Park", false).await;

    let response = server
        .patch(&format!("/parks/{}", park["_id"].as_str().unwrap()))
        .json(&json!({ "visited": true }))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert!(response.text().is_empty());
}

#[tokio::test]
async fn test_update_park_by_owner() {
    let server = test_server().await;
    let (_, token) = register(&server, "owner@example.com").await;
    let park = create_park(&server, Some(&token), "Hampton Park", false).await;
    let path = format!("/parks/{}", park["_id"].as_str().unwrap());

    let response = server
        .patch(&path)
        .add_header(X_AUTH.clone(), auth_header(&token))
        .json(&json!({
            "name": "Renamed Park",
            "visited": true,
            "description": "Has a duck pond",
            "location": "  Hampton Park Terrace ",
            "completed": true,
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let updated = response.json::<Value>()["park"].clone();
    assert_eq!(updated["name"], "Hampton Park");
    assert_eq!(updated["visited"], true);
    assert_eq!(updated["description"], "Has a duck pond");
    assert_eq!(updated["location"], "Hampton Park Terrace");
    assert!(updated.get("completed").is_none());

    let stored = server.get(&path).await.json::<Value>();
    assert_eq!(stored["park"], updated);
}

#[tokio::test]
async fn test_update_park_by_stranger_is_not_found() {
    let server = test_server().await;
    let (_, owner) = register(&server, "owner@example.com").await;
    let (_, stranger) = register(&server, "stranger@example.com").await;
    let park = create_park(&server, Some(&owner), "Hampton Park", false).await;
    let anonymous = create_park(&server, None, "Waterfront Park", false).await;

    for id in [&park["_id"], &anonymous["_id"]] {
        let response = server
            .patch(&format!("/parks/{}", id.as_str().unwrap()))
            .add_header(X_AUTH.clone(), auth_header(&stranger))
            .json(&json!({ "visited": true }))
            .await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
        assert!(response.text().is_empty());
    }
}

#[tokio::test]
async fn test_update_park_validation_and_bogus_id() {
    let server = test_server().await;
    let (_, token) = register(&server, "owner@example.com").await;
    let park = create_park(&server, Some(&token), "Hampton Park", false).await;

    let response = server
        .patch(&format!("/parks/{}", park["_id"].as_str().unwrap()))
        .add_header(X_AUTH.clone(), auth_header(&token))
        .json(&json!({ "description": "meh" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert!(response.json::<Value>()["error"]["details"]["description"].is_string());

    let response = server
        .patch("/parks/not-an-id")
        .add_header(X_AUTH.clone(), auth_header(&token))
        .json(&json!({ "visited": true }))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_park_bad_id_wins_over_bad_body() {
    let server = test_server().await;
    let (_, token) = register(&server, "owner@example.com").await;

    for kind in 0..5 {
        let request = server
            .patch("/parks/not-an-id")
            .add_header(X_AUTH.clone(), auth_header(&token));
        let response = with_patch_body(request, kind).await;

        assert_eq!(response.status_code(), StatusCode::NOT_FOUND, "body kind {}", kind);
        assert!(response.text().is_empty());
    }
}

#[tokio::test]
async fn test_update_foreign_park_wins_over_bad_body() {
    let server = test_server().await;
    let (_, owner) = register(&server, "owner@example.com").await;
    let (_, stranger) = register(&server, "stranger@example.com").await;
    let park = create_park(&server, Some(&owner), "Hampton Park", false).await;
    let path = format!("/parks/{}", park["_id"].as_str().unwrap());

    for kind in 0..5 {
        let request = server
            .patch(&path)
            .add_header(X_AUTH.clone(), auth_header(&stranger));
        let response = with_patch_body(request, kind).await;

        assert_eq!(response.status_code(), StatusCode::NOT_FOUND, "body kind {}", kind);
    }
}

#[tokio::test]
async fn test_update_owned_park_with_unreadable_body() {
    let server = test_server().await;
    let (_, token) = register(&server, "owner@example.com").await;
    let park = create_park(&server, Some(&token), "Hampton Park", false).await;
    let path = format!("/parks/{}", park["_id"].as_str().unwrap());

    for kind in [0, 2, 4] {
        let request = server.patch(&path).add_header(X_AUTH.clone(), auth_header(&token));
        let response = with_patch_body(request, kind).await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST, "body kind {}", kind);
        assert_eq!(response.json::<Value>()["error"]["code"], "INVALID_BODY");
    }

    let stored = server.get(&path).await.json::<Value>();
    assert_eq!(stored["park"], park);
}

// ============================================================================
// Delete
// ============================================================================

#[tokio::test]
async fn test_delete_park() {
    let server = test_server().await;
    let (_, owner) = register(&server, "owner@example.com").await;
    let (_, stranger) = register(&server, "stranger@example.com").await;
    let park = create_park(&server, Some(&owner), "Hampton Park", false).await;
    let path = format!("/parks/{}", park["_id"].as_str().unwrap());

    let response = server.delete(&path).await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = server
        .delete(&path)
        .add_header(X_AUTH.clone(), auth_header(&stranger))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let response = server
        .delete(&path)
        .add_header(X_AUTH.clone(), auth_header(&owner))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["park"], park);

    assert_eq!(server.get(&path).await.status_code(), StatusCode::NOT_FOUND);

    let response = server
        .delete("/parks/123")
        .add_header(X_AUTH.clone(), auth_header(&owner))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Users
// ============================================================================

#[tokio::test]
async fn test_register_returns_sanitized_user() {
    let server = test_server().await;

    let response = server
        .post("/users")
        .json(&json!({ "email": " slacker@example.com ", "password": "password123", "admin": true }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response.headers().get(&X_AUTH).is_some());

    let body = response.json::<Value>();
    let object = body.as_object().unwrap();
    assert_eq!(object.len(), 2);
    assert_eq!(body["email"], "slacker@example.com");
    assert!(DocumentId::parse(body["_id"].as_str().unwrap()).is_some());
}

#[tokio::test]
async fn test_register_rejects_duplicates_and_bad_input() {
    let server = test_server().await;
    register(&server, "slacker@example.com").await;

    let response = server
        .post("/users")
        .json(&json!({ "email": "slacker@example.com", "password": "password123" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert!(response.json::<Value>()["error"]["details"]["email"].is_string());

    let response = server
        .post("/users")
        .json(&json!({ "email": "nope", "password": "123" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let details = response.json::<Value>()["error"]["details"].clone();
    assert!(details["email"].is_string());
    assert!(details["password"].is_string());
}

#[tokio::test]
async fn test_users_me() {
    let server = test_server().await;
    let (user_id, token) = register(&server, "slacker@example.com").await;

    let response = server
        .get("/users/me")
        .add_header(X_AUTH.clone(), auth_header(&token))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response.json::<Value>(),
        json!({ "_id": user_id, "email": "slacker@example.com" })
    );

    let response = server.get("/users/me").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert!(response.text().is_empty());

    let response = server
        .get("/users/me")
        .add_header(X_AUTH.clone(), auth_header("bogus"))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login() {
    let server = test_server().await;
    let (user_id, first_token) = register(&server, "slacker@example.com").await;

    let response = server
        .post("/users/login")
        .json(&json!({ "email": "slacker@example.com", "password": "wrong_password" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert!(response.text().is_empty());

    let response = server
        .post("/users/login")
        .json(&json!({ "email": "nobody@example.com", "password": "password123" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert!(response.text().is_empty());

    let response = server.post("/users/login").text("not json").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert!(response.text().is_empty());

    let response = server
        .post("/users/login")
        .json(&json!({ "email": "slacker@example.com", "password": "password123" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let token = response.headers().get(&X_AUTH).unwrap().to_str().unwrap().to_string();
    assert_ne!(token, first_token);
    assert_eq!(response.json::<Value>()["_id"], user_id);

    let me = server
        .get("/users/me")
        .add_header(X_AUTH.clone(), auth_header(&token))
        .await;
    assert_eq!(me.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_logout_invalidates_only_that_token() {
    let server = test_server().await;
    let (_, first) = register(&server, "slacker@example.com").await;
    let second = server
        .post("/users/login")
        .json(&json!({ "email": "slacker@example.com", "password": "password123" }))
        .await
        .headers()
        .get(&X_AUTH)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();

    let response = server
        .delete("/users/me/token")
        .add_header(X_AUTH.clone(), auth_header(&first))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response.text().is_empty());

    let response = server
        .get("/users/me")
        .add_header(X_AUTH.clone(), auth_header(&first))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = server
        .delete("/users/me/token")
        .add_header(X_AUTH.clone(), auth_header(&first))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = server
        .get("/users/me")
        .add_header(X_AUTH.clone(), auth_header(&second))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_expired_token_rejected() {
    let pool = create_test_pool().await.expect("Failed to create test pool");
    migrations::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    // Every token is issued already expired
    let state = AppState {
        park_service: Arc::new(ParkService::new(SqlxParkRepository::boxed(pool.clone()))),
        user_service: Arc::new(UserService::with_token_ttl(SqlxUserRepository::boxed(pool), -1)),
        views: Arc::new(Views::load().unwrap()),
    };
    let server = TestServer::new(build_router(state, "*")).unwrap();
    let (_, token) = register(&server, "slacker@example.com").await;

    let response = server
        .get("/users/me")
        .add_header(X_AUTH.clone(), auth_header(&token))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_state_rejects_unusable_token_ttl() {
    for token_ttl_days in [0, -1, i64::MAX / 2] {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        let result = AppState::new(pool, &AuthConfig { token_ttl_days });
        assert!(result.is_err(), "ttl {} should be rejected", token_ttl_days);
    }
}

// ============================================================================
// Property tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_malformed_park_ids_are_not_found(id in "[g-z0-9]{1,30}", body in 0u8..5) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (get, patch, delete) = runtime.block_on(async {
            let server = test_server().await;
            let (_, token) = register(&server, "slacker@example.com").await;
            let path = format!("/parks/{}", id);

            let get = server.get(&path).await.status_code();
            let request = server
                .patch(&path)
                .add_header(X_AUTH.clone(), auth_header(&token));
            let patch = with_patch_body(request, body).await.status_code();
            let delete = server
                .delete(&path)
                .add_header(X_AUTH.clone(), auth_header(&token))
                .await
                .status_code();
            (get, patch, delete)
        });

        prop_assert_eq!(get, StatusCode::NOT_FOUND);
        prop_assert_eq!(patch, StatusCode::NOT_FOUND);
        prop_assert_eq!(delete, StatusCode::NOT_FOUND);
    }

    #[test]
    fn prop_short_park_names_are_rejected(name in "[a-zA-Z]{0,4}") {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let status = runtime.block_on(async {
            let server = test_server().await;
            server
                .post("/parks")
                .json(&json!({ "name": name, "description": "Large city park" }))
                .await
                .status_code()
        });

        prop_assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
