//! Router tests for the surface that answers before touching the database:
//! ops routes, missing/invalid bearer tokens, and request validation.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::Duration;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use universal_crud::{api_router, AppState, Db, DbConfig, Dialect, JwtKeys};

fn test_app() -> Router {
    // Lazily-connected pool: no server is listening, so any handler that
    // reaches the executor would fail; these tests never get that far.
    let db = Db::connect_lazy(&DbConfig {
        dialect: Dialect::MySql,
        host: "localhost".into(),
        port: 3306,
        user: "root".into(),
        password: String::new(),
        database: "universal_crud_test".into(),
    });
    let state = AppState {
        db,
        auth: Arc::new(JwtKeys::new(b"test-secret", Duration::hours(1))),
    };
    api_router(state)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_answers_without_a_database() {
    let response = test_app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn version_reports_crate_metadata() {
    let response = test_app()
        .oneshot(Request::builder().uri("/version").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["name"], "universal-crud");
}

#[tokio::test]
async fn product_create_requires_a_token() {
    let response = test_app()
        .oneshot(post_json("/api/products", json!({"name": "x", "price": 1})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Access token required");
}

#[tokio::test]
async fn non_bearer_authorization_is_rejected() {
    let mut request = post_json("/api/categories", json!({"name": "Books"}));
    request
        .headers_mut()
        .insert(header::AUTHORIZATION, "Basic abc123".parse().unwrap());
    let response = test_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn garbage_token_is_rejected_before_the_database() {
    let mut request = Request::builder()
        .uri("/api/users/me")
        .body(Body::empty())
        .unwrap();
    request
        .headers_mut()
        .insert(header::AUTHORIZATION, "Bearer not.a.jwt".parse().unwrap());
    let response = test_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Invalid token");
}

#[tokio::test]
async fn register_reports_every_invalid_field() {
    let response = test_app()
        .oneshot(post_json("/api/auth/register", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Validation failed");
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"username"));
    assert!(fields.contains(&"email"));
    assert!(fields.contains(&"password"));
}

#[tokio::test]
async fn register_rejects_bad_username_charset() {
    let response = test_app()
        .oneshot(post_json(
            "/api/auth/register",
            json!({"username": "not ok!", "email": "a@b.co", "password": "secret1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    let messages: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["message"].as_str().unwrap())
        .collect();
    assert!(messages
        .contains(&"Username can only contain letters, numbers, and underscores"));
}

#[tokio::test]
async fn login_requires_both_fields() {
    let response = test_app()
        .oneshot(post_json("/api/auth/login", json!({"username": "alice"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["password"]);
}

#[tokio::test]
async fn product_list_validates_query_parameters() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/api/products?page=0&limit=1000&status=stale")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"page"));
    assert!(fields.contains(&"limit"));
    assert!(fields.contains(&"status"));
}

#[tokio::test]
async fn invalid_product_id_is_a_bad_request() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/api/products/zero")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Invalid product ID");
}

#[tokio::test]
async fn verify_without_token_is_unauthorized() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/api/auth/verify")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Access token required");
}
