//! Router assembly: ops routes plus the /api surface.

use crate::handlers::{auth, categories, products, users};
use crate::state::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
}

#[derive(Serialize)]
struct ReadyBody {
    status: &'static str,
    database: &'static str,
}

async fn health() -> Json<HealthBody> {
    Json(HealthBody { status: "ok" })
}

async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadyBody>, (axum::http::StatusCode, Json<ReadyBody>)> {
    if state.db.ping().await.is_err() {
        return Err((
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadyBody {
                status: "degraded",
                database: "unavailable",
            }),
        ));
    }
    Ok(Json(ReadyBody {
        status: "ok",
        database: "ok",
    }))
}

async fn version() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/verify", get(auth::verify))
}

fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::list).post(products::create))
        .route(
            "/:id",
            get(products::get)
                .put(products::update)
                .delete(products::delete),
        )
}

fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(categories::list).post(categories::create))
        .route(
            "/:id",
            get(categories::get)
                .put(categories::update)
                .delete(categories::delete),
        )
        .route("/:id/products", get(categories::products))
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(users::list))
        .route("/me", get(users::me))
        .route(
            "/:id",
            get(users::get).put(users::update).delete(users::delete),
        )
        .route("/:id/change-password", post(users::change_password))
}

/// The full application router. CORS is permissive: the template serves
/// browser frontends from arbitrary origins during development.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/version", get(version))
        .nest("/api/auth", auth_routes())
        .nest("/api/products", product_routes())
        .nest("/api/categories", category_routes())
        .nest("/api/users", user_routes())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
