mod communities;
mod members;
mod status;

use crate::state::AppState;
use axum::{
    Json,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health and status
        .route("/api/health", get(status::health))
        .route("/api/status", get(status::status))
        // Community catalog
        .route("/api/communities", get(communities::list_communities))
        .route("/api/communities/{id}", get(communities::get_community))
        // Join workflow
        .route(
            "/api/communities/{id}/join/payment",
            post(communities::join_payment),
        )
        .route(
            "/api/communities/{id}/join/nft",
            post(communities::join_nft),
        )
        // Membership records
        .route("/api/members", post(members::register_member))
        .fallback(route_not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn route_not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Route not found" })),
    )
}
