pub mod admin;
pub mod waitlist;

use axum::{Json, Router, routing::get};

use crate::adapters::http::app_state::AppState;

pub fn router(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .nest("/waitlist", waitlist::router())
        .nest("/admin", admin::router(app_state))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
