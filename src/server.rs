use axum::{Router, routing::get};
use serde_json::json;

pub async fn health_handler() -> axum::Json<serde_json::Value> {
    axum::Json(json!({ "status": "ok" }))
}

/// Liveness routes (`/` and `/health`), merged with the teloxide webhook router
/// when one is given. Polling mode and tests pass `None`.
pub fn build_router(webhook_router: Option<Router>) -> Router {
    let base = Router::new()
        .route("/", get(health_handler))
        .route("/health", get(health_handler));
    match webhook_router {
        Some(r) => base.merge(r),
        None => base,
    }
}
