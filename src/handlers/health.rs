use axum::{Json, extract::State, response::IntoResponse};
use std::sync::Arc;
use crate::state::AppState;

pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "backends": state.load_balancer.healthy_count(),
        "cache_entries": state.cache.len(),
        "rate_limit_keys": state.limiter.tracked_keys(),
    }))
}
