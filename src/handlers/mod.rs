mod chat;
mod health;
mod limits;
mod metrics;

pub use chat::chat_handler;
pub use health::health_handler;
pub use limits::enforce_api_limit;
pub use metrics::metrics_handler;

use axum::{
    Router,
    http::HeaderMap,
    middleware,
    routing::{get, post},
};
use std::sync::Arc;
use crate::state::AppState;

// Set by the auth proxy in front of the gateway
pub const USER_ID_HEADER: &str = "x-user-id";

pub(crate) fn user_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/chat", post(chat_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), enforce_api_limit));

    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .nest("/api", api)
        .with_state(state)
}
