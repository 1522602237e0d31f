use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use crate::error::ApiError;
use crate::metrics::RATE_LIMITED;
use crate::state::AppState;
use super::user_id;

pub const ANONYMOUS: &str = "anonymous";

// General API policy, applied to every /api route
pub async fn enforce_api_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let caller = user_id(request.headers()).unwrap_or(ANONYMOUS).to_string();
    let result = state.limiter.check(&caller, &state.policies.api);

    if !result.success {
        RATE_LIMITED.inc();
        return Err(ApiError::RateLimited(result));
    }
    Ok(next.run(request).await)
}
