use axum::{Json, extract::State, http::HeaderMap, response::IntoResponse};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::oneshot;
use crate::error::ApiError;
use crate::metrics::{CHAT_REQUESTS, RATE_LIMITED, REJECTED_MESSAGES, REQUEST_LATENCY};
use crate::models::{BatchedRequest, ChatMessage, ChatRequest, CompletionRequest, Role};
use crate::rate_limit::{RateLimitConfig, RateLimitResult};
use crate::state::AppState;
use crate::validation::{ValidationError, validate_chat_message, validate_chat_messages};
use crate::worker::with_system_prompt;
use super::user_id;

fn rejected(e: ValidationError) -> ApiError {
    REJECTED_MESSAGES.inc();
    tracing::debug!(reason = %e, "chat request rejected");
    ApiError::Validation(e)
}

fn check_policy(
    state: &AppState,
    user: &str,
    policy: &RateLimitConfig,
) -> Result<RateLimitResult, ApiError> {
    let result = state.limiter.check(user, policy);
    if result.success {
        Ok(result)
    } else {
        RATE_LIMITED.inc();
        Err(ApiError::RateLimited(result))
    }
}

pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<ChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    CHAT_REQUESTS.inc();

    let user = user_id(&headers).ok_or(ApiError::Unauthorized)?;

    // validate before spending any quota
    validate_chat_messages(&payload.messages).map_err(rejected)?;
    let messages: Vec<ChatMessage> = serde_json::from_value(Value::Array(payload.messages))
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let latest = messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .ok_or_else(|| ApiError::BadRequest("conversation has no user message".to_string()))?;
    validate_chat_message(&latest.content).map_err(rejected)?;

    check_policy(&state, user, &state.policies.chat_burst)?;
    let quota = check_policy(&state, user, &state.policies.chat)?;

    let start_time = Instant::now();
    let (response_tx, response_rx) = oneshot::channel();

    let batched = BatchedRequest {
        user: user.to_string(),
        request: CompletionRequest {
            model: payload.model.unwrap_or_else(|| state.default_model.clone()),
            messages: with_system_prompt(messages),
            stream: false,
        },
        response_tx,
    };

    state.batch_tx.send(batched).await.map_err(|_| ApiError::Queue)?;
    let reply = response_rx.await.map_err(|_| ApiError::Queue)??;

    REQUEST_LATENCY.observe(start_time.elapsed().as_secs_f64());
    tracing::info!(user, model = %reply.model, remaining = quota.remaining, "chat answered");

    Ok((quota.headers(), Json(reply)))
}
