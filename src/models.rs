use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

// Request from the finance app. Messages stay untyped until validated.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<Value>,
    #[serde(default)]
    pub model: Option<String>,
}

// Reply to the finance app
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub model: String,
    pub message: ChatMessage,
}

// Chat-completion request format on the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub stream: bool,
}

#[derive(Debug, Deserialize)]
pub struct CompletionChoice {
    pub message: ChatMessage,
}

// Chat-completion response format on the backend
#[derive(Debug, Deserialize)]
pub struct CompletionResponse {
    pub model: String,
    pub choices: Vec<CompletionChoice>,
}

impl TryFrom<CompletionResponse> for ChatResponse {
    type Error = ApiError;

    fn try_from(response: CompletionResponse) -> Result<Self, Self::Error> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::Upstream("completion had no choices".to_string()))?;
        Ok(Self {
            model: response.model,
            message: choice.message,
        })
    }
}

// Batched request - holds request + response channel
pub struct BatchedRequest {
    pub user: String,
    pub request: CompletionRequest,
    pub response_tx: oneshot::Sender<Result<ChatResponse, ApiError>>,
}
