use axum::{Json, Router, routing::post};
use serde_json::{Value, json};
use crate::models::CompletionRequest;

// Echoes the last message back as the assistant
async fn completions(Json(req): Json<CompletionRequest>) -> Json<Value> {
    let last = req.messages.last().map(|m| m.content.clone()).unwrap_or_default();
    Json(json!({
        "model": req.model,
        "choices": [{"message": {"role": "assistant", "content": format!("echo: {last}")}}],
    }))
}

// Local chat-completion backend, returns its base url
pub(crate) async fn mock_backend() -> String {
    let app = Router::new().route("/v1/chat/completions", post(completions));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}
