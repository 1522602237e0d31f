use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use crate::cache::{CacheEntry, evict_expired, make_cache_key};
use crate::error::ApiError;
use crate::load_balancer::LoadBalancer;
use crate::metrics::{CACHE_HITS, CACHE_MISSES, CACHE_SIZE, UPSTREAM_FAILURES};
use crate::models::{BatchedRequest, ChatMessage, ChatResponse, CompletionRequest, CompletionResponse, Role};

pub const SYSTEM_PROMPT: &str = "You are a personal finance assistant. Answer using the \
user's own transactions and receipts when they are provided, keep amounts exact, and say \
so when the data does not contain the answer. Do not give investment or tax advice.";

// Conversations get the assistant prompt unless they bring their own
pub fn with_system_prompt(mut messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
    if messages.first().map(|m| m.role) != Some(Role::System) {
        messages.insert(0, ChatMessage::system(SYSTEM_PROMPT));
    }
    messages
}

pub struct Worker {
    pub client: reqwest::Client,
    pub api_key: Option<String>,
    pub load_balancer: Arc<LoadBalancer>,
    pub cache: Arc<DashMap<String, CacheEntry>>,
    pub ttl: Duration,
}

impl Worker {
    pub async fn run(self, mut rx: mpsc::Receiver<BatchedRequest>) {
        tracing::info!("chat worker started");

        // keep receiving the requests from queue
        while let Some(batched_req) = rx.recv().await {
            let response = self.handle(&batched_req.user, &batched_req.request).await;
            // caller may have gone away
            let _ = batched_req.response_tx.send(response);
        }
        tracing::info!("chat worker stopped");
    }

    async fn handle(&self, user: &str, request: &CompletionRequest) -> Result<ChatResponse, ApiError> {
        let cache_key = make_cache_key(user, request);

        // check cache first
        if let Some(entry) = self.cache.get(&cache_key) {
            if !entry.is_expired(self.ttl) {
                if let Ok(response) = serde_json::from_str(&entry.response) {
                    CACHE_HITS.inc();
                    tracing::debug!(user, "cache hit");
                    return Ok(response);
                }
            }
        }
        if self
            .cache
            .remove_if(&cache_key, |_, entry| entry.is_expired(self.ttl))
            .is_some()
        {
            CACHE_SIZE.set(self.cache.len() as f64);
        }
        CACHE_MISSES.inc();

        let backend = self.load_balancer.get_backend().ok_or(ApiError::NoBackend)?;
        tracing::debug!(user, backend = %backend.url, "forwarding chat");

        let mut call = self
            .client
            .post(format!("{}/v1/chat/completions", backend.url))
            .json(request);
        if let Some(key) = &self.api_key {
            call = call.bearer_auth(key);
        }

        let res = match call.send().await {
            Ok(res) => res,
            Err(e) => {
                // transport failure marks the backend unhealthy until the next check
                backend.set_healthy(false);
                UPSTREAM_FAILURES.inc();
                tracing::warn!(backend = %backend.url, error = %e, "backend failed, marked unhealthy");
                return Err(ApiError::Upstream(format!("request failed: {e}")));
            }
        };

        if !res.status().is_success() {
            UPSTREAM_FAILURES.inc();
            return Err(ApiError::Upstream(format!("backend returned {}", res.status())));
        }

        let body: CompletionResponse = res
            .json()
            .await
            .map_err(|e| ApiError::Upstream(format!("parse error: {e}")))?;
        let response = ChatResponse::try_from(body)?;

        if let Ok(json) = serde_json::to_string(&response) {
            let evicted = evict_expired(&self.cache, self.ttl);
            if evicted > 0 {
                tracing::debug!(evicted, "evicted expired cache entries");
            }
            self.cache.insert(cache_key, CacheEntry {
                response: json,
                created_at: Instant::now(),
            });
            CACHE_SIZE.set(self.cache.len() as f64);
        }
        Ok(response)
    }
}
