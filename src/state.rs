use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use crate::cache::CacheEntry;
use crate::load_balancer::LoadBalancer;
use crate::models::BatchedRequest;
use crate::rate_limit::{Policies, RateLimiter};

// app's shared state

pub struct AppState {
    pub cache: Arc<DashMap<String, CacheEntry>>, // shared with the worker
    pub load_balancer: Arc<LoadBalancer>,
    pub limiter: RateLimiter,
    pub policies: Policies,
    pub default_model: String,
    pub batch_tx: mpsc::Sender<BatchedRequest>,
}
