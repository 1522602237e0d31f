use axum::http::{HeaderMap, HeaderName, HeaderValue};
use dashmap::DashMap;
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

// Rate limit entry - tracks requests per key inside one fixed window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub requests: u32,
    pub reset_time: i64, // epoch millis
}

/// How many requests a key may make per window.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
    /// Maps the caller identifier to the stored key. `None` uses it as-is.
    pub key_generator: Option<fn(&str) -> String>,
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            key_generator: None,
        }
    }

    pub fn with_key_generator(mut self, key_generator: fn(&str) -> String) -> Self {
        self.key_generator = Some(key_generator);
        self
    }

    fn window_ms(&self) -> i64 {
        i64::try_from(self.window.as_millis()).unwrap_or(i64::MAX)
    }

    fn key_for(&self, identifier: &str) -> String {
        match self.key_generator {
            Some(generate) => generate(identifier),
            None => identifier.to_string(),
        }
    }
}

// Outcome of a single check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitResult {
    pub success: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_time: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>, // seconds, only on rejection
}

impl RateLimitResult {
    /// Headers describing this outcome, `Retry-After` included on rejection.
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let reset_secs = self.reset_time.saturating_add(999).div_euclid(1000);

        headers.insert(
            HeaderName::from_static("x-ratelimit-limit"),
            HeaderValue::from(self.limit),
        );
        headers.insert(
            HeaderName::from_static("x-ratelimit-remaining"),
            HeaderValue::from(self.remaining),
        );
        headers.insert(
            HeaderName::from_static("x-ratelimit-reset"),
            HeaderValue::from(reset_secs),
        );
        if let Some(retry_after) = self.retry_after {
            headers.insert(axum::http::header::RETRY_AFTER, HeaderValue::from(retry_after));
        }
        headers
    }
}

/// Storage behind the limiter. Implementations must make `consume` atomic per key.
pub trait RateLimitStore: Send + Sync {
    fn consume(&self, key: &str, max_requests: u32, window_ms: i64, now_ms: i64) -> RateLimitResult;

    /// Drops every entry whose window has ended. Returns how many were removed.
    fn sweep_expired(&self, now_ms: i64) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// Single-process store. Counts are not shared between instances.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, RateLimitEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<RateLimitEntry> {
        self.entries.get(key).map(|entry| *entry)
    }
}

impl RateLimitStore for MemoryStore {
    fn consume(
        &self,
        key: &str,
        max_requests: u32,
        window_ms: i64,
        now_ms: i64,
    ) -> RateLimitResult {
        let fresh = RateLimitEntry {
            requests: 0,
            reset_time: now_ms.saturating_add(window_ms),
        };

        // entry() holds the shard lock until the guard drops
        let mut entry = self.entries.entry(key.to_string()).or_insert(fresh);

        // window over..? start a new one, no carried debt
        if now_ms >= entry.reset_time {
            *entry = fresh;
        }

        if entry.requests >= max_requests {
            let wait_ms = (entry.reset_time - now_ms).max(0);
            return RateLimitResult {
                success: false,
                limit: max_requests,
                remaining: 0,
                reset_time: entry.reset_time,
                retry_after: Some((wait_ms.saturating_add(999) / 1000) as u64),
            };
        }

        entry.requests += 1;
        RateLimitResult {
            success: true,
            limit: max_requests,
            remaining: max_requests - entry.requests,
            reset_time: entry.reset_time,
            retry_after: None,
        }
    }

    fn sweep_expired(&self, now_ms: i64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| now_ms < entry.reset_time);
        before.saturating_sub(self.entries.len())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Source of "now" in epoch millis.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

pub const DEFAULT_SWEEP_PROBABILITY: f64 = 0.01;

/// Fixed-window limiter over an injectable store.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    clock: Arc<dyn Clock>,
    sweep_probability: f64,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn RateLimitStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            sweep_probability: DEFAULT_SWEEP_PROBABILITY,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn with_sweep_probability(mut self, probability: f64) -> Self {
        self.sweep_probability = probability.clamp(0.0, 1.0);
        self
    }

    /// Counts one request for `identifier` against `config`.
    pub fn check(&self, identifier: &str, config: &RateLimitConfig) -> RateLimitResult {
        let now_ms = self.clock.now_ms();

        if self.sweep_probability > 0.0 && rand::thread_rng().gen_bool(self.sweep_probability) {
            let removed = self.store.sweep_expired(now_ms);
            tracing::debug!(removed, "swept expired rate limit entries");
        }

        let key = config.key_for(identifier);
        let result = self
            .store
            .consume(&key, config.max_requests, config.window_ms(), now_ms);

        crate::metrics::RATE_LIMIT_ENTRIES.set(self.store.len() as f64);
        if !result.success {
            tracing::warn!(key = %key, retry_after = ?result.retry_after, "rate limit exceeded");
        }
        result
    }

    pub fn sweep(&self) -> usize {
        self.store.sweep_expired(self.clock.now_ms())
    }

    pub fn tracked_keys(&self) -> usize {
        self.store.len()
    }
}

// Named policies
pub const HOUR: Duration = Duration::from_secs(60 * 60);
pub const MINUTE: Duration = Duration::from_secs(60);

fn chat_key(user: &str) -> String {
    format!("chat:{user}")
}

fn chat_burst_key(user: &str) -> String {
    format!("chat-burst:{user}")
}

fn api_key(user: &str) -> String {
    format!("api:{user}")
}

fn upload_key(user: &str) -> String {
    format!("upload:{user}")
}

#[derive(Debug, Clone, Copy)]
pub struct Policies {
    pub chat: RateLimitConfig,
    pub chat_burst: RateLimitConfig,
    pub api: RateLimitConfig,
    pub upload: RateLimitConfig,
}

impl Default for Policies {
    fn default() -> Self {
        Self {
            chat: RateLimitConfig::new(50, HOUR).with_key_generator(chat_key),
            chat_burst: RateLimitConfig::new(5, MINUTE).with_key_generator(chat_burst_key),
            api: RateLimitConfig::new(100, MINUTE).with_key_generator(api_key),
            upload: RateLimitConfig::new(10, HOUR).with_key_generator(upload_key),
        }
    }
}

impl Policies {
    pub fn from_args(args: &crate::config::Args) -> Self {
        let mut policies = Self::default();
        policies.chat.max_requests = args.chat_limit;
        policies.chat_burst.max_requests = args.chat_burst_limit;
        policies.api.max_requests = args.api_limit;
        policies
    }
}
