use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};


lazy_static! {
    pub static ref CHAT_REQUESTS: Counter =
        register_counter!("gateway_chat_requests_total", "Total number of chat requests").unwrap();
    pub static ref RATE_LIMITED: Counter =
        register_counter!("gateway_rate_limited_total", "Requests rejected by a rate limit policy").unwrap();
    pub static ref REJECTED_MESSAGES: Counter =
        register_counter!("gateway_rejected_messages_total", "Chat requests that failed validation").unwrap();
    pub static ref UPSTREAM_FAILURES: Counter =
        register_counter!("gateway_upstream_failures_total", "Failed calls to chat backends").unwrap();
    pub static ref CACHE_HITS: Counter =
        register_counter!("gateway_cache_hits_total", "Total cache hits").unwrap();
    pub static ref CACHE_MISSES: Counter =
        register_counter!("gateway_cache_misses_total", "Total cache misses").unwrap();
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "gateway_chat_latency_seconds",
        "Chat request latency in seconds"
    )
    .unwrap();
    pub static ref CACHE_SIZE: Gauge =
        register_gauge!("gateway_cache_size", "Current number of items in cache").unwrap();
    pub static ref RATE_LIMIT_ENTRIES: Gauge =
        register_gauge!("gateway_rate_limit_entries", "Keys tracked by the rate limiter").unwrap();
    pub static ref HEALTHY_BACKENDS: Gauge =
        register_gauge!("gateway_healthy_backends", "Backends currently passing health checks").unwrap();
}
