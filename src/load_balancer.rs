use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use thiserror::Error;
use tokio::time::{Duration, interval};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("at least one backend required")]
    NoBackends,
}

// Single chat-completion backend
pub struct Backend {
    pub url: String,
    healthy: AtomicBool,
}

impl Backend {
    pub fn new(url: String) -> Self {
        Self {
            url,
            healthy: AtomicBool::new(true),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Relaxed);
    }
}

pub struct LoadBalancer {
    backends: Vec<Arc<Backend>>,
    current: AtomicUsize,
}

impl LoadBalancer {
    // Build from comma-separated urls "localhost:8000, localhost:8001"
    pub fn new(backends_str: &str) -> Result<Self, BackendError> {
        let backends: Vec<Arc<Backend>> = backends_str
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|url| {
                let full_url = if url.starts_with("http") {
                    url.trim_end_matches('/').to_string()
                } else {
                    format!("http://{}", url.trim_end_matches('/'))
                };
                Arc::new(Backend::new(full_url))
            })
            .collect();

        if backends.is_empty() {
            return Err(BackendError::NoBackends);
        }

        for (i, b) in backends.iter().enumerate() {
            tracing::info!(index = i + 1, url = %b.url, "registered backend");
        }

        Ok(Self {
            backends,
            current: AtomicUsize::new(0),
        })
    }

    // Next healthy backend (round-robin)
    pub fn get_backend(&self) -> Option<Arc<Backend>> {
        let len = self.backends.len();
        let start = self.current.fetch_add(1, Ordering::Relaxed) % len;

        (0..len)
            .map(|i| &self.backends[(start + i) % len])
            .find(|backend| backend.is_healthy())
            .cloned()
    }

    pub fn all_backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    pub fn healthy_count(&self) -> usize {
        self.backends.iter().filter(|b| b.is_healthy()).count()
    }
}

// Polls each backend's model listing
pub async fn health_checker(
    load_balancer: Arc<LoadBalancer>,
    client: reqwest::Client,
    api_key: Option<String>,
    check_interval: Duration,
) {
    let mut interval = interval(check_interval);
    tracing::info!(interval = ?check_interval, "health checker started");

    loop {
        interval.tick().await;

        for backend in load_balancer.all_backends() {
            let mut request = client
                .get(format!("{}/v1/models", backend.url))
                .timeout(Duration::from_secs(5));
            if let Some(key) = &api_key {
                request = request.bearer_auth(key);
            }

            let was_healthy = backend.is_healthy();
            let is_healthy = match request.send().await {
                Ok(res) => res.status().is_success(),
                Err(_) => false,
            };
            backend.set_healthy(is_healthy);

            if was_healthy != is_healthy {
                if is_healthy {
                    tracing::info!(url = %backend.url, "backend is now healthy");
                } else {
                    tracing::warn!(url = %backend.url, "backend is now unhealthy");
                }
            }
        }
        crate::metrics::HEALTHY_BACKENDS.set(load_balancer.healthy_count() as f64);
    }
}
