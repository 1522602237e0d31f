use anyhow::Context;
use clap::Parser;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use finance_chat_gateway::config::Args;
use finance_chat_gateway::handlers::router;
use finance_chat_gateway::load_balancer::{LoadBalancer, health_checker};
use finance_chat_gateway::models::BatchedRequest;
use finance_chat_gateway::rate_limit::{Policies, RateLimiter};
use finance_chat_gateway::state::AppState;
use finance_chat_gateway::worker::Worker;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    let load_balancer = Arc::new(LoadBalancer::new(&args.backends)?);
    let client = reqwest::Client::new();
    let cache = Arc::new(DashMap::new());
    let (batch_tx, batch_rx) = mpsc::channel::<BatchedRequest>(args.queue_capacity);

    tokio::spawn(health_checker(
        load_balancer.clone(),
        client.clone(),
        args.api_key.clone(),
        Duration::from_secs(args.health_interval),
    ));

    let worker = Worker {
        client,
        api_key: args.api_key.clone(),
        load_balancer: load_balancer.clone(),
        cache: cache.clone(),
        ttl: Duration::from_secs(args.cache_ttl),
    };
    tokio::spawn(worker.run(batch_rx));

    let policies = Policies::from_args(&args);
    let state = Arc::new(AppState {
        cache,
        load_balancer,
        limiter: RateLimiter::in_memory(),
        policies,
        default_model: args.model.clone(),
        batch_tx,
    });

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(
        %addr,
        model = %args.model,
        cache_ttl = args.cache_ttl,
        chat_per_hour = policies.chat.max_requests,
        chat_per_minute = policies.chat_burst.max_requests,
        api_per_minute = policies.api.max_requests,
        "gateway listening"
    );

    axum::serve(listener, router(state)).await?;
    Ok(())
}
