pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod load_balancer;
pub mod metrics;
pub mod models;
pub mod navigation;
pub mod rate_limit;
pub mod state;
pub mod validation;
pub mod worker;

#[cfg(test)]
mod test_support;
