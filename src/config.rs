use clap::Parser;

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "finance-chat-gateway")]
#[command(about = "Rate-limited gateway between the finance app and its assistant model")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    // Chat-completion backends (comma-separated)
    // Example: "localhost:8000,localhost:8001"
    #[arg(short, long, default_value = "localhost:8000")]
    pub backends: String,

    // Model used when the request does not name one
    #[arg(short, long, default_value = "gpt-4o-mini")]
    pub model: String,

    // Bearer token for the backends
    #[arg(long, env = "LLM_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    // Cache TTL in seconds
    #[arg(short, long, default_value_t = 30)]
    pub cache_ttl: u64,

    // Chat messages per user per hour
    #[arg(long, default_value_t = 50)]
    pub chat_limit: u32,

    // Chat messages per user per minute
    #[arg(long, default_value_t = 5)]
    pub chat_burst_limit: u32,

    // API calls per user per minute
    #[arg(long, default_value_t = 100)]
    pub api_limit: u32,

    // Health check interval in seconds
    #[arg(long, default_value_t = 30)]
    pub health_interval: u64,

    // Pending chat requests the worker queue holds
    #[arg(long, default_value_t = 100)]
    pub queue_capacity: usize,

    // Emit logs as JSON lines
    #[arg(long, default_value_t = false)]
    pub log_json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_policy_table() {
        let args = Args::parse_from(["finance-chat-gateway"]);
        assert_eq!(args.chat_limit, 50);
        assert_eq!(args.chat_burst_limit, 5);
        assert_eq!(args.api_limit, 100);
        assert!(!args.log_json);
    }

    #[test]
    fn limits_are_overridable() {
        let args = Args::parse_from([
            "finance-chat-gateway",
            "--chat-limit",
            "10",
            "--backends",
            "a:1,b:2",
        ]);
        assert_eq!(args.chat_limit, 10);
        assert_eq!(args.backends, "a:1,b:2");
    }
}
