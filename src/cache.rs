use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::time::{Duration, Instant};
use crate::models::CompletionRequest;

// Cache entry with timestamp
#[derive(Clone)]
pub struct CacheEntry {
    pub response: String,
    pub created_at: Instant,
}

impl CacheEntry {
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() >= ttl
    }
}

// Drops every expired entry, returns how many went
pub fn evict_expired(cache: &DashMap<String, CacheEntry>, ttl: Duration) -> usize {
    let before = cache.len();
    cache.retain(|_, entry| !entry.is_expired(ttl));
    before.saturating_sub(cache.len())
}

// Cache key: hash of user + model + conversation, so replies never cross users
pub fn make_cache_key(user: &str, req: &CompletionRequest) -> String {
    let mut hasher = Sha256::new();
    hasher.update(user.as_bytes());
    hasher.update([0]);
    hasher.update(&req.model);
    for message in &req.messages {
        hasher.update([0]);
        hasher.update(serde_json::to_vec(&message.role).unwrap_or_default());
        hasher.update(&message.content);
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChatMessage, Role};

    fn request(content: &str) -> CompletionRequest {
        CompletionRequest {
            model: "m".to_string(),
            messages: vec![ChatMessage {
                role: Role::User,
                content: content.to_string(),
            }],
            stream: false,
        }
    }

    #[test]
    fn eviction_keeps_fresh_entries() {
        let cache = DashMap::new();
        let ttl = Duration::from_millis(20);
        cache.insert("stale".to_string(), CacheEntry {
            response: "{}".to_string(),
            created_at: Instant::now(),
        });
        std::thread::sleep(Duration::from_millis(40));
        cache.insert("fresh".to_string(), CacheEntry {
            response: "{}".to_string(),
            created_at: Instant::now(),
        });

        assert_eq!(evict_expired(&cache, ttl), 1);
        assert!(cache.contains_key("fresh"));
        assert!(!cache.contains_key("stale"));
    }

    #[test]
    fn key_depends_on_user_and_conversation() {
        let a = make_cache_key("alice", &request("balance?"));
        assert_eq!(a, make_cache_key("alice", &request("balance?")));
        assert_ne!(a, make_cache_key("bob", &request("balance?")));
        assert_ne!(a, make_cache_key("alice", &request("rent?")));
    }
}
