//! Short-TTL memoization for dashboard aggregates
//!
//! Expiry-on-read only; there is no background eviction.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

struct CachedValue {
    expires_at: DateTime<Utc>,
    value: serde_json::Value,
}

#[derive(Default)]
pub struct StatsCache {
    entries: DashMap<String, CachedValue>,
}

impl StatsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        let now = Utc::now();
        // The read guard must be released before removing the key.
        let (expired, value) = match self.entries.get(key) {
            Some(entry) if entry.expires_at > now => (false, Some(entry.value.clone())),
            Some(_) => (true, None),
            None => (false, None),
        };
        if expired {
            self.entries.remove(key);
        }
        value
    }

    pub fn put(&self, key: &str, value: serde_json::Value, ttl_seconds: i64) {
        self.entries.insert(
            key.to_string(),
            CachedValue {
                expires_at: Utc::now() + Duration::seconds(ttl_seconds),
                value,
            },
        );
    }

    pub fn invalidate_prefix(&self, prefix: &str) {
        self.entries.retain(|key, _| !key.starts_with(prefix));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_and_expiry() {
        let cache = StatsCache::new();
        cache.put("stats:1", serde_json::json!({"total": 3}), 60);
        assert_eq!(cache.get("stats:1"), Some(serde_json::json!({"total": 3})));

        cache.put("stats:2", serde_json::json!(1), -1);
        assert_eq!(cache.get("stats:2"), None);
        // Expired entry was dropped on read.
        assert!(!cache.entries.contains_key("stats:2"));
    }

    #[test]
    fn test_invalidate_prefix() {
        let cache = StatsCache::new();
        cache.put("stats:1", serde_json::json!(1), 60);
        cache.put("engagement:1", serde_json::json!(2), 60);
        cache.invalidate_prefix("stats:");
        assert_eq!(cache.get("stats:1"), None);
        assert_eq!(cache.get("engagement:1"), Some(serde_json::json!(2)));
    }
}
