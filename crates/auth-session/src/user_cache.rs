//! Cached current-user entry with freshness and eviction windows.

use crate::api::User;
use auth_config_and_utils::CachePolicyConfig;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Freshness and retention windows for the cached user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Served without refetching while younger than this
    pub fresh_for: Duration,
    /// Dropped entirely after this long without a lookup
    pub evict_after: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            fresh_for: Duration::from_secs(15 * 60),
            evict_after: Duration::from_secs(30 * 60),
        }
    }
}

impl From<&CachePolicyConfig> for CachePolicy {
    fn from(config: &CachePolicyConfig) -> Self {
        Self {
            fresh_for: config.fresh_for(),
            evict_after: config.evict_after(),
        }
    }
}

/// Result of a cache lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    Fresh(User),
    Stale(User),
    Miss,
}

struct Entry {
    user: User,
    fetched_at: Instant,
    last_used: Instant,
}

pub struct UserCache {
    policy: CachePolicy,
    entry: Mutex<Option<Entry>>,
}

impl UserCache {
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            policy,
            entry: Mutex::new(None),
        }
    }

    /// Look up the entry, evicting it if it has gone unused too long.
    pub fn lookup(&self) -> CacheLookup {
        let now = Instant::now();
        let mut slot = self.entry.lock().unwrap();

        let expired = slot
            .as_ref()
            .is_some_and(|e| now.duration_since(e.last_used) >= self.policy.evict_after);
        if expired {
            *slot = None;
        }

        match slot.as_mut() {
            None => CacheLookup::Miss,
            Some(entry) => {
                entry.last_used = now;
                if now.duration_since(entry.fetched_at) < self.policy.fresh_for {
                    CacheLookup::Fresh(entry.user.clone())
                } else {
                    CacheLookup::Stale(entry.user.clone())
                }
            }
        }
    }

    /// Current entry without touching its usage clock.
    pub fn peek(&self) -> Option<User> {
        self.entry.lock().unwrap().as_ref().map(|e| e.user.clone())
    }

    /// Replace the entry with a freshly obtained user.
    pub fn store(&self, user: User) {
        let now = Instant::now();
        *self.entry.lock().unwrap() = Some(Entry {
            user,
            fetched_at: now,
            last_used: now,
        });
    }

    pub fn clear(&self) {
        *self.entry.lock().unwrap() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            email: format!("{id}@example.com"),
            name: None,
            created_at: "2024-01-01T00:00:00Z".to_string(),
            is_active: true,
            oauth_provider: None,
            github_username: None,
            google_email: None,
            avatar_url: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_then_stale() {
        let cache = UserCache::new(CachePolicy::default());
        assert_eq!(cache.lookup(), CacheLookup::Miss);

        cache.store(user("u1"));
        assert_eq!(cache.lookup(), CacheLookup::Fresh(user("u1")));

        tokio::time::advance(Duration::from_secs(14 * 60)).await;
        assert_eq!(cache.lookup(), CacheLookup::Fresh(user("u1")));

        tokio::time::advance(Duration::from_secs(2 * 60)).await;
        assert_eq!(cache.lookup(), CacheLookup::Stale(user("u1")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_evicted_after_disuse() {
        let cache = UserCache::new(CachePolicy::default());
        cache.store(user("u1"));

        tokio::time::advance(Duration::from_secs(30 * 60)).await;
        assert_eq!(cache.lookup(), CacheLookup::Miss);
        assert_eq!(cache.peek(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_use_keeps_entry_alive() {
        let cache = UserCache::new(CachePolicy::default());
        cache.store(user("u1"));

        for _ in 0..3 {
            tokio::time::advance(Duration::from_secs(20 * 60)).await;
            assert_eq!(cache.lookup(), CacheLookup::Stale(user("u1")));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_peek_does_not_refresh_usage() {
        let cache = UserCache::new(CachePolicy::default());
        cache.store(user("u1"));

        tokio::time::advance(Duration::from_secs(20 * 60)).await;
        assert!(cache.peek().is_some());
        tokio::time::advance(Duration::from_secs(10 * 60)).await;
        assert_eq!(cache.lookup(), CacheLookup::Miss);
    }

    #[test]
    fn test_clear() {
        let cache = UserCache::new(CachePolicy::default());
        cache.store(user("u1"));
        cache.clear();
        assert_eq!(cache.peek(), None);
    }

    #[test]
    fn test_policy_from_config() {
        let config = CachePolicyConfig {
            fresh_secs: 5,
            evict_after_secs: 10,
        };
        let policy = CachePolicy::from(&config);
        assert_eq!(policy.fresh_for, Duration::from_secs(5));
        assert_eq!(policy.evict_after, Duration::from_secs(10));
    }
}
