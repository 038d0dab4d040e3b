//! Short-window duplicate suppression for recommendation queries.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

pub const DEFAULT_CAPACITY: usize = 1024;

/// Remembers recently seen message keys.
///
/// A key seen again inside `window` is a duplicate. Entries older than `ttl`
/// are swept on every check, before the new entry is recorded. When the map
/// is still full after sweeping, the oldest entry makes room.
pub struct DedupCache {
    seen: Mutex<HashMap<String, DateTime<Utc>>>,
    capacity: usize,
    window: Duration,
    ttl: Duration,
}

impl Default for DedupCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, Duration::seconds(2), Duration::seconds(5))
    }
}

impl DedupCache {
    pub fn new(capacity: usize, window: Duration, ttl: Duration) -> Self {
        Self {
            seen: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
            window,
            ttl,
        }
    }

    /// Record `message` at `now`; returns true if it is a duplicate.
    pub fn check_and_record(&self, message: &str, now: DateTime<Utc>) -> bool {
        let key = dedup_key(message);
        let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());

        let ttl = self.ttl;
        seen.retain(|_, at| now - *at <= ttl);

        if let Some(at) = seen.get(&key) {
            if now - *at < self.window {
                return true;
            }
        }

        if seen.len() >= self.capacity && !seen.contains_key(&key) {
            if let Some(oldest) = seen
                .iter()
                .min_by_key(|(_, at)| **at)
                .map(|(k, _)| k.clone())
            {
                seen.remove(&oldest);
            }
        }

        seen.insert(key, now);
        false
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

fn dedup_key(message: &str) -> String {
    message.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap() + Duration::seconds(secs)
    }

    #[test]
    fn test_duplicate_inside_window_is_case_insensitive() {
        let cache = DedupCache::default();
        assert!(!cache.check_and_record("Any drag shows?", at(0)));
        assert!(cache.check_and_record("  any DRAG shows?  ", at(1)));
    }

    #[test]
    fn test_repeat_after_window_is_allowed() {
        let cache = DedupCache::default();
        assert!(!cache.check_and_record("hello", at(0)));
        assert!(!cache.check_and_record("hello", at(3)));
        assert!(cache.check_and_record("hello", at(4)));
    }

    #[test]
    fn test_expired_entries_are_swept() {
        let cache = DedupCache::default();
        cache.check_and_record("one", at(0));
        cache.check_and_record("two", at(1));
        assert_eq!(cache.len(), 2);

        cache.check_and_record("three", at(7));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_full_cache_evicts_oldest() {
        let cache = DedupCache::new(2, Duration::seconds(2), Duration::seconds(60));
        cache.check_and_record("a", at(0));
        cache.check_and_record("b", at(1));
        cache.check_and_record("c", at(2));

        assert_eq!(cache.len(), 2);
        // "a" was evicted, so it is not a duplicate even inside the window.
        assert!(!cache.check_and_record("a", at(3)));
        assert!(cache.check_and_record("c", at(3)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_identical_messages_admit_one() {
        let cache = std::sync::Arc::new(DedupCache::default());
        let now = at(0);

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.check_and_record("any drag shows?", now) })
            })
            .collect();

        let mut admitted = 0;
        for handle in handles {
            if !handle.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 1);
        assert_eq!(cache.len(), 1);
    }
}
