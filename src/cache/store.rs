//! In-memory TTL response cache
//!
//! Shields the upstream APIs from redundant calls: identical requests within
//! the freshness window are answered from memory instead of re-fetching.
//! Entries are created lazily on the first miss, overwritten wholesale on
//! refresh, and never swept; an expired entry simply stops being returned
//! until the next `put` supersedes it.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// A single cached upstream response and the time it was captured.
#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    fetched_at: DateTime<Utc>,
}

/// Process-lifetime key/value store with a fixed time-to-live.
///
/// Keys are request fingerprints built by the caller from the semantically
/// relevant parameters (realm, league, data type, ...). Equal parameter sets
/// must produce equal keys; distinct parameter sets must produce distinct
/// keys, otherwise one request's data would be served for another.
///
/// Reads never mutate the map (pure TTL, no recency bookkeeping). Concurrent
/// misses for the same key are not coalesced: each caller fetches upstream
/// independently and the later `put` wins.
#[derive(Debug)]
pub struct ResponseCache<T> {
    ttl: Duration,
    entries: HashMap<String, CacheEntry<T>>,
}

impl<T: Clone> ResponseCache<T> {
    /// Creates an empty cache whose entries stay fresh for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Returns the configured time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the value for `key` iff an entry exists and is younger than
    /// the TTL as of `now`. An absent or expired entry is a miss, not an
    /// error.
    pub fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<T> {
        self.entries.get(key).and_then(|entry| {
            if now - entry.fetched_at < self.ttl {
                Some(entry.value.clone())
            } else {
                None
            }
        })
    }

    /// Fresh-only lookup against the current wall clock.
    pub fn get(&self, key: &str) -> Option<T> {
        self.get_at(key, Utc::now())
    }

    /// Returns the stored value regardless of age.
    ///
    /// This is the explicit degraded-fallback path for endpoints that prefer
    /// a stale snapshot over an error when the upstream is down. Callers that
    /// have no stale policy must use `get`.
    pub fn get_stale(&self, key: &str) -> Option<T> {
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Stores `value` under `key` with capture time `now`, unconditionally
    /// replacing any prior entry. The value is opaque to the cache.
    ///
    /// Callers must not `put` after a failed fetch: a failure leaves the
    /// existing (possibly stale) entry untouched.
    pub fn put_at(&mut self, key: &str, value: T, now: DateTime<Utc>) {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                fetched_at: now,
            },
        );
    }

    /// Stores `value` captured at the current wall clock.
    pub fn put(&mut self, key: &str, value: T) {
        self.put_at(key, value, Utc::now());
    }

    /// Number of entries physically present, including expired ones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no key has ever been populated.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Cloneable handle to a mutex-guarded [`ResponseCache`].
///
/// The tokio runtime is multi-threaded, so the map is guarded; operations
/// are plain in-memory map accesses and never suspend while holding the
/// lock. Constructed once at the composition root and handed to each client
/// that needs it.
#[derive(Debug, Clone)]
pub struct SharedCache<T> {
    inner: Arc<Mutex<ResponseCache<T>>>,
}

impl<T: Clone> SharedCache<T> {
    /// Creates a shared cache with the given time-to-live.
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ResponseCache::new(ttl))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ResponseCache<T>> {
        // A poisoned lock only means some holder panicked mid-read; the map
        // itself is always left in a consistent state.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Fresh-only lookup. See [`ResponseCache::get`].
    pub fn get(&self, key: &str) -> Option<T> {
        self.lock().get(key)
    }

    /// Age-ignoring lookup. See [`ResponseCache::get_stale`].
    pub fn get_stale(&self, key: &str) -> Option<T> {
        self.lock().get_stale(key)
    }

    /// Overwriting store. See [`ResponseCache::put`].
    pub fn put(&self, key: &str, value: T) {
        self.lock().put(key, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Snapshot {
        chaos_equivalent: f64,
        label: String,
    }

    fn snapshot(chaos: f64, label: &str) -> Snapshot {
        Snapshot {
            chaos_equivalent: chaos,
            label: label.to_string(),
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn fresh_entry_is_returned() {
        let mut cache = ResponseCache::new(Duration::seconds(60));
        cache.put_at("pc:Standard:Currency", snapshot(1.0, "a"), t0());

        let hit = cache.get_at("pc:Standard:Currency", t0() + Duration::seconds(30));
        assert_eq!(hit, Some(snapshot(1.0, "a")));
    }

    #[test]
    fn expired_entry_is_a_miss() {
        let mut cache = ResponseCache::new(Duration::seconds(60));
        cache.put_at("pc:Standard:Currency", snapshot(1.0, "a"), t0());

        // Exactly at the TTL boundary the entry is no longer fresh.
        assert_eq!(
            cache.get_at("pc:Standard:Currency", t0() + Duration::seconds(60)),
            None
        );
        assert_eq!(
            cache.get_at("pc:Standard:Currency", t0() + Duration::seconds(3600)),
            None
        );
    }

    #[test]
    fn put_overwrites_wholesale() {
        let mut cache = ResponseCache::new(Duration::seconds(60));
        cache.put_at("k", snapshot(1.0, "first"), t0());
        cache.put_at("k", snapshot(2.0, "second"), t0() + Duration::seconds(10));

        let hit = cache.get_at("k", t0() + Duration::seconds(20));
        assert_eq!(hit, Some(snapshot(2.0, "second")));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn never_populated_key_is_absent() {
        let cache: ResponseCache<Snapshot> = ResponseCache::new(Duration::seconds(60));
        assert_eq!(cache.get_at("nothing", t0()), None);
        assert_eq!(cache.get_at("nothing", t0() + Duration::days(365)), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn keys_are_independent() {
        let mut cache = ResponseCache::new(Duration::seconds(60));
        cache.put_at("pc:Standard:Currency", snapshot(1.0, "a"), t0());

        assert_eq!(cache.get_at("pc:Standard:Fragment", t0()), None);
        assert_eq!(cache.get_at("xbox:Standard:Currency", t0()), None);
    }

    #[test]
    fn refresh_cycle_with_two_minute_ttl() {
        // put at t=0, hit at 60s, miss at 150s, re-put at 150.001s, hit at 151s
        let mut cache = ResponseCache::new(Duration::milliseconds(120_000));
        cache.put_at("Mercenaries:Currency", snapshot(1.0, "initial"), t0());

        assert_eq!(
            cache.get_at("Mercenaries:Currency", t0() + Duration::milliseconds(60_000)),
            Some(snapshot(1.0, "initial"))
        );
        assert_eq!(
            cache.get_at("Mercenaries:Currency", t0() + Duration::milliseconds(150_000)),
            None
        );

        cache.put_at(
            "Mercenaries:Currency",
            snapshot(1.1, "updated"),
            t0() + Duration::milliseconds(150_001),
        );
        assert_eq!(
            cache.get_at("Mercenaries:Currency", t0() + Duration::milliseconds(151_000)),
            Some(snapshot(1.1, "updated"))
        );
    }

    #[test]
    fn stale_read_ignores_ttl() {
        let mut cache = ResponseCache::new(Duration::seconds(1));
        cache.put_at("k", snapshot(3.0, "old"), t0());

        assert_eq!(cache.get_at("k", t0() + Duration::hours(1)), None);
        assert_eq!(cache.get_stale("k"), Some(snapshot(3.0, "old")));
    }

    #[test]
    fn stale_read_on_empty_key_is_absent() {
        let cache: ResponseCache<Snapshot> = ResponseCache::new(Duration::seconds(1));
        assert_eq!(cache.get_stale("k"), None);
    }

    #[test]
    fn get_does_not_mutate_state() {
        let mut cache = ResponseCache::new(Duration::seconds(60));
        cache.put_at("k", snapshot(1.0, "a"), t0());

        for _ in 0..5 {
            let _ = cache.get_at("k", t0() + Duration::seconds(1));
            let _ = cache.get_at("missing", t0());
        }
        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.get_at("k", t0() + Duration::seconds(59)),
            Some(snapshot(1.0, "a"))
        );
    }

    #[test]
    fn shared_cache_round_trip() {
        let cache: SharedCache<Snapshot> = SharedCache::new(Duration::seconds(60));
        assert_eq!(cache.get("k"), None);

        cache.put("k", snapshot(4.0, "shared"));
        assert_eq!(cache.get("k"), Some(snapshot(4.0, "shared")));

        let clone = cache.clone();
        clone.put("k", snapshot(5.0, "via clone"));
        assert_eq!(cache.get("k"), Some(snapshot(5.0, "via clone")));
    }

    #[tokio::test]
    async fn shared_cache_across_tasks() {
        let cache: SharedCache<Snapshot> = SharedCache::new(Duration::seconds(60));
        let writer = cache.clone();

        let handle = tokio::spawn(async move {
            writer.put("task", snapshot(9.0, "from task"));
        });
        handle.await.unwrap();

        assert_eq!(cache.get("task"), Some(snapshot(9.0, "from task")));
    }
}
