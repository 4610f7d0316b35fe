//! Keyed data cache with per-key freshness timestamps.
//!
//! Values are opaque JSON; [`DataCache::set_typed`] and
//! [`DataCache::get_typed`] convert at the edge for callers that know the
//! payload type. A value and its fetch time are always written and removed
//! together.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use store_core::clock::Clock;
use store_core::error::Result;
use store_core::models::DEFAULT_CACHE_MAX_AGE_MS;

/// Short-lived cache of collaborator-supplied payloads.
pub struct DataCache {
    cached_data: HashMap<String, Value>,
    last_data_fetch: HashMap<String, i64>,
    clock: Arc<dyn Clock>,
    default_max_age_ms: i64,
}

impl DataCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_default_max_age(clock, DEFAULT_CACHE_MAX_AGE_MS)
    }

    pub fn with_default_max_age(clock: Arc<dyn Clock>, default_max_age_ms: i64) -> Self {
        Self {
            cached_data: HashMap::new(),
            last_data_fetch: HashMap::new(),
            clock,
            default_max_age_ms,
        }
    }

    /// Store `value` under `key` and stamp it with the current time.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        let now = self.clock.now_ms();
        tracing::debug!(key = %key, "cache entry set");
        self.last_data_fetch.insert(key.clone(), now);
        self.cached_data.insert(key, value);
    }

    /// Serialize `value` and store it. Fails only when `T` cannot be
    /// represented as JSON; the cache is untouched in that case.
    pub fn set_typed<T: Serialize>(&mut self, key: impl Into<String>, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.set(key, value);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.cached_data.get(key)
    }

    /// Read `key` as a `T`. A payload of another shape reads as absent.
    pub fn get_typed<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.cached_data.get(key)?;
        match serde_json::from_value(value.clone()) {
            Ok(typed) => Some(typed),
            Err(e) => {
                tracing::debug!(key, error = %e, "cached payload has unexpected shape");
                None
            }
        }
    }

    /// Remove one entry, or everything when `key` is `None`.
    pub fn clear(&mut self, key: Option<&str>) {
        match key {
            Some(key) => {
                self.cached_data.remove(key);
                self.last_data_fetch.remove(key);
            }
            None => {
                self.cached_data.clear();
                self.last_data_fetch.clear();
            }
        }
    }

    /// `true` when `key` was never fetched or is older than `max_age_ms`.
    pub fn is_stale(&self, key: &str, max_age_ms: i64) -> bool {
        match self.last_data_fetch.get(key) {
            None => true,
            Some(&fetched) => self.clock.now_ms() - fetched > max_age_ms,
        }
    }

    /// [`is_stale`](Self::is_stale) with the default max age.
    pub fn is_stale_default(&self, key: &str) -> bool {
        self.is_stale(key, self.default_max_age_ms)
    }

    pub fn last_fetch(&self, key: &str) -> Option<i64> {
        self.last_data_fetch.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.cached_data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cached_data.is_empty()
    }

    /// Sorted copy of the payloads.
    pub fn data(&self) -> BTreeMap<String, Value> {
        self.cached_data
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Sorted copy of the fetch times.
    pub fn fetch_times(&self) -> BTreeMap<String, i64> {
        self.last_data_fetch
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use store_core::clock::ManualClock;

    fn cache() -> (Arc<ManualClock>, DataCache) {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let cache = DataCache::new(clock.clone());
        (clock, cache)
    }

    fn assert_key_sets_match(cache: &DataCache) {
        let data: Vec<String> = cache.data().into_keys().collect();
        let times: Vec<String> = cache.fetch_times().into_keys().collect();
        assert_eq!(data, times);
    }

    #[test]
    fn test_missing_key_is_absent_and_stale() {
        let (_, c) = cache();
        assert!(c.get("users").is_none());
        assert!(c.is_stale_default("users"));
        assert!(c.last_fetch("users").is_none());
    }

    #[test]
    fn test_fresh_after_set() {
        let (_, mut c) = cache();
        c.set("users", json!([1, 2, 3]));
        assert_eq!(c.get("users"), Some(&json!([1, 2, 3])));
        assert!(!c.is_stale_default("users"));
        assert_eq!(c.last_fetch("users"), Some(1_000_000));
    }

    #[test]
    fn test_stale_after_clear() {
        let (_, mut c) = cache();
        c.set("users", json!(1));
        c.clear(Some("users"));
        assert!(c.is_stale_default("users"));
        assert!(c.get("users").is_none());
    }

    #[test]
    fn test_staleness_boundary() {
        let (clock, mut c) = cache();
        c.set("k", json!(null));

        clock.advance(300_000);
        assert!(!c.is_stale_default("k"), "exactly max age is still fresh");

        clock.advance(1);
        assert!(c.is_stale_default("k"));
    }

    #[test]
    fn test_custom_max_age() {
        let (clock, mut c) = cache();
        c.set("k", json!("v"));
        clock.advance(1_001);
        assert!(c.is_stale("k", 1_000));
        assert!(!c.is_stale("k", 10_000));
    }

    #[test]
    fn test_set_refreshes_timestamp() {
        let (clock, mut c) = cache();
        c.set("k", json!(1));
        clock.advance(400_000);
        assert!(c.is_stale_default("k"));

        c.set("k", json!(2));
        assert!(!c.is_stale_default("k"));
        assert_eq!(c.get("k"), Some(&json!(2)));
    }

    #[test]
    fn test_clear_all() {
        let (_, mut c) = cache();
        c.set("a", json!(1));
        c.set("b", json!(2));
        c.clear(None);
        assert!(c.is_empty());
        assert!(c.fetch_times().is_empty());
    }

    #[test]
    fn test_key_sets_stay_in_sync() {
        let (clock, mut c) = cache();
        let script: &[(&str, Option<&str>)] = &[
            ("set", Some("a")),
            ("set", Some("b")),
            ("clear", Some("a")),
            ("set", Some("c")),
            ("clear", Some("missing")),
            ("set", Some("a")),
            ("clear", None),
            ("set", Some("d")),
        ];
        for (op, key) in script {
            clock.advance(10);
            match (*op, key) {
                ("set", Some(k)) => c.set(*k, json!(k)),
                ("clear", k) => c.clear(*k),
                _ => unreachable!(),
            }
            assert_key_sets_match(&c);
        }
        assert_eq!(c.len(), 1);
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Profile {
        name: String,
        visits: u32,
    }

    #[test]
    fn test_typed_round_trip() {
        let (_, mut c) = cache();
        let profile = Profile {
            name: "Ada".to_string(),
            visits: 3,
        };
        c.set_typed("profile", &profile).unwrap();
        assert_eq!(c.get_typed::<Profile>("profile"), Some(profile));
    }

    #[test]
    fn test_typed_shape_mismatch_reads_absent() {
        let (_, mut c) = cache();
        c.set("profile", json!("just a string"));
        assert!(c.get_typed::<Profile>("profile").is_none());
        assert!(c.get("profile").is_some());
    }
}
