//! In-memory TTL cache for assembled weather payloads.
//!
//! Staleness is checked lazily on read; nothing sweeps the map, so it
//! grows with the number of distinct cities over the process lifetime.
//! Accepted for a transient, restart-tolerant edge cache.

use crate::api::ResponsePayload;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// How long a cached payload stays fresh.
pub const CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// One cached payload with its insertion time.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub at: Instant,
    pub payload: ResponsePayload,
}

impl CacheEntry {
    /// Whether this entry is still younger than `ttl`.
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.at.elapsed() < ttl
    }
}

/// Key-value store for payloads keyed by resolved city name.
///
/// Injected into the aggregator instead of captured as ambient state,
/// so tests can substitute their own store. Keys are used exactly as
/// resolved — no case or whitespace normalization.
pub trait CacheStore: Send + Sync + 'static {
    fn get(&self, city: &str) -> Option<CacheEntry>;
    fn put(&self, city: &str, payload: ResponsePayload);
}

/// Mutex-guarded map, the default store for a single edge process.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, city: &str) -> Option<CacheEntry> {
        self.entries.lock().unwrap().get(city).cloned()
    }

    fn put(&self, city: &str, payload: ResponsePayload) {
        let entry = CacheEntry {
            at: Instant::now(),
            payload,
        };
        self.entries.lock().unwrap().insert(city.to_string(), entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{WeatherReading, SOURCE_LIVE};

    fn payload(city: &str) -> ResponsePayload {
        ResponsePayload {
            city: city.to_string(),
            qweather_location: None,
            weather: WeatherReading {
                temp: 28.0,
                humidity: 60.0,
                precip_probability: 40.0,
                wind_scale: 4.0,
            },
            advice: vec!["出门带伞".to_string()],
            source: SOURCE_LIVE.to_string(),
            timestamp: "2025-06-01T12:00:00.000Z".to_string(),
            cached: false,
            error: None,
        }
    }

    #[test]
    fn put_then_get_is_fresh() {
        let cache = MemoryCache::new();
        cache.put("杭州", payload("杭州"));

        let entry = cache.get("杭州").expect("entry present");
        assert!(entry.is_fresh(CACHE_TTL));
        assert_eq!(entry.payload.city, "杭州");
    }

    #[test]
    fn missing_key_is_absent() {
        let cache = MemoryCache::new();
        assert!(cache.get("上海").is_none());
    }

    #[test]
    fn entry_past_its_ttl_is_stale_but_stays_in_the_map() {
        let cache = MemoryCache::new();
        cache.put("杭州", payload("杭州"));

        // Any nonzero elapsed time exceeds a zero TTL
        let entry = cache.get("杭州").expect("stale entries stay in the map");
        assert!(!entry.is_fresh(Duration::ZERO));
    }

    #[test]
    fn keys_are_not_normalized() {
        let cache = MemoryCache::new();
        cache.put("Hangzhou", payload("Hangzhou"));
        assert!(cache.get("hangzhou").is_none());
        assert!(cache.get(" Hangzhou").is_none());
        assert!(cache.get("Hangzhou").is_some());
    }

    #[test]
    fn put_overwrites_existing_entry() {
        let cache = MemoryCache::new();
        let mut updated = payload("杭州");
        updated.advice = vec!["添衣保暖".to_string()];

        cache.put("杭州", payload("杭州"));
        cache.put("杭州", updated);

        let entry = cache.get("杭州").expect("entry present");
        assert_eq!(entry.payload.advice, vec!["添衣保暖"]);
    }
}
