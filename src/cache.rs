//! Response cache for Vultr API GET requests.
//!
//! Responses are split into three classes with their own TTL and capacity:
//! domain listings change rarely, record listings change often, and
//! everything else sits in between.

use crate::config::CacheConfig;
use moka::notification::RemovalCause;
use moka::sync::Cache;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Which cache an endpoint belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheClass {
    Domain,
    Record,
    General,
}

impl CacheClass {
    /// Classify an API endpoint path
    pub fn for_endpoint(endpoint: &str) -> Self {
        if endpoint.contains("/records") {
            CacheClass::Record
        } else if endpoint.contains("/domains") {
            CacheClass::Domain
        } else {
            CacheClass::General
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            CacheClass::Domain => "domain",
            CacheClass::Record => "record",
            CacheClass::General => "general",
        }
    }
}

/// Cache statistics snapshot
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub evictions: u64,
    pub domain_cache_size: u64,
    pub record_cache_size: u64,
    pub general_cache_size: u64,
    pub hit_rate: f64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    evictions: AtomicU64,
}

/// TTL + size bounded cache of API responses, keyed by request
pub struct ResponseCache {
    domain: Cache<String, Value>,
    record: Cache<String, Value>,
    general: Cache<String, Value>,
    counters: Arc<Counters>,
}

impl ResponseCache {
    /// Build the three cache classes from configuration
    pub fn new(config: &CacheConfig) -> Self {
        let counters = Arc::new(Counters::default());
        let quarter = (config.max_size / 4).max(1);
        let half = (config.max_size / 2).max(1);

        Self {
            domain: Self::build(quarter, config.domain_ttl, counters.clone()),
            record: Self::build(half, config.record_ttl, counters.clone()),
            general: Self::build(quarter, config.default_ttl, counters.clone()),
            counters,
        }
    }

    fn build(capacity: u64, ttl: Duration, counters: Arc<Counters>) -> Cache<String, Value> {
        Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .eviction_listener(move |_key, _value, cause: RemovalCause| {
                if cause.was_evicted() {
                    counters.evictions.fetch_add(1, Ordering::Relaxed);
                }
            })
            .build()
    }

    fn cache_for(&self, class: CacheClass) -> &Cache<String, Value> {
        match class {
            CacheClass::Domain => &self.domain,
            CacheClass::Record => &self.record,
            CacheClass::General => &self.general,
        }
    }

    /// Build a stable key from method, endpoint and query parameters
    pub fn key(method: &str, endpoint: &str, params: &[(String, String)]) -> String {
        let mut sorted: Vec<&(String, String)> = params.iter().collect();
        sorted.sort();

        let query = sorted
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        if query.is_empty() {
            format!("{} {}", method.to_uppercase(), endpoint)
        } else {
            format!("{} {}?{}", method.to_uppercase(), endpoint, query)
        }
    }

    /// Look up a cached response. Only GET requests are ever cached.
    pub fn get(&self, method: &str, endpoint: &str, params: &[(String, String)]) -> Option<Value> {
        if !method.eq_ignore_ascii_case("GET") {
            return None;
        }

        let key = Self::key(method, endpoint, params);
        let class = CacheClass::for_endpoint(endpoint);

        match self.cache_for(class).get(&key) {
            Some(value) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                debug!(endpoint = %endpoint, cache_type = class.as_str(), "Cache hit");
                Some(value)
            }
            None => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a response. Non-GET requests and null values are ignored.
    pub fn set(&self, method: &str, endpoint: &str, params: &[(String, String)], value: Value) {
        if !method.eq_ignore_ascii_case("GET") || value.is_null() {
            return;
        }

        let key = Self::key(method, endpoint, params);
        let class = CacheClass::for_endpoint(endpoint);

        self.cache_for(class).insert(key, value);
        self.counters.sets.fetch_add(1, Ordering::Relaxed);
        debug!(endpoint = %endpoint, cache_type = class.as_str(), "Cache set");
    }

    /// Invalidate cache entries matching a pattern.
    ///
    /// `None` clears everything; otherwise the pattern selects a class by
    /// substring ("domain", then "record", else general).
    pub fn invalidate(&self, pattern: Option<&str>) {
        match pattern {
            None => {
                self.domain.invalidate_all();
                self.record.invalidate_all();
                self.general.invalidate_all();
                info!("All caches cleared");
            }
            Some(pattern) => {
                let lowered = pattern.to_lowercase();
                let class = if lowered.contains("domain") {
                    CacheClass::Domain
                } else if lowered.contains("record") {
                    CacheClass::Record
                } else {
                    CacheClass::General
                };
                self.cache_for(class).invalidate_all();
                info!(pattern = %pattern, cache_type = class.as_str(), "Cache cleared");
            }
        }
    }

    /// Invalidate the class that owns an endpoint after a write.
    ///
    /// Record writes also drop the domain class so zone exports never mix
    /// a fresh record list with a stale domain.
    pub fn invalidate_endpoint(&self, endpoint: &str) {
        let class = CacheClass::for_endpoint(endpoint);
        self.cache_for(class).invalidate_all();
        if class == CacheClass::Record {
            self.domain.invalidate_all();
        }
        debug!(endpoint = %endpoint, cache_type = class.as_str(), "Cache invalidated after write");
    }

    /// Snapshot of hit/miss counters and cache sizes
    pub fn stats(&self) -> CacheStats {
        self.domain.run_pending_tasks();
        self.record.run_pending_tasks();
        self.general.run_pending_tasks();

        let hits = self.counters.hits.load(Ordering::Relaxed);
        let misses = self.counters.misses.load(Ordering::Relaxed);

        CacheStats {
            hits,
            misses,
            sets: self.counters.sets.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            domain_cache_size: self.domain.entry_count(),
            record_cache_size: self.record.entry_count(),
            general_cache_size: self.general.entry_count(),
            hit_rate: hits as f64 / (hits + misses).max(1) as f64,
        }
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_endpoint_classification() {
        assert_eq!(CacheClass::for_endpoint("/domains"), CacheClass::Domain);
        assert_eq!(CacheClass::for_endpoint("/domains/example.com"), CacheClass::Domain);
        assert_eq!(
            CacheClass::for_endpoint("/domains/example.com/records"),
            CacheClass::Record
        );
        assert_eq!(CacheClass::for_endpoint("/instances"), CacheClass::General);
    }

    #[test]
    fn test_key_is_order_independent() {
        let a = ResponseCache::key("get", "/plans", &params(&[("type", "vc2"), ("per_page", "100")]));
        let b = ResponseCache::key("GET", "/plans", &params(&[("per_page", "100"), ("type", "vc2")]));
        assert_eq!(a, b);
        assert_eq!(ResponseCache::key("GET", "/plans", &[]), "GET /plans");
    }

    #[test]
    fn test_only_get_is_cached() {
        let cache = ResponseCache::default();
        cache.set("POST", "/domains", &[], json!({"ok": true}));
        assert!(cache.get("POST", "/domains", &[]).is_none());
        assert!(cache.get("GET", "/domains", &[]).is_none());

        cache.set("GET", "/domains", &[], json!({"domains": []}));
        assert_eq!(cache.get("GET", "/domains", &[]), Some(json!({"domains": []})));

        cache.set("GET", "/regions", &[], Value::Null);
        assert!(cache.get("GET", "/regions", &[]).is_none());
    }

    #[test]
    fn test_stats_and_hit_rate() {
        let cache = ResponseCache::default();
        cache.set("GET", "/instances", &[], json!([1, 2, 3]));
        assert!(cache.get("GET", "/instances", &[]).is_some());
        assert!(cache.get("GET", "/instances", &[]).is_some());
        assert!(cache.get("GET", "/ssh-keys", &[]).is_none());

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.sets, 1);
        assert_eq!(stats.general_cache_size, 1);
        assert!((stats.hit_rate - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_stats_hit_rate_is_zero() {
        let stats = ResponseCache::default().stats();
        assert_eq!(stats.hit_rate, 0.0);
    }

    #[test]
    fn test_invalidate_by_pattern() {
        let cache = ResponseCache::default();
        cache.set("GET", "/domains", &[], json!(1));
        cache.set("GET", "/domains/a.com/records", &[], json!(2));
        cache.set("GET", "/instances", &[], json!(3));

        cache.invalidate(Some("record"));
        assert!(cache.get("GET", "/domains/a.com/records", &[]).is_none());
        assert!(cache.get("GET", "/domains", &[]).is_some());
        assert!(cache.get("GET", "/instances", &[]).is_some());

        cache.invalidate(Some("Domain"));
        assert!(cache.get("GET", "/domains", &[]).is_none());

        cache.invalidate(Some("instances"));
        assert!(cache.get("GET", "/instances", &[]).is_none());
    }

    #[test]
    fn test_invalidate_all() {
        let cache = ResponseCache::default();
        cache.set("GET", "/domains", &[], json!(1));
        cache.set("GET", "/instances", &[], json!(2));
        cache.invalidate(None);
        assert!(cache.get("GET", "/domains", &[]).is_none());
        assert!(cache.get("GET", "/instances", &[]).is_none());
    }

    #[test]
    fn test_record_write_drops_domain_class() {
        let cache = ResponseCache::default();
        cache.set("GET", "/domains/a.com", &[], json!(1));
        cache.set("GET", "/domains/a.com/records", &[], json!(2));
        cache.set("GET", "/instances", &[], json!(3));

        cache.invalidate_endpoint("/domains/a.com/records/abc");
        assert!(cache.get("GET", "/domains/a.com", &[]).is_none());
        assert!(cache.get("GET", "/domains/a.com/records", &[]).is_none());
        assert!(cache.get("GET", "/instances", &[]).is_some());
    }

    #[test]
    fn test_entries_expire() {
        let config = CacheConfig {
            default_ttl: Duration::from_millis(50),
            ..CacheConfig::default()
        };
        let cache = ResponseCache::new(&config);
        cache.set("GET", "/regions", &[], json!(["ewr"]));
        std::thread::sleep(Duration::from_millis(120));
        assert!(cache.get("GET", "/regions", &[]).is_none());
    }

    #[test]
    fn test_expired_entries_count_as_evictions() {
        let config = CacheConfig {
            default_ttl: Duration::from_millis(50),
            ..CacheConfig::default()
        };
        let cache = ResponseCache::new(&config);
        cache.set("GET", "/regions", &[], json!(["ewr"]));
        cache.set("GET", "/plans", &[], json!(["vc2-1c-1gb"]));
        std::thread::sleep(Duration::from_millis(120));

        let stats = cache.stats();
        assert!(stats.evictions >= 2, "evictions = {}", stats.evictions);
        assert_eq!(stats.general_cache_size, 0);
    }

    #[test]
    fn test_overfilled_class_counts_evictions() {
        let config = CacheConfig {
            max_size: 8,
            ..CacheConfig::default()
        };
        let cache = ResponseCache::new(&config);
        for i in 0..64 {
            cache.set("GET", &format!("/instances/i-{}", i), &[], json!({"id": i}));
        }

        let stats = cache.stats();
        assert!(stats.evictions > 0);
        assert!(stats.general_cache_size <= 2);
        assert_eq!(stats.sets, 64);
    }
}
