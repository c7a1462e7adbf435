//! Layered response cache: memory LRU in front of a TTL disk store, with
//! room for an optional remote layer behind the same trait.
//!
//! A hit at a slower layer backfills every faster layer before returning.
//! Layer failures degrade silently to the remaining layers; the stack never
//! surfaces a cache error to callers. Cache hits are consulted before any
//! budget reservation, so repeated runs cost nothing.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use sha2::{Digest, Sha256};

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Derive a deterministic cache key from an operation name and its full
/// parameter set. Pairs are sorted before hashing so identical requests
/// collide regardless of parameter order.
pub fn cache_key(op: &str, params: &[(&str, &str)]) -> String {
    let mut pairs: Vec<(&str, &str)> = params.to_vec();
    pairs.sort_unstable();

    let mut hasher = Sha256::new();
    hasher.update(op.as_bytes());
    for (k, v) in pairs {
        hasher.update([0u8]);
        hasher.update(k.as_bytes());
        hasher.update([1u8]);
        hasher.update(v.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

// ---------------------------------------------------------------------------
// Layer trait
// ---------------------------------------------------------------------------

/// One cache layer. Implementations swallow their own failures (a warn log
/// at most) and report them as misses; the stack relies on that.
pub trait CacheLayer: Send + Sync {
    fn name(&self) -> &'static str;
    fn get(&self, key: &str) -> Option<serde_json::Value>;
    fn set(&self, key: &str, value: &serde_json::Value);
    fn delete(&self, key: &str);
}

// ---------------------------------------------------------------------------
// Memory layer (capacity LRU, no TTL)
// ---------------------------------------------------------------------------

struct MemoryInner {
    map: HashMap<String, serde_json::Value>,
    // Recency order, oldest first. Small capacities keep the linear
    // reorder cheap.
    order: VecDeque<String>,
}

/// In-process LRU layer.
pub struct MemoryCache {
    capacity: usize,
    inner: Mutex<MemoryInner>,
}

impl MemoryCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(MemoryInner {
                map: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    fn touch(order: &mut VecDeque<String>, key: &str) {
        if let Some(pos) = order.iter().position(|k| k == key) {
            order.remove(pos);
        }
        order.push_back(key.to_string());
    }
}

impl CacheLayer for MemoryCache {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn get(&self, key: &str) -> Option<serde_json::Value> {
        let mut inner = self.inner.lock().ok()?;
        let value = inner.map.get(key).cloned()?;
        Self::touch(&mut inner.order, key);
        Some(value)
    }

    fn set(&self, key: &str, value: &serde_json::Value) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        inner.map.insert(key.to_string(), value.clone());
        Self::touch(&mut inner.order, key);
        while inner.map.len() > self.capacity {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            inner.map.remove(&oldest);
        }
    }

    fn delete(&self, key: &str) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        inner.map.remove(key);
        if let Some(pos) = inner.order.iter().position(|k| k == key) {
            inner.order.remove(pos);
        }
    }
}

// ---------------------------------------------------------------------------
// Disk layer (wall-clock TTL)
// ---------------------------------------------------------------------------

/// On-disk entry wrapper; `stored_at` drives TTL expiry.
#[derive(Serialize, Deserialize)]
struct DiskEntry {
    stored_at: DateTime<Utc>,
    value: serde_json::Value,
}

/// JSON-file layer keyed by the sha256 of the cache key. Expired entries
/// read as misses and are removed on the spot.
pub struct DiskCache {
    base_dir: PathBuf,
    ttl_secs: u64,
}

impl DiskCache {
    pub fn new(base_dir: impl Into<PathBuf>, ttl_secs: u64) -> Self {
        Self {
            base_dir: base_dir.into(),
            ttl_secs,
        }
    }

    /// File path for a key. Exposed so tests and tooling can inspect entries.
    pub fn entry_path(&self, key: &str) -> PathBuf {
        let digest = format!("{:x}", Sha256::digest(key.as_bytes()));
        self.base_dir.join(format!("{digest}.json"))
    }

    fn is_expired(&self, entry: &DiskEntry) -> bool {
        let age = Utc::now().signed_duration_since(entry.stored_at);
        age.num_seconds() > self.ttl_secs as i64
    }
}

impl CacheLayer for DiskCache {
    fn name(&self) -> &'static str {
        "disk"
    }

    fn get(&self, key: &str) -> Option<serde_json::Value> {
        let path = self.entry_path(key);
        let content = std::fs::read_to_string(&path).ok()?;
        let entry: DiskEntry = match serde_json::from_str(&content) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(?path, error = %e, "discarding unreadable cache entry");
                let _ = std::fs::remove_file(&path);
                return None;
            }
        };

        if self.is_expired(&entry) {
            let _ = std::fs::remove_file(&path);
            return None;
        }
        Some(entry.value)
    }

    fn set(&self, key: &str, value: &serde_json::Value) {
        if let Err(e) = std::fs::create_dir_all(&self.base_dir) {
            tracing::warn!(dir = ?self.base_dir, error = %e, "cache dir unavailable");
            return;
        }
        let entry = DiskEntry {
            stored_at: Utc::now(),
            value: value.clone(),
        };
        let path = self.entry_path(key);
        match serde_json::to_string(&entry) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    tracing::warn!(?path, error = %e, "cache write failed");
                }
            }
            Err(e) => tracing::warn!(error = %e, "cache entry not serializable"),
        }
    }

    fn delete(&self, key: &str) {
        let _ = std::fs::remove_file(self.entry_path(key));
    }
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Lock-free counters over stack operations.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
}

/// Point-in-time stats view; computable at any time without reset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    pub hit_rate_percent: f64,
}

impl CacheStats {
    fn snapshot(&self) -> CacheStatsSnapshot {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;
        let hit_rate_percent = if lookups == 0 {
            0.0
        } else {
            hits as f64 * 100.0 / lookups as f64
        };
        CacheStatsSnapshot {
            hits,
            misses,
            sets: self.sets.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            hit_rate_percent,
        }
    }
}

// ---------------------------------------------------------------------------
// Stack
// ---------------------------------------------------------------------------

/// Ordered cache layers, fastest first.
pub struct CacheStack {
    layers: Vec<Arc<dyn CacheLayer>>,
    stats: CacheStats,
}

impl CacheStack {
    pub fn new(layers: Vec<Arc<dyn CacheLayer>>) -> Self {
        Self {
            layers,
            stats: CacheStats::default(),
        }
    }

    /// The standard two-layer stack: memory LRU over a TTL disk store.
    pub fn standard(memory_capacity: usize, disk_dir: impl Into<PathBuf>, ttl_secs: u64) -> Self {
        Self::new(vec![
            Arc::new(MemoryCache::new(memory_capacity)),
            Arc::new(DiskCache::new(disk_dir, ttl_secs)),
        ])
    }

    /// Append a further (e.g. remote) layer behind the existing ones.
    pub fn with_layer(mut self, layer: Arc<dyn CacheLayer>) -> Self {
        self.layers.push(layer);
        self
    }

    /// Probe layers in order. A hit at layer N backfills layers 0..N.
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        for (i, layer) in self.layers.iter().enumerate() {
            if let Some(value) = layer.get(key) {
                for faster in &self.layers[..i] {
                    faster.set(key, &value);
                }
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(layer = layer.name(), "cache hit");
                return Some(value);
            }
        }
        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Write through every layer.
    pub fn set(&self, key: &str, value: &serde_json::Value) {
        for layer in &self.layers {
            layer.set(key, value);
        }
        self.stats.sets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn delete(&self, key: &str) {
        for layer in &self.layers {
            layer.delete(key);
        }
        self.stats.deletes.fetch_add(1, Ordering::Relaxed);
    }

    /// Typed convenience over [`CacheStack::get`].
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key)?;
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(e) => {
                tracing::warn!(error = %e, "cached value no longer matches its type");
                self.delete(key);
                None
            }
        }
    }

    /// Typed convenience over [`CacheStack::set`].
    pub fn set_value<T: Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(json) => self.set(key, &json),
            Err(e) => tracing::warn!(error = %e, "value not cacheable"),
        }
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn temp_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("orgscout-cache-{tag}-{}", uuid::Uuid::now_v7()))
    }

    fn val(s: &str) -> serde_json::Value {
        serde_json::json!({ "body": s })
    }

    #[test]
    fn cache_key_is_order_independent() {
        let a = cache_key("search", &[("query", "epic go-live"), ("max", "10")]);
        let b = cache_key("search", &[("max", "10"), ("query", "epic go-live")]);
        let c = cache_key("search", &[("max", "11"), ("query", "epic go-live")]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        // Different operations never collide on the same params.
        assert_ne!(a, cache_key("fetch", &[("query", "epic go-live"), ("max", "10")]));
    }

    #[test]
    fn memory_lru_evicts_least_recently_used() {
        let cache = MemoryCache::new(2);
        cache.set("a", &val("1"));
        cache.set("b", &val("2"));
        // Refresh "a" so "b" becomes the eviction victim.
        assert!(cache.get("a").is_some());
        cache.set("c", &val("3"));

        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_none());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn disk_roundtrip_and_delete() {
        let dir = temp_dir("disk");
        let cache = DiskCache::new(&dir, 3600);

        assert!(cache.get("k").is_none());
        cache.set("k", &val("payload"));
        assert_eq!(cache.get("k"), Some(val("payload")));

        cache.delete("k");
        assert!(cache.get("k").is_none());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn disk_expiry_reads_as_miss_and_removes_file() {
        let dir = temp_dir("ttl");
        let cache = DiskCache::new(&dir, 60);
        cache.set("k", &val("stale"));

        // Age the entry past its TTL by rewriting stored_at.
        let path = cache.entry_path("k");
        let raw = std::fs::read_to_string(&path).expect("read entry");
        let mut entry: serde_json::Value = serde_json::from_str(&raw).expect("parse entry");
        entry["stored_at"] =
            serde_json::json!(Utc::now() - chrono::Duration::seconds(120));
        std::fs::write(&path, entry.to_string()).expect("write entry");

        assert!(cache.get("k").is_none());
        assert!(!path.exists());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn hit_at_slow_layer_backfills_faster_layers() {
        let dir = temp_dir("backfill");
        let memory: Arc<MemoryCache> = Arc::new(MemoryCache::new(10));
        let disk: Arc<DiskCache> = Arc::new(DiskCache::new(&dir, 3600));
        let stack = CacheStack::new(vec![memory.clone(), disk.clone()]);

        // Seed only the disk layer, as a prior process would have.
        disk.set("k", &val("warm"));
        assert!(memory.get("k").is_none());

        assert_eq!(stack.get("k"), Some(val("warm")));
        assert_eq!(memory.get("k"), Some(val("warm")));

        std::fs::remove_dir_all(&dir).ok();
    }

    /// A remote layer that has gone away; gets miss, sets vanish.
    struct DeadLayer;

    impl CacheLayer for DeadLayer {
        fn name(&self) -> &'static str {
            "dead-remote"
        }
        fn get(&self, _key: &str) -> Option<serde_json::Value> {
            None
        }
        fn set(&self, _key: &str, _value: &serde_json::Value) {}
        fn delete(&self, _key: &str) {}
    }

    #[test]
    fn dead_remote_layer_degrades_silently() {
        let stack = CacheStack::new(vec![Arc::new(MemoryCache::new(10))])
            .with_layer(Arc::new(DeadLayer));

        stack.set("k", &val("x"));
        assert_eq!(stack.get("k"), Some(val("x")));
        assert!(stack.get("absent").is_none());
    }

    #[test]
    fn stats_track_hit_rate_without_reset() {
        let stack = CacheStack::new(vec![Arc::new(MemoryCache::new(10))]);
        stack.set("k", &val("x"));
        assert!(stack.get("k").is_some());
        assert!(stack.get("k").is_some());
        assert!(stack.get("missing").is_none());

        let stats = stack.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.sets, 1);
        assert!((stats.hit_rate_percent - 66.66).abs() < 0.1);
    }

    #[test]
    fn typed_helpers_roundtrip() {
        #[derive(Serialize, serde::Deserialize, PartialEq, Debug)]
        struct Page {
            status: u16,
            text: String,
        }

        let stack = CacheStack::new(vec![Arc::new(MemoryCache::new(10))]);
        stack.set_value(
            "page",
            &Page {
                status: 200,
                text: "ok".into(),
            },
        );
        let page: Page = stack.get_as("page").expect("typed get");
        assert_eq!(page.status, 200);
    }
}
