// src/cache.rs
//! Bounded key-value cache with per-entry TTL.
//!
//! Entries are serialized as `{data, timestamp, ttl}` under namespaced keys
//! (`ai-digest:<key>`), mirroring the persisted client-storage layout. The
//! cache is best-effort and never a source of truth: quota failures evict the
//! single globally-oldest namespaced entry and retry once, then give up.

use anyhow::{anyhow, Context, Result};
use metrics::counter;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

pub const CACHE_PREFIX: &str = "ai-digest:";

/// Client-local string storage the cache sits on. `write` fails when a
/// capacity quota would be exceeded; everything else is infallible.
pub trait Storage: Send + Sync {
    fn read(&self, key: &str) -> Option<String>;
    fn write(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str);
    fn keys(&self) -> Vec<String>;
}

/// In-memory storage with an optional byte quota over keys + values.
pub struct MemoryStorage {
    inner: Mutex<HashMap<String, String>>,
    capacity_bytes: Option<usize>,
}

impl MemoryStorage {
    pub fn with_capacity(capacity_bytes: usize) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            capacity_bytes: Some(capacity_bytes),
        }
    }

    pub fn unbounded() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            capacity_bytes: None,
        }
    }

    fn would_overflow(&self, map: &HashMap<String, String>, key: &str, value: &str) -> bool {
        let Some(cap) = self.capacity_bytes else {
            return false;
        };
        let mut total = key.len() + value.len();
        for (k, v) in map {
            if k == key {
                continue; // replaced, not added
            }
            total += k.len() + v.len();
        }
        total > cap
    }
}

impl Storage for MemoryStorage {
    fn read(&self, key: &str) -> Option<String> {
        self.inner.lock().expect("storage mutex poisoned").get(key).cloned()
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let mut map = self.inner.lock().expect("storage mutex poisoned");
        if self.would_overflow(&map, key, value) {
            return Err(anyhow!("storage quota exceeded"));
        }
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) {
        self.inner.lock().expect("storage mutex poisoned").remove(key);
    }

    fn keys(&self) -> Vec<String> {
        self.inner
            .lock()
            .expect("storage mutex poisoned")
            .keys()
            .cloned()
            .collect()
    }
}

/// Single-file JSON storage, the on-disk analog of client-local storage.
/// Loads the whole map on open and writes it back after each mutation.
pub struct FileStorage {
    path: PathBuf,
    inner: Mutex<HashMap<String, String>>,
    capacity_bytes: Option<usize>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_quota(path, None)
    }

    pub fn with_quota(path: impl Into<PathBuf>, capacity_bytes: Option<usize>) -> Self {
        let path = path.into();
        let map = std::fs::read_to_string(&path)
            .ok()
            .and_then(|s| serde_json::from_str::<HashMap<String, String>>(&s).ok())
            .unwrap_or_default();
        Self {
            path,
            inner: Mutex::new(map),
            capacity_bytes,
        }
    }

    fn persist(&self, map: &HashMap<String, String>) -> Result<()> {
        let raw = serde_json::to_string(map).context("serializing file storage")?;
        std::fs::write(&self.path, raw)
            .with_context(|| format!("writing storage file {}", self.path.display()))
    }
}

impl Storage for FileStorage {
    fn read(&self, key: &str) -> Option<String> {
        self.inner.lock().expect("storage mutex poisoned").get(key).cloned()
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let mut map = self.inner.lock().expect("storage mutex poisoned");
        if let Some(cap) = self.capacity_bytes {
            let mut total = key.len() + value.len();
            for (k, v) in map.iter() {
                if k != key {
                    total += k.len() + v.len();
                }
            }
            if total > cap {
                return Err(anyhow!("storage quota exceeded"));
            }
        }
        map.insert(key.to_string(), value.to_string());
        self.persist(&map)
    }

    fn remove(&self, key: &str) {
        let mut map = self.inner.lock().expect("storage mutex poisoned");
        if map.remove(key).is_some() {
            if let Err(e) = self.persist(&map) {
                tracing::warn!(error = ?e, "storage file update failed on remove");
            }
        }
    }

    fn keys(&self) -> Vec<String> {
        self.inner
            .lock()
            .expect("storage mutex poisoned")
            .keys()
            .cloned()
            .collect()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Entry {
    data: serde_json::Value,
    /// epoch milliseconds at write time
    timestamp: u64,
    /// milliseconds to live
    ttl: u64,
}

type Clock = Arc<dyn Fn() -> u64 + Send + Sync>;

fn system_clock() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

/// Namespaced TTL cache over a [`Storage`] backend.
#[derive(Clone)]
pub struct CacheStore {
    storage: Arc<dyn Storage>,
    clock: Clock,
}

impl CacheStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            clock: Arc::new(system_clock),
        }
    }

    /// Same store with an injected clock. Expiry becomes testable without
    /// sleeping.
    pub fn with_clock(storage: Arc<dyn Storage>, clock: Clock) -> Self {
        Self { storage, clock }
    }

    /// Read a value; expired or malformed entries are evicted lazily and
    /// reported as absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let full = namespaced(key);
        let Some(raw) = self.storage.read(&full) else {
            counter!("digest_cache_misses_total").increment(1);
            return None;
        };
        let Ok(entry) = serde_json::from_str::<Entry>(&raw) else {
            self.storage.remove(&full);
            counter!("digest_cache_misses_total").increment(1);
            return None;
        };
        let now = (self.clock)();
        if now.saturating_sub(entry.timestamp) > entry.ttl {
            self.storage.remove(&full);
            counter!("digest_cache_expired_total").increment(1);
            return None;
        }
        match serde_json::from_value(entry.data) {
            Ok(v) => {
                counter!("digest_cache_hits_total").increment(1);
                Some(v)
            }
            Err(_) => {
                self.storage.remove(&full);
                counter!("digest_cache_misses_total").increment(1);
                None
            }
        }
    }

    /// Write a value with the given TTL. On quota failure, evict the single
    /// globally-oldest namespaced entry and retry once; a second failure
    /// drops the write.
    pub fn set<T: Serialize>(&self, key: &str, value: &T, ttl_ms: u64) {
        let data = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = ?e, key, "cache value not serializable");
                return;
            }
        };
        let entry = Entry {
            data,
            timestamp: (self.clock)(),
            ttl: ttl_ms,
        };
        let raw = match serde_json::to_string(&entry) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = ?e, key, "cache entry not serializable");
                return;
            }
        };
        let full = namespaced(key);
        if self.storage.write(&full, &raw).is_ok() {
            return;
        }
        self.evict_oldest();
        counter!("digest_cache_evictions_total").increment(1);
        if let Err(e) = self.storage.write(&full, &raw) {
            tracing::warn!(error = ?e, key, "cache write dropped after eviction");
        }
    }

    /// Remove all namespaced keys, leaving unrelated keys in the same
    /// storage untouched.
    pub fn clear(&self) {
        for key in self.storage.keys() {
            if key.starts_with(CACHE_PREFIX) {
                self.storage.remove(&key);
            }
        }
    }

    fn evict_oldest(&self) {
        let mut oldest: Option<(String, u64)> = None;
        for key in self.storage.keys() {
            if !key.starts_with(CACHE_PREFIX) {
                continue;
            }
            let Some(raw) = self.storage.read(&key) else {
                continue;
            };
            let Ok(entry) = serde_json::from_str::<Entry>(&raw) else {
                continue;
            };
            match &oldest {
                Some((_, ts)) if *ts <= entry.timestamp => {}
                _ => oldest = Some((key, entry.timestamp)),
            }
        }
        if let Some((key, _)) = oldest {
            self.storage.remove(&key);
        }
    }
}

fn namespaced(key: &str) -> String {
    format!("{CACHE_PREFIX}{key}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn manual_clock(start: u64) -> (Arc<AtomicU64>, Clock) {
        let t = Arc::new(AtomicU64::new(start));
        let t2 = t.clone();
        (t, Arc::new(move || t2.load(Ordering::SeqCst)))
    }

    #[test]
    fn roundtrip_within_ttl() {
        let cache = CacheStore::new(Arc::new(MemoryStorage::unbounded()));
        cache.set("k", &vec![1u32, 2, 3], 60_000);
        assert_eq!(cache.get::<Vec<u32>>("k"), Some(vec![1, 2, 3]));
    }

    #[test]
    fn expired_entry_is_evicted_on_read() {
        let (t, clock) = manual_clock(1_000);
        let storage = Arc::new(MemoryStorage::unbounded());
        let cache = CacheStore::with_clock(storage.clone(), clock);
        cache.set("k", &"v", 500);

        t.store(1_500, Ordering::SeqCst); // exactly at the boundary: still valid
        assert_eq!(cache.get::<String>("k"), Some("v".to_string()));

        t.store(1_501, Ordering::SeqCst);
        assert_eq!(cache.get::<String>("k"), None);
        // entry physically gone, not just hidden
        assert!(storage.read(&namespaced("k")).is_none());
    }

    #[test]
    fn quota_failure_evicts_globally_oldest_and_retries() {
        let (t, clock) = manual_clock(1_000);
        let storage = Arc::new(MemoryStorage::with_capacity(150));
        let cache = CacheStore::with_clock(storage.clone(), clock);

        cache.set("old", &"aaaaaaaaaa", 60_000);
        t.store(2_000, Ordering::SeqCst);
        cache.set("new", &"bbbbbbbbbb", 60_000);
        t.store(3_000, Ordering::SeqCst);
        // third write exceeds the quota; the oldest entry must make room
        cache.set("third", &"cccccccccc", 60_000);

        assert_eq!(cache.get::<String>("old"), None);
        assert_eq!(cache.get::<String>("new"), Some("bbbbbbbbbb".to_string()));
        assert_eq!(cache.get::<String>("third"), Some("cccccccccc".to_string()));
    }

    #[test]
    fn write_is_dropped_when_eviction_is_not_enough() {
        let storage = Arc::new(MemoryStorage::with_capacity(10));
        let cache = CacheStore::new(storage.clone());
        cache.set("huge", &"x".repeat(500), 60_000);
        assert_eq!(cache.get::<String>("huge"), None);
    }

    #[test]
    fn clear_spares_foreign_keys() {
        let storage = Arc::new(MemoryStorage::unbounded());
        storage.write("other-app:state", "untouched").unwrap();
        let cache = CacheStore::new(storage.clone());
        cache.set("a", &1u32, 60_000);
        cache.set("b", &2u32, 60_000);

        cache.clear();

        assert_eq!(cache.get::<u32>("a"), None);
        assert_eq!(cache.get::<u32>("b"), None);
        assert_eq!(storage.read("other-app:state"), Some("untouched".to_string()));
    }

    #[test]
    fn malformed_entry_reads_as_absent() {
        let storage = Arc::new(MemoryStorage::unbounded());
        storage.write(&namespaced("bad"), "not json").unwrap();
        let cache = CacheStore::new(storage);
        assert_eq!(cache.get::<String>("bad"), None);
    }

    #[test]
    fn file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("digest-cache.json");
        {
            let cache = CacheStore::new(Arc::new(FileStorage::new(&path)));
            cache.set("k", &42u32, 60_000);
        }
        let cache = CacheStore::new(Arc::new(FileStorage::new(&path)));
        assert_eq!(cache.get::<u32>("k"), Some(42));
    }
}
