//! Time-to-live cache for expensive reads (ledger scans, aggregates, history).
//!
//! - Entries are keyed by the identity of the read operation.
//! - An entry older than the TTL is evicted when it is next read.
//! - Writers call `invalidate_all` right after mutating the underlying store.
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};

use crate::error::AppError;

struct CachedEntry<V> {
    value: V,
    inserted_at: Instant,
}

pub struct TtlCache<K, V> {
    entries: Mutex<BTreeMap<K, CachedEntry<V>>>,
    ttl: Duration,
}

/// Cache statistics for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub ttl: Duration,
}

impl<K: Ord + Clone, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            ttl,
        }
    }

    // A poisoned lock only means another reader panicked mid-call; the map itself stays valid.
    fn lock(&self) -> MutexGuard<'_, BTreeMap<K, CachedEntry<V>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fresh value for `key`, evicting it first if it has outlived the TTL.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.lock();
        let expired = match entries.get(key) {
            Some(e) => e.inserted_at.elapsed() >= self.ttl,
            None => return None,
        };
        if expired {
            entries.remove(key);
            return None;
        }
        entries.get(key).map(|e| e.value.clone())
    }

    pub fn insert(&self, key: K, value: V) {
        self.lock().insert(
            key,
            CachedEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Return the cached value or compute, store and return it. Errors are not cached.
    pub fn get_or_try_insert_with<F>(&self, key: K, compute: F) -> Result<V, AppError>
    where
        F: FnOnce() -> Result<V, AppError>,
    {
        if let Some(v) = self.get(&key) {
            return Ok(v);
        }
        let v = compute()?;
        self.insert(key, v.clone());
        Ok(v)
    }

    pub fn invalidate_all(&self) {
        self.lock().clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.lock().len(),
            ttl: self.ttl,
        }
    }
}

/// Stable key for a read operation and its parameters.
pub fn operation_key(operation: &str, params: &[&str]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(operation.as_bytes());
    for p in params {
        hasher.update([0u8]);
        hasher.update(p.as_bytes());
    }
    format!("{operation}:{}", &hex::encode(hasher.finalize())[..16])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::thread;

    #[test]
    fn test_cache_hit() {
        let cache: TtlCache<String, Vec<i64>> = TtlCache::new(Duration::from_secs(60));
        cache.insert("all_transactions".to_string(), vec![1, 2, 3]);
        assert_eq!(cache.get(&"all_transactions".to_string()), Some(vec![1, 2, 3]));
        assert_eq!(cache.get(&"savings_total".to_string()), None);
    }

    #[test]
    fn test_cache_expiration_evicts_on_read() {
        let cache: TtlCache<&str, f64> = TtlCache::new(Duration::from_millis(50));
        cache.insert("savings_total", 42.0);
        assert_eq!(cache.get(&"savings_total"), Some(42.0));

        thread::sleep(Duration::from_millis(80));

        assert_eq!(cache.get(&"savings_total"), None);
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn test_cache_invalidate_all() {
        let cache: TtlCache<&str, i32> = TtlCache::new(Duration::from_secs(60));
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.invalidate_all();
        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.get(&"b"), None);
    }

    #[test]
    fn get_or_try_insert_computes_once_and_skips_errors() {
        let cache: TtlCache<&str, i32> = TtlCache::new(Duration::from_secs(60));
        let calls = Cell::new(0);
        let compute = || {
            calls.set(calls.get() + 1);
            Ok(7)
        };
        assert_eq!(cache.get_or_try_insert_with("k", compute).unwrap(), 7);
        assert_eq!(cache.get_or_try_insert_with("k", compute).unwrap(), 7);
        assert_eq!(calls.get(), 1);

        let err = cache
            .get_or_try_insert_with("e", || Err(AppError::new("DB_QUERY_FAILED", "boom")))
            .unwrap_err();
        assert_eq!(err.code, "DB_QUERY_FAILED");
        assert_eq!(cache.get(&"e"), None);
    }

    #[test]
    fn test_operation_key_is_stable() {
        let a = operation_key("recent_history", &["12"]);
        assert_eq!(a, operation_key("recent_history", &["12"]));
        assert_ne!(a, operation_key("recent_history", &["13"]));
        assert!(a.starts_with("recent_history:"));
    }
}
