//! Cache storage.
//!
//! [`CacheStore`] is the key-value collaborator every view and the invalidator
//! share. Each operation is atomic per key; there are no multi-key operations.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use thiserror::Error;

use super::config::CacheConfig;
use super::lock::lock;

const SOURCE: &str = "cache::store";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("cache `{op}` failed for key `{key}`: {message}")]
    Operation {
        op: &'static str,
        key: String,
        message: String,
    },
}

impl CacheError {
    pub fn operation(op: &'static str, key: &str, message: impl Into<String>) -> Self {
        Self::Operation {
            op,
            key: key.to_string(),
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError>;

    /// Store `value` under `key`. `None` stores it without expiry.
    async fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> Result<(), CacheError>;

    /// Evict `key`. Returns whether an entry was present; evicting an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<bool, CacheError>;
}

#[derive(Debug, Clone)]
struct Entry {
    value: Bytes,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// In-process store: LRU bounded by entry count, with optional per-entry expiry.
pub struct MemoryCacheStore {
    entries: Mutex<LruCache<String, Entry>>,
}

impl MemoryCacheStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(config.capacity_non_zero())),
        }
    }

    /// Number of entries currently held, expired ones included.
    pub fn len(&self) -> usize {
        lock(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        let mut entries = lock(&self.entries, SOURCE, "get");
        let now = Instant::now();
        let expired = match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> Result<(), CacheError> {
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        lock(&self.entries, SOURCE, "set").put(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, CacheError> {
        Ok(lock(&self.entries, SOURCE, "remove").pop(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(capacity: usize) -> MemoryCacheStore {
        MemoryCacheStore::new(&CacheConfig {
            capacity,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn set_then_get_returns_value() {
        let store = store(4);
        store
            .set("dashboard", Bytes::from_static(b"{}"), None)
            .await
            .unwrap();
        assert_eq!(
            store.get("dashboard").await.unwrap(),
            Some(Bytes::from_static(b"{}"))
        );
    }

    #[tokio::test]
    async fn removing_absent_key_is_a_noop() {
        let store = store(4);
        assert!(!store.remove("category-list").await.unwrap());
    }

    #[tokio::test]
    async fn remove_reports_presence() {
        let store = store(4);
        store
            .set("category-list", Bytes::from_static(b"[]"), None)
            .await
            .unwrap();
        assert!(store.remove("category-list").await.unwrap());
        assert_eq!(store.get("category-list").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_entries_read_as_absent() {
        let store = store(4);
        store
            .set("dashboard", Bytes::from_static(b"{}"), Some(Duration::ZERO))
            .await
            .unwrap();
        assert_eq!(store.get("dashboard").await.unwrap(), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn capacity_evicts_least_recently_used() {
        let store = store(2);
        store.set("a", Bytes::from_static(b"1"), None).await.unwrap();
        store.set("b", Bytes::from_static(b"2"), None).await.unwrap();
        store.get("a").await.unwrap();
        store.set("c", Bytes::from_static(b"3"), None).await.unwrap();

        assert!(store.get("a").await.unwrap().is_some());
        assert!(store.get("b").await.unwrap().is_none());
        assert_eq!(store.len(), 2);
    }
}
