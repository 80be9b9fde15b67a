//! Synchronous cache invalidation.
//!
//! Services call the invalidator after the repository accepted a write and before
//! reporting success. Every key in the plan is attempted; if any eviction fails the
//! whole invalidation fails so the mutation is reported as failed.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use metrics::{counter, histogram};
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use super::events::{CacheEvent, Epoch, EventKind};
use super::keys::CacheKey;
use super::planner::InvalidationPlan;
use super::store::{CacheError, CacheStore};

pub(crate) const METRIC_CACHE_EVICT_TOTAL: &str = "tipcat_cache_evict_total";
pub(crate) const METRIC_CACHE_INVALIDATION_FAILURE_TOTAL: &str =
    "tipcat_cache_invalidation_failure_total";
pub(crate) const METRIC_CACHE_INVALIDATION_MS: &str = "tipcat_cache_invalidation_ms";

#[derive(Debug)]
pub struct FailedEviction {
    pub key: CacheKey,
    pub error: CacheError,
}

#[derive(Debug, Error)]
#[error("cache invalidation after `{event_kind}` failed for {} key(s)", .failures.len())]
pub struct InvalidationError {
    pub event_id: Uuid,
    pub event_kind: &'static str,
    pub failures: Vec<FailedEviction>,
}

impl InvalidationError {
    pub fn stale_keys(&self) -> impl Iterator<Item = CacheKey> + '_ {
        self.failures.iter().map(|failure| failure.key)
    }
}

/// Outcome of a fully applied invalidation.
#[derive(Debug, Clone)]
pub struct InvalidationReport {
    pub event_id: Uuid,
    pub epoch: Epoch,
    pub plan: InvalidationPlan,
    /// Keys that held an entry when evicted.
    pub evicted: usize,
}

pub struct CacheInvalidator {
    store: Arc<dyn CacheStore>,
    epoch_counter: AtomicU64,
}

impl CacheInvalidator {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            epoch_counter: AtomicU64::new(0),
        }
    }

    fn next_epoch(&self) -> Epoch {
        self.epoch_counter.fetch_add(1, Ordering::SeqCst)
    }

    /// Evict every key that `kind` may have made stale.
    pub async fn apply(&self, kind: EventKind) -> Result<InvalidationReport, InvalidationError> {
        let started_at = Instant::now();
        let event = CacheEvent::new(kind, self.next_epoch());
        let plan = InvalidationPlan::from_event(&event.kind);
        let event_kind = event.kind.name();

        let mut evicted = 0;
        let mut failures = Vec::new();
        for key in plan.keys() {
            let wire = key.to_string();
            match self.store.remove(&wire).await {
                Ok(present) => {
                    if present {
                        evicted += 1;
                        counter!(METRIC_CACHE_EVICT_TOTAL, "family" => key.family().as_str())
                            .increment(1);
                    }
                }
                Err(err) => {
                    error!(
                        event_id = %event.id,
                        event_kind,
                        key = %wire,
                        error = %err,
                        "Cache eviction failed"
                    );
                    counter!(METRIC_CACHE_INVALIDATION_FAILURE_TOTAL, "family" => key.family().as_str())
                        .increment(1);
                    failures.push(FailedEviction {
                        key: *key,
                        error: err,
                    });
                }
            }
        }

        histogram!(METRIC_CACHE_INVALIDATION_MS, "event_kind" => event_kind)
            .record(started_at.elapsed().as_secs_f64() * 1000.0);

        if !failures.is_empty() {
            return Err(InvalidationError {
                event_id: event.id,
                event_kind,
                failures,
            });
        }

        info!(
            event_id = %event.id,
            event_epoch = event.epoch,
            event_kind,
            keys = %plan,
            evicted,
            "Cache invalidation applied"
        );

        Ok(InvalidationReport {
            event_id: event.id,
            epoch: event.epoch,
            plan,
            evicted,
        })
    }

    pub async fn tip_created(
        &self,
        tip_id: Uuid,
        category_id: Uuid,
    ) -> Result<InvalidationReport, InvalidationError> {
        self.apply(EventKind::TipCreated {
            tip_id,
            category_id,
        })
        .await
    }

    pub async fn tip_updated(
        &self,
        tip_id: Uuid,
        previous_category: Uuid,
        category: Uuid,
    ) -> Result<InvalidationReport, InvalidationError> {
        self.apply(EventKind::TipUpdated {
            tip_id,
            previous_category,
            category,
        })
        .await
    }

    pub async fn tip_deleted(
        &self,
        tip_id: Uuid,
        category_id: Uuid,
    ) -> Result<InvalidationReport, InvalidationError> {
        self.apply(EventKind::TipDeleted {
            tip_id,
            category_id,
        })
        .await
    }

    pub async fn category_created(
        &self,
        category_id: Uuid,
    ) -> Result<InvalidationReport, InvalidationError> {
        self.apply(EventKind::CategoryCreated { category_id }).await
    }

    pub async fn category_renamed(
        &self,
        category_id: Uuid,
    ) -> Result<InvalidationReport, InvalidationError> {
        self.apply(EventKind::CategoryRenamed { category_id }).await
    }

    pub async fn category_deleted(
        &self,
        category_id: Uuid,
    ) -> Result<InvalidationReport, InvalidationError> {
        self.apply(EventKind::CategoryDeleted { category_id }).await
    }

    pub async fn user_deleted(&self, user_id: Uuid) -> Result<InvalidationReport, InvalidationError> {
        self.apply(EventKind::UserDeleted { user_id }).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use bytes::Bytes;

    use super::*;
    use crate::cache::{CacheConfig, MemoryCacheStore};

    /// Fails removal for one key and records every key it was asked to remove.
    struct FlakyStore {
        failing: String,
        removed: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CacheStore for FlakyStore {
        async fn get(&self, _key: &str) -> Result<Option<Bytes>, CacheError> {
            Ok(None)
        }

        async fn set(
            &self,
            _key: &str,
            _value: Bytes,
            _ttl: Option<Duration>,
        ) -> Result<(), CacheError> {
            Ok(())
        }

        async fn remove(&self, key: &str) -> Result<bool, CacheError> {
            self.removed.lock().unwrap().push(key.to_string());
            if key == self.failing {
                return Err(CacheError::Unavailable("connection reset".into()));
            }
            Ok(false)
        }
    }

    #[tokio::test]
    async fn evicts_populated_keys_and_tolerates_absent_ones() {
        let store = Arc::new(MemoryCacheStore::new(&CacheConfig::default()));
        let category = Uuid::new_v4();
        store
            .set("dashboard", Bytes::from_static(b"{}"), None)
            .await
            .unwrap();

        let invalidator = CacheInvalidator::new(store.clone());
        let report = invalidator
            .tip_created(Uuid::new_v4(), category)
            .await
            .expect("invalidation succeeds");

        assert_eq!(report.plan.len(), 3);
        assert_eq!(report.evicted, 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn one_failed_eviction_fails_the_invalidation_but_all_keys_are_attempted() {
        let category = Uuid::new_v4();
        let store = Arc::new(FlakyStore {
            failing: "category-list".into(),
            removed: Mutex::new(Vec::new()),
        });
        let invalidator = CacheInvalidator::new(store.clone());

        let err = invalidator
            .category_deleted(category)
            .await
            .expect_err("failure must surface");

        assert_eq!(err.event_kind, "category_deleted");
        assert_eq!(
            err.stale_keys().collect::<Vec<_>>(),
            vec![CacheKey::CategoryList]
        );
        let attempted: HashSet<String> =
            store.removed.lock().unwrap().iter().cloned().collect();
        assert_eq!(
            attempted,
            HashSet::from([
                "category-list".to_string(),
                "dashboard".to_string(),
                format!("category:{category}"),
            ])
        );
    }

    #[tokio::test]
    async fn epochs_increase_per_event() {
        let store = Arc::new(MemoryCacheStore::new(&CacheConfig::default()));
        let invalidator = CacheInvalidator::new(store);
        let first = invalidator.user_deleted(Uuid::new_v4()).await.unwrap();
        let second = invalidator.user_deleted(Uuid::new_v4()).await.unwrap();
        assert!(second.epoch > first.epoch);
        assert_ne!(first.event_id, second.event_id);
    }
}
