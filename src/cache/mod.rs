//! Tipcat cache system
//!
//! Derived read views (category list, category detail, dashboard) are cached as
//! opaque bytes in a [`CacheStore`]. Writes publish an [`EventKind`] to the
//! [`CacheInvalidator`], which evicts every key the [`InvalidationPlan`] derives from
//! the data sets the event touched.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! capacity = 1024
//! ttl_seconds = 300
//! ```

mod config;
mod events;
mod invalidator;
mod keys;
mod lock;
mod planner;
mod store;

pub use config::CacheConfig;
pub use events::{CacheEvent, Epoch, EventKind};
pub use invalidator::{CacheInvalidator, FailedEviction, InvalidationError, InvalidationReport};
pub(crate) use invalidator::{
    METRIC_CACHE_EVICT_TOTAL, METRIC_CACHE_INVALIDATION_FAILURE_TOTAL,
    METRIC_CACHE_INVALIDATION_MS,
};
pub use keys::{CacheKey, DataSet, KeyFamily};
pub use planner::InvalidationPlan;
pub use store::{CacheError, CacheStore, MemoryCacheStore};
