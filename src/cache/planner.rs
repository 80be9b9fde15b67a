//! Invalidation plan generation.
//!
//! Folds events into the exact set of keys that may be stale: touched data sets
//! crossed with every key family.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use super::events::{CacheEvent, EventKind};
use super::keys::{CacheKey, DataSet, KeyFamily};

/// Keys to evict, ordered so logs and eviction order are stable.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InvalidationPlan {
    keys: BTreeSet<CacheKey>,
}

impl fmt::Display for InvalidationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (idx, key) in self.keys.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}")?;
        }
        f.write_str("]")
    }
}

impl InvalidationPlan {
    pub fn from_event(kind: &EventKind) -> Self {
        let mut plan = Self::default();
        plan.extend_from_sets(kind.touched_sets());
        plan
    }

    /// Merge several events, ignoring repeated event ids.
    pub fn from_events(events: &[CacheEvent]) -> Self {
        let mut plan = Self::default();
        let mut seen = HashSet::new();
        for event in events {
            if seen.insert(event.id) {
                plan.extend_from_sets(event.kind.touched_sets());
            }
        }
        plan
    }

    fn extend_from_sets(&mut self, sets: impl IntoIterator<Item = DataSet>) {
        for set in sets {
            for family in KeyFamily::ALL {
                if let Some(key) = family.dependent_key(set) {
                    self.keys.insert(key);
                }
            }
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &CacheKey> {
        self.keys.iter()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
