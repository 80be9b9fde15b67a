//! Mutation events that drive cache invalidation.

use time::OffsetDateTime;
use uuid::Uuid;

use super::keys::DataSet;

/// Monotonic sequence number assigned by the invalidator to each event.
pub type Epoch = u64;

/// A mutation that has been durably accepted by the repository.
#[derive(Debug, Clone)]
pub struct CacheEvent {
    /// Unique identifier for log correlation and plan deduplication.
    pub id: Uuid,
    pub epoch: Epoch,
    pub kind: EventKind,
    pub timestamp: OffsetDateTime,
}

impl CacheEvent {
    pub fn new(kind: EventKind, epoch: Epoch) -> Self {
        Self {
            id: Uuid::new_v4(),
            epoch,
            kind,
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

/// Kinds of mutations the catalog performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    TipCreated {
        tip_id: Uuid,
        category_id: Uuid,
    },
    /// Covers both in-place edits and moves; a move has differing categories.
    TipUpdated {
        tip_id: Uuid,
        previous_category: Uuid,
        category: Uuid,
    },
    TipDeleted {
        tip_id: Uuid,
        category_id: Uuid,
    },
    CategoryCreated {
        category_id: Uuid,
    },
    CategoryRenamed {
        category_id: Uuid,
    },
    /// Soft-deletes the category and every live tip filed under it.
    CategoryDeleted {
        category_id: Uuid,
    },
    UserDeleted {
        user_id: Uuid,
    },
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::TipCreated { .. } => "tip_created",
            Self::TipUpdated {
                previous_category,
                category,
                ..
            } if previous_category != category => "tip_moved",
            Self::TipUpdated { .. } => "tip_updated",
            Self::TipDeleted { .. } => "tip_deleted",
            Self::CategoryCreated { .. } => "category_created",
            Self::CategoryRenamed { .. } => "category_renamed",
            Self::CategoryDeleted { .. } => "category_deleted",
            Self::UserDeleted { .. } => "user_deleted",
        }
    }

    /// Data sets whose contents this mutation changes.
    pub fn touched_sets(&self) -> Vec<DataSet> {
        match *self {
            Self::TipCreated { category_id, .. } | Self::TipDeleted { category_id, .. } => {
                vec![DataSet::TipsIn(category_id), DataSet::TipMembership]
            }
            Self::TipUpdated {
                previous_category,
                category,
                ..
            } => {
                if previous_category == category {
                    vec![DataSet::TipsIn(category)]
                } else {
                    vec![
                        DataSet::TipsIn(previous_category),
                        DataSet::TipsIn(category),
                        DataSet::TipMembership,
                    ]
                }
            }
            Self::CategoryCreated { .. } => vec![DataSet::Categories],
            Self::CategoryRenamed { category_id } => {
                vec![DataSet::Categories, DataSet::Category(category_id)]
            }
            Self::CategoryDeleted { category_id } => vec![
                DataSet::Categories,
                DataSet::Category(category_id),
                DataSet::TipsIn(category_id),
                DataSet::TipMembership,
            ],
            Self::UserDeleted { .. } => vec![DataSet::Users],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_touches_both_categories() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let kind = EventKind::TipUpdated {
            tip_id: Uuid::new_v4(),
            previous_category: a,
            category: b,
        };
        let sets = kind.touched_sets();
        assert!(sets.contains(&DataSet::TipsIn(a)));
        assert!(sets.contains(&DataSet::TipsIn(b)));
        assert!(sets.contains(&DataSet::TipMembership));
        assert_eq!(kind.name(), "tip_moved");
    }

    #[test]
    fn in_place_update_leaves_membership_alone() {
        let c = Uuid::new_v4();
        let kind = EventKind::TipUpdated {
            tip_id: Uuid::new_v4(),
            previous_category: c,
            category: c,
        };
        assert_eq!(kind.touched_sets(), vec![DataSet::TipsIn(c)]);
        assert_eq!(kind.name(), "tip_updated");
    }

    #[test]
    fn events_get_unique_ids() {
        let kind = EventKind::UserDeleted {
            user_id: Uuid::new_v4(),
        };
        let first = CacheEvent::new(kind.clone(), 0);
        let second = CacheEvent::new(kind, 1);
        assert_ne!(first.id, second.id);
    }
}
