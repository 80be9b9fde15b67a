//! Cache key scheme.
//!
//! Maps touched data sets to the cache keys derived from them. Everything here is
//! computed from identity alone; nothing consults the cache contents.

use std::fmt;

use uuid::Uuid;

const CATEGORY_LIST: &str = "category-list";
const DASHBOARD: &str = "dashboard";
const CATEGORY_PREFIX: &str = "category:";

/// A cache entry key.
///
/// `Display` renders the wire form used by every [`CacheStore`](super::CacheStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheKey {
    /// Live categories with their tip counts.
    CategoryList,
    /// Aggregate totals and most recent tips.
    Dashboard,
    /// One category with its live tips.
    Category(Uuid),
}

impl CacheKey {
    pub fn family(&self) -> KeyFamily {
        match self {
            Self::CategoryList => KeyFamily::CategoryList,
            Self::Dashboard => KeyFamily::Dashboard,
            Self::Category(_) => KeyFamily::CategoryDetail,
        }
    }

    /// Parse the wire form back into a key. Unknown strings yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            CATEGORY_LIST => Some(Self::CategoryList),
            DASHBOARD => Some(Self::Dashboard),
            other => other
                .strip_prefix(CATEGORY_PREFIX)
                .and_then(|id| Uuid::parse_str(id).ok())
                .map(Self::Category),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CategoryList => f.write_str(CATEGORY_LIST),
            Self::Dashboard => f.write_str(DASHBOARD),
            Self::Category(id) => write!(f, "{CATEGORY_PREFIX}{id}"),
        }
    }
}

/// A slice of backing-store state that mutations touch and views derive from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataSet {
    /// The set of live categories and their names.
    Categories,
    /// Name and liveness of one category.
    Category(Uuid),
    /// Which category each live tip belongs to (drives per-category counts).
    TipMembership,
    /// Content of the live tips filed under one category.
    TipsIn(Uuid),
    /// The set of users.
    Users,
}

/// A kind of derived view stored in the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyFamily {
    CategoryList,
    CategoryDetail,
    Dashboard,
}

impl KeyFamily {
    pub const ALL: [KeyFamily; 3] = [
        KeyFamily::CategoryList,
        KeyFamily::CategoryDetail,
        KeyFamily::Dashboard,
    ];

    /// Label used for metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CategoryList => "category_list",
            Self::CategoryDetail => "category_detail",
            Self::Dashboard => "dashboard",
        }
    }

    /// The key of this family that is derived from `set`, if any.
    ///
    /// Every (family, data set) pair is spelled out so a new family or data set
    /// must declare its dependencies before it compiles.
    pub fn dependent_key(&self, set: DataSet) -> Option<CacheKey> {
        match (self, set) {
            (Self::CategoryList, DataSet::Categories | DataSet::TipMembership) => {
                Some(CacheKey::CategoryList)
            }
            (
                Self::CategoryList,
                DataSet::Category(_) | DataSet::TipsIn(_) | DataSet::Users,
            ) => None,

            (Self::CategoryDetail, DataSet::Category(id) | DataSet::TipsIn(id)) => {
                Some(CacheKey::Category(id))
            }
            (
                Self::CategoryDetail,
                DataSet::Categories | DataSet::TipMembership | DataSet::Users,
            ) => None,

            (
                Self::Dashboard,
                DataSet::Categories
                | DataSet::Category(_)
                | DataSet::TipMembership
                | DataSet::TipsIn(_)
                | DataSet::Users,
            ) => Some(CacheKey::Dashboard),
        }
    }
}
