//! Query criteria: raw caller input validated into an immutable view description.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::tips::MAX_TAGS;

use super::pagination::{PageWindow, PaginationError};

pub const MAX_SEARCH_CHARS: usize = 200;
pub(crate) const DEFAULT_PAGE_SIZE: u32 = 20;
pub(crate) const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CriteriaError {
    #[error(transparent)]
    Pagination(#[from] PaginationError),
    #[error("search term exceeds {MAX_SEARCH_CHARS} characters")]
    SearchTooLong,
    #[error("malformed tag filter: {0}")]
    TagFilter(String),
    #[error("sort field `{0}` is only available for favorites")]
    SortUnavailable(SortField),
    #[error("unknown sort field `{0}`")]
    UnknownSortField(String),
    #[error("unknown sort direction `{0}`")]
    UnknownSortDirection(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Title,
    CreatedAt,
    UpdatedAt,
    /// When the tip was favorited; favorites views only.
    AddedAt,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Title => "title",
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::AddedAt => "added_at",
        }
    }

    /// Alphabetical fields read naturally ascending, timestamps newest first.
    pub fn default_direction(&self) -> SortDirection {
        match self {
            SortField::Title => SortDirection::Ascending,
            SortField::CreatedAt | SortField::UpdatedAt | SortField::AddedAt => {
                SortDirection::Descending
            }
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortField {
    type Err = CriteriaError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "title" => Ok(SortField::Title),
            "created" | "created_at" => Ok(SortField::CreatedAt),
            "updated" | "updated_at" => Ok(SortField::UpdatedAt),
            "added" | "added_at" => Ok(SortField::AddedAt),
            _ => Err(CriteriaError::UnknownSortField(raw.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortDirection {
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

impl FromStr for SortDirection {
    type Err = CriteriaError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Ascending),
            "desc" | "descending" => Ok(SortDirection::Descending),
            _ => Err(CriteriaError::UnknownSortDirection(raw.to_string())),
        }
    }
}

/// Which candidate set a query runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryScope {
    Catalog,
    Favorites,
}

impl QueryScope {
    pub fn default_sort(&self) -> SortField {
        match self {
            QueryScope::Catalog => SortField::CreatedAt,
            QueryScope::Favorites => SortField::AddedAt,
        }
    }

    fn allows(&self, field: SortField) -> bool {
        !(matches!(self, QueryScope::Catalog) && field == SortField::AddedAt)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryLimits {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
        }
    }
}

/// Unvalidated query parameters as a caller supplies them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TipQuery {
    pub search: Option<String>,
    pub category_id: Option<Uuid>,
    pub tags: Option<Vec<String>>,
    pub sort: Option<SortField>,
    pub direction: Option<SortDirection>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// Validated, immutable description of a requested view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryCriteria {
    search: Option<String>,
    category_id: Option<Uuid>,
    tags: Vec<String>,
    sort: SortField,
    direction: SortDirection,
    window: PageWindow,
}

impl QueryCriteria {
    pub fn from_query(
        query: &TipQuery,
        limits: &QueryLimits,
        scope: QueryScope,
    ) -> Result<Self, CriteriaError> {
        let window = PageWindow::new(
            query.page.unwrap_or(1),
            query
                .page_size
                .unwrap_or(i64::from(limits.default_page_size)),
            limits.max_page_size,
        )?;

        let search = match query.search.as_deref().map(str::trim) {
            Some(term) if term.chars().count() > MAX_SEARCH_CHARS => {
                return Err(CriteriaError::SearchTooLong);
            }
            Some(term) if !term.is_empty() => Some(term.to_lowercase()),
            _ => None,
        };

        let tags = normalize_tag_filter(query.tags.as_deref().unwrap_or_default())?;

        let sort = query.sort.unwrap_or_else(|| scope.default_sort());
        if !scope.allows(sort) {
            return Err(CriteriaError::SortUnavailable(sort));
        }
        let direction = query
            .direction
            .unwrap_or_else(|| sort.default_direction());

        Ok(Self {
            search,
            category_id: query.category_id,
            tags,
            sort,
            direction,
            window,
        })
    }

    /// Default view of `scope`: no filters, default ordering, first page.
    pub fn first_page(scope: QueryScope, page_size: u32) -> Result<Self, CriteriaError> {
        let limits = QueryLimits {
            default_page_size: page_size,
            max_page_size: page_size.max(1),
        };
        Self::from_query(&TipQuery::default(), &limits, scope)
    }

    /// Lowercased search needle, if any.
    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn category_id(&self) -> Option<Uuid> {
        self.category_id
    }

    /// Lowercased, deduplicated tag filter. Empty means no tag filter.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn sort(&self) -> SortField {
        self.sort
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    pub fn window(&self) -> PageWindow {
        self.window
    }
}

fn normalize_tag_filter(raw: &[String]) -> Result<Vec<String>, CriteriaError> {
    let mut seen = HashSet::new();
    let mut tags = Vec::new();
    for tag in raw {
        let trimmed = tag.trim();
        if trimmed.is_empty() {
            return Err(CriteriaError::TagFilter("empty tag".into()));
        }
        let key = trimmed.to_lowercase();
        if seen.insert(key.clone()) {
            tags.push(key);
        }
    }
    if tags.len() > MAX_TAGS {
        return Err(CriteriaError::TagFilter(format!(
            "at most {MAX_TAGS} tags may be combined"
        )));
    }
    Ok(tags)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(query: TipQuery) -> Result<QueryCriteria, CriteriaError> {
        QueryCriteria::from_query(&query, &QueryLimits::default(), QueryScope::Catalog)
    }

    #[test]
    fn empty_query_uses_catalog_defaults() {
        let criteria = catalog(TipQuery::default()).unwrap();
        assert_eq!(criteria.sort(), SortField::CreatedAt);
        assert_eq!(criteria.direction(), SortDirection::Descending);
        assert_eq!(criteria.window().number(), 1);
        assert_eq!(criteria.window().size(), 20);
        assert!(criteria.search().is_none());
        assert!(criteria.tags().is_empty());
    }

    #[test]
    fn favorites_default_to_added_descending() {
        let criteria = QueryCriteria::from_query(
            &TipQuery::default(),
            &QueryLimits::default(),
            QueryScope::Favorites,
        )
        .unwrap();
        assert_eq!(criteria.sort(), SortField::AddedAt);
        assert_eq!(criteria.direction(), SortDirection::Descending);
    }

    #[test]
    fn added_sort_is_rejected_for_catalog() {
        let err = catalog(TipQuery {
            sort: Some(SortField::AddedAt),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err, CriteriaError::SortUnavailable(SortField::AddedAt));
    }

    #[test]
    fn title_defaults_to_ascending() {
        let criteria = catalog(TipQuery {
            sort: Some(SortField::Title),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(criteria.direction(), SortDirection::Ascending);
    }

    #[test]
    fn direction_without_field_applies_to_default_field() {
        let criteria = catalog(TipQuery {
            direction: Some(SortDirection::Ascending),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(criteria.sort(), SortField::CreatedAt);
        assert_eq!(criteria.direction(), SortDirection::Ascending);
    }

    #[test]
    fn blank_search_means_no_search() {
        let criteria = catalog(TipQuery {
            search: Some("   ".into()),
            ..Default::default()
        })
        .unwrap();
        assert!(criteria.search().is_none());
    }

    #[test]
    fn overlong_search_is_rejected() {
        let err = catalog(TipQuery {
            search: Some("a".repeat(MAX_SEARCH_CHARS + 1)),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err, CriteriaError::SearchTooLong);
    }

    #[test]
    fn page_bounds_are_enforced() {
        assert!(matches!(
            catalog(TipQuery {
                page: Some(0),
                ..Default::default()
            }),
            Err(CriteriaError::Pagination(PaginationError::InvalidPageNumber(0)))
        ));
        assert!(matches!(
            catalog(TipQuery {
                page_size: Some(101),
                ..Default::default()
            }),
            Err(CriteriaError::Pagination(PaginationError::InvalidPageSize { .. }))
        ));
    }

    #[test]
    fn tag_filter_is_normalized() {
        let criteria = catalog(TipQuery {
            tags: Some(vec![" Kitchen".into(), "kitchen".into(), "Knives".into()]),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(criteria.tags(), ["kitchen", "knives"]);
    }

    #[test]
    fn empty_tag_entry_is_malformed() {
        assert!(matches!(
            catalog(TipQuery {
                tags: Some(vec!["kitchen".into(), " ".into()]),
                ..Default::default()
            }),
            Err(CriteriaError::TagFilter(_))
        ));
    }

    #[test]
    fn sort_names_parse_leniently() {
        assert_eq!("Updated".parse::<SortField>().unwrap(), SortField::UpdatedAt);
        assert_eq!(
            "desc".parse::<SortDirection>().unwrap(),
            SortDirection::Descending
        );
        assert!("popularity".parse::<SortField>().is_err());
    }
}
