//! In-process evaluation of query criteria over a candidate set.
//!
//! The engine is a pure function of its inputs: candidates plus criteria in, one
//! page plus the total match count out. Adapters may pre-narrow candidates, but the
//! engine always applies the full criteria.

use std::cmp::Ordering;

use time::OffsetDateTime;
use uuid::Uuid;

use tipcat_api_types::{PaginationMeta, TipPage};

use crate::domain::entities::TipRecord;

use super::criteria::{QueryCriteria, SortDirection, SortField};
use super::pagination::PageWindow;

/// A tip offered to the engine, with its favorite timestamp in favorites views.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub tip: TipRecord,
    pub added_at: Option<OffsetDateTime>,
}

impl Candidate {
    pub fn catalog(tip: TipRecord) -> Self {
        Self {
            tip,
            added_at: None,
        }
    }

    pub fn favorite(tip: TipRecord, added_at: OffsetDateTime) -> Self {
        Self {
            tip,
            added_at: Some(added_at),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub items: Vec<Candidate>,
    pub total: u64,
    pub window: PageWindow,
}

impl SearchResult {
    pub fn meta(&self) -> PaginationMeta {
        self.window.meta(self.total)
    }

    pub fn into_page(self) -> TipPage {
        let pagination = self.meta();
        TipPage {
            items: self
                .items
                .iter()
                .map(|candidate| candidate.tip.summary(candidate.added_at))
                .collect(),
            pagination,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Primary {
    Text(String),
    Time(Option<OffsetDateTime>),
}

pub struct SearchEngine;

impl SearchEngine {
    pub fn search(candidates: Vec<Candidate>, criteria: &QueryCriteria) -> SearchResult {
        let mut keyed: Vec<((Primary, Uuid), Candidate)> = candidates
            .into_iter()
            .filter(|candidate| Self::matches(&candidate.tip, criteria))
            .map(|candidate| (sort_key(&candidate, criteria.sort()), candidate))
            .collect();

        let direction = criteria.direction();
        keyed.sort_by(|(left, _), (right, _)| apply_direction(left.cmp(right), direction));

        let total = keyed.len() as u64;
        let window = criteria.window();
        let items = window.slice(keyed.into_iter().map(|(_, candidate)| candidate).collect());

        SearchResult {
            items,
            total,
            window,
        }
    }

    /// Whether `tip` passes every filter in `criteria`.
    pub fn matches(tip: &TipRecord, criteria: &QueryCriteria) -> bool {
        if tip.is_deleted() {
            return false;
        }
        if criteria
            .category_id()
            .is_some_and(|category_id| tip.category_id != category_id)
        {
            return false;
        }
        if !criteria.tags().iter().all(|tag| tip.has_tag(tag)) {
            return false;
        }
        match criteria.search() {
            Some(needle) => text_matches(tip, needle),
            None => true,
        }
    }
}

fn text_matches(tip: &TipRecord, needle: &str) -> bool {
    let contains = |haystack: &str| haystack.to_lowercase().contains(needle);
    contains(&tip.title)
        || contains(&tip.description)
        || tip.steps.iter().any(|step| contains(step))
        || tip.tags.iter().any(|tag| contains(tag))
}

fn sort_key(candidate: &Candidate, field: SortField) -> (Primary, Uuid) {
    let tip = &candidate.tip;
    let primary = match field {
        SortField::Title => Primary::Text(tip.title.to_lowercase()),
        SortField::CreatedAt => Primary::Time(Some(tip.created_at)),
        SortField::UpdatedAt => Primary::Time(Some(tip.last_modified())),
        SortField::AddedAt => Primary::Time(candidate.added_at),
    };
    (primary, tip.id)
}

fn apply_direction(ordering: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Ascending => ordering,
        SortDirection::Descending => ordering.reverse(),
    }
}
