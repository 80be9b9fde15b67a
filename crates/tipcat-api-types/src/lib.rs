//! Response types exposed by the tipcat catalog core.
//!
//! These types are shared between the library and its callers. They are plain serde
//! structures; timestamps are encoded as RFC 3339 strings.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Compact projection of a tip suitable for list views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TipSummary {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category_id: Uuid,
    pub tags: Vec<String>,
    pub step_count: u32,
    pub video_url: Option<String>,
    pub image_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub updated_at: Option<OffsetDateTime>,
    /// Set only when the summary comes from a favorites view.
    #[serde(
        with = "time::serde::rfc3339::option",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub added_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub total_items: u64,
    pub page_number: u32,
    pub page_size: u32,
    pub total_pages: u64,
}

impl PaginationMeta {
    pub fn new(total_items: u64, page_number: u32, page_size: u32) -> Self {
        let size = u64::from(page_size.max(1));
        Self {
            total_items,
            page_number,
            page_size,
            total_pages: total_items.div_ceil(size),
        }
    }
}

/// One page of a tip query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TipPage {
    pub items: Vec<TipSummary>,
    pub pagination: PaginationMeta,
}

/// Aggregate outcome of merging a client-side favorites list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeFavoritesSummary {
    pub added: u32,
    pub skipped: u32,
    pub failed: u32,
}

impl MergeFavoritesSummary {
    pub fn processed(&self) -> u32 {
        self.added + self.skipped + self.failed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    pub id: Uuid,
    pub name: String,
    pub tip_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDetail {
    pub id: Uuid,
    pub name: String,
    pub tip_count: u64,
    pub tips: Vec<TipSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_tips: u64,
    pub total_categories: u64,
    pub total_users: u64,
    pub recent_tips: Vec<TipSummary>,
}
