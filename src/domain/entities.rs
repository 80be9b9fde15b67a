//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use tipcat_api_types::TipSummary;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TipRecord {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub steps: Vec<String>,
    pub category_id: Uuid,
    pub tags: Vec<String>,
    pub video_url: Option<String>,
    pub image_url: Option<String>,
    pub created_at: OffsetDateTime,
    /// `None` until the tip is edited for the first time.
    pub updated_at: Option<OffsetDateTime>,
    pub deleted_at: Option<OffsetDateTime>,
}

impl TipRecord {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Timestamp used by the "updated" ordering.
    pub fn last_modified(&self) -> OffsetDateTime {
        self.updated_at.unwrap_or(self.created_at)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        let wanted = tag.to_lowercase();
        self.tags
            .iter()
            .any(|candidate| candidate.to_lowercase() == wanted)
    }

    pub fn summary(&self, added_at: Option<OffsetDateTime>) -> TipSummary {
        TipSummary {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            category_id: self.category_id,
            tags: self.tags.clone(),
            step_count: u32::try_from(self.steps.len()).unwrap_or(u32::MAX),
            video_url: self.video_url.clone(),
            image_url: self.image_url.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            added_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRecord {
    pub id: Uuid,
    pub name: String,
    pub created_at: OffsetDateTime,
    pub updated_at: Option<OffsetDateTime>,
    pub deleted_at: Option<OffsetDateTime>,
}

impl CategoryRecord {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// A user's bookmark of a tip. Identity is the `(user_id, tip_id)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FavoriteRecord {
    pub user_id: Uuid,
    pub tip_id: Uuid,
    pub added_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub display_name: String,
    pub created_at: OffsetDateTime,
}
