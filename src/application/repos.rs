//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::entities::{CategoryRecord, FavoriteRecord, TipRecord, UserRecord};
use crate::domain::tips::TipContent;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("referenced {entity} does not exist")]
    MissingReference { entity: &'static str },
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Narrowing an adapter may push down when fetching candidates.
///
/// Hints only ever shrink the candidate set; the search engine still applies the
/// full criteria afterwards.
#[derive(Debug, Clone, Default)]
pub struct CandidateHints {
    pub category_id: Option<Uuid>,
    /// Restrict to these tips. `Some(vec![])` yields no candidates.
    pub tip_ids: Option<Vec<Uuid>>,
}

impl CandidateHints {
    pub fn in_category(category_id: Uuid) -> Self {
        Self {
            category_id: Some(category_id),
            tip_ids: None,
        }
    }

    pub fn admits(&self, tip: &TipRecord) -> bool {
        if tip.is_deleted() {
            return false;
        }
        if self
            .category_id
            .is_some_and(|category_id| tip.category_id != category_id)
        {
            return false;
        }
        match &self.tip_ids {
            Some(ids) => ids.contains(&tip.id),
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryTipCount {
    pub category_id: Uuid,
    pub tip_count: u64,
}

#[async_trait]
pub trait TipsRepo: Send + Sync {
    /// Live tips admitted by `hints`.
    async fn fetch_candidates(&self, hints: &CandidateHints)
    -> Result<Vec<TipRecord>, RepoError>;

    /// Fetch a tip by id, soft-deleted or not.
    async fn find_tip(&self, id: Uuid) -> Result<Option<TipRecord>, RepoError>;

    async fn tips_by_category(&self, category_id: Uuid) -> Result<Vec<TipRecord>, RepoError>;

    async fn count_tips(&self) -> Result<u64, RepoError>;

    /// Live tip counts for every category that has at least one live tip.
    async fn count_by_category(&self) -> Result<Vec<CategoryTipCount>, RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateTipParams {
    pub category_id: Uuid,
    pub content: TipContent,
}

#[derive(Debug, Clone)]
pub struct UpdateTipParams {
    pub id: Uuid,
    pub category_id: Uuid,
    pub content: TipContent,
}

/// An applied update together with the category the tip was in when the write
/// took effect.
#[derive(Debug, Clone)]
pub struct TipUpdate {
    pub previous_category_id: Uuid,
    pub tip: TipRecord,
}

#[async_trait]
pub trait TipsWriteRepo: Send + Sync {
    /// Fails with `MissingReference` when the category is missing or soft-deleted.
    async fn create_tip(&self, params: CreateTipParams) -> Result<TipRecord, RepoError>;

    /// Fails with `NotFound` for missing or soft-deleted tips and with
    /// `MissingReference` when the target category is gone. The previous category is
    /// read under the same lock or transaction as the write.
    async fn update_tip(&self, params: UpdateTipParams) -> Result<TipUpdate, RepoError>;

    /// Fails with `NotFound` for missing or already soft-deleted tips.
    async fn soft_delete_tip(&self, id: Uuid) -> Result<TipRecord, RepoError>;
}

#[async_trait]
pub trait CategoriesRepo: Send + Sync {
    /// Live categories in no particular order.
    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError>;

    async fn find_category(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError>;

    /// Live category whose name matches case-insensitively.
    async fn find_category_by_name(&self, name: &str)
    -> Result<Option<CategoryRecord>, RepoError>;

    async fn count_categories(&self) -> Result<u64, RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateCategoryParams {
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct RenameCategoryParams {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct CategoryDeletion {
    pub category: CategoryRecord,
    pub tips_deleted: u64,
}

#[async_trait]
pub trait CategoriesWriteRepo: Send + Sync {
    /// Fails with `Duplicate` if a live category already has the name.
    async fn create_category(
        &self,
        params: CreateCategoryParams,
    ) -> Result<CategoryRecord, RepoError>;

    async fn rename_category(
        &self,
        params: RenameCategoryParams,
    ) -> Result<CategoryRecord, RepoError>;

    /// Soft-delete the category and all its live tips in one step.
    async fn soft_delete_category(&self, id: Uuid) -> Result<CategoryDeletion, RepoError>;
}

#[async_trait]
pub trait FavoritesRepo: Send + Sync {
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<FavoriteRecord>, RepoError>;

    async fn find_favorite(
        &self,
        user_id: Uuid,
        tip_id: Uuid,
    ) -> Result<Option<FavoriteRecord>, RepoError>;

    /// Fails with `Duplicate` if the pair already exists.
    async fn add_favorite(&self, favorite: FavoriteRecord) -> Result<FavoriteRecord, RepoError>;

    /// Physically remove the pair. Returns whether it existed.
    async fn remove_favorite(&self, user_id: Uuid, tip_id: Uuid) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn find_user(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError>;

    async fn count_users(&self) -> Result<u64, RepoError>;

    /// Remove the user and their favorites. Returns whether the user existed.
    async fn delete_user(&self, id: Uuid) -> Result<bool, RepoError>;
}
