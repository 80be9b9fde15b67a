//! Favorites: the per-user view over the catalog and its bookmarks.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{debug, info, warn};
use uuid::Uuid;

use tipcat_api_types::{MergeFavoritesSummary, TipPage};

use crate::application::criteria::{QueryCriteria, QueryLimits, QueryScope, TipQuery};
use crate::application::error::AppError;
use crate::application::repos::{CandidateHints, FavoritesRepo, RepoError, TipsRepo, UsersRepo};
use crate::application::search::{Candidate, SearchEngine};
use crate::domain::entities::FavoriteRecord;

#[derive(Clone)]
pub struct FavoritesService {
    favorites: Arc<dyn FavoritesRepo>,
    tips: Arc<dyn TipsRepo>,
    users: Arc<dyn UsersRepo>,
    limits: QueryLimits,
}

impl FavoritesService {
    pub fn new(
        favorites: Arc<dyn FavoritesRepo>,
        tips: Arc<dyn TipsRepo>,
        users: Arc<dyn UsersRepo>,
        limits: QueryLimits,
    ) -> Self {
        Self {
            favorites,
            tips,
            users,
            limits,
        }
    }

    /// Query a user's favorited tips. Favorites of tips that are gone are dropped.
    pub async fn list(&self, user_id: Uuid, query: &TipQuery) -> Result<TipPage, AppError> {
        let criteria = QueryCriteria::from_query(query, &self.limits, QueryScope::Favorites)?;
        self.ensure_user(user_id).await?;

        let favorites = self.favorites.list_for_user(user_id).await?;
        let added_at: HashMap<Uuid, OffsetDateTime> = favorites
            .iter()
            .map(|favorite| (favorite.tip_id, favorite.added_at))
            .collect();

        let hints = CandidateHints {
            category_id: criteria.category_id(),
            tip_ids: Some(added_at.keys().copied().collect()),
        };
        let tips = self.tips.fetch_candidates(&hints).await?;

        if criteria.category_id().is_none() && tips.len() < added_at.len() {
            let resolved: HashSet<Uuid> = tips.iter().map(|tip| tip.id).collect();
            for tip_id in added_at.keys().filter(|id| !resolved.contains(id)) {
                debug!(user_id = %user_id, tip_id = %tip_id, "Dropping favorite of unavailable tip");
            }
        }

        let candidates = tips
            .into_iter()
            .filter_map(|tip| {
                let added = added_at.get(&tip.id).copied()?;
                Some(Candidate::favorite(tip, added))
            })
            .collect();
        Ok(SearchEngine::search(candidates, &criteria).into_page())
    }

    pub async fn add(&self, user_id: Uuid, tip_id: Uuid) -> Result<FavoriteRecord, AppError> {
        self.ensure_user(user_id).await?;
        self.ensure_live_tip(tip_id).await?;

        let favorite = FavoriteRecord {
            user_id,
            tip_id,
            added_at: OffsetDateTime::now_utc(),
        };
        let stored = self
            .favorites
            .add_favorite(favorite)
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => AppError::conflict("tip is already a favorite"),
                other => other.into(),
            })?;
        info!(user_id = %user_id, tip_id = %tip_id, "Favorite added");
        Ok(stored)
    }

    /// Remove a favorite physically. The tip itself is untouched.
    pub async fn remove(&self, user_id: Uuid, tip_id: Uuid) -> Result<(), AppError> {
        if !self.favorites.remove_favorite(user_id, tip_id).await? {
            return Err(AppError::not_found("favorite"));
        }
        info!(user_id = %user_id, tip_id = %tip_id, "Favorite removed");
        Ok(())
    }

    /// Merge a client-side favorites list.
    ///
    /// Every id is classified exactly once: `added`, `skipped` (already a favorite,
    /// or repeated in the input) or `failed` (unresolvable tip, storage error).
    /// Individual failures never stop the merge, so replaying it is safe.
    pub async fn merge_local(
        &self,
        user_id: Uuid,
        tip_ids: &[Uuid],
    ) -> Result<MergeFavoritesSummary, AppError> {
        self.ensure_user(user_id).await?;

        let mut favorited: HashSet<Uuid> = self
            .favorites
            .list_for_user(user_id)
            .await?
            .into_iter()
            .map(|favorite| favorite.tip_id)
            .collect();
        let mut seen = HashSet::new();
        let mut summary = MergeFavoritesSummary::default();

        for &tip_id in tip_ids {
            if !seen.insert(tip_id) || favorited.contains(&tip_id) {
                summary.skipped += 1;
                continue;
            }

            match self.merge_one(user_id, tip_id).await {
                MergeOutcome::Added => {
                    favorited.insert(tip_id);
                    summary.added += 1;
                }
                MergeOutcome::Skipped => summary.skipped += 1,
                MergeOutcome::Failed => summary.failed += 1,
            }
        }

        info!(
            user_id = %user_id,
            added = summary.added,
            skipped = summary.skipped,
            failed = summary.failed,
            "Local favorites merged"
        );
        Ok(summary)
    }

    async fn merge_one(&self, user_id: Uuid, tip_id: Uuid) -> MergeOutcome {
        match self.tips.find_tip(tip_id).await {
            Ok(Some(tip)) if !tip.is_deleted() => {}
            Ok(_) => {
                debug!(user_id = %user_id, tip_id = %tip_id, "Merge could not resolve tip");
                return MergeOutcome::Failed;
            }
            Err(err) => {
                warn!(user_id = %user_id, tip_id = %tip_id, error = %err, "Merge failed to resolve tip");
                return MergeOutcome::Failed;
            }
        }

        let favorite = FavoriteRecord {
            user_id,
            tip_id,
            added_at: OffsetDateTime::now_utc(),
        };
        match self.favorites.add_favorite(favorite).await {
            Ok(_) => MergeOutcome::Added,
            Err(RepoError::Duplicate { .. }) => MergeOutcome::Skipped,
            Err(err) => {
                warn!(user_id = %user_id, tip_id = %tip_id, error = %err, "Merge failed to add favorite");
                MergeOutcome::Failed
            }
        }
    }

    async fn ensure_user(&self, user_id: Uuid) -> Result<(), AppError> {
        match self.users.find_user(user_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::not_found("user")),
        }
    }

    async fn ensure_live_tip(&self, tip_id: Uuid) -> Result<(), AppError> {
        match self.tips.find_tip(tip_id).await? {
            Some(tip) if !tip.is_deleted() => Ok(()),
            _ => Err(AppError::not_found("tip")),
        }
    }
}

enum MergeOutcome {
    Added,
    Skipped,
    Failed,
}
