//! Read-through views backed by the shared cache.
//!
//! A miss loads from the repositories and fills the key; a hit returns the decoded
//! entry. Cache trouble never fails a read: a store error falls back to the
//! repositories and an undecodable entry counts as a miss.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use metrics::counter;
use serde::{Serialize, de::DeserializeOwned};
use tracing::warn;
use uuid::Uuid;

use tipcat_api_types::{CategoryDetail, CategorySummary, DashboardSummary};

use crate::application::criteria::{QueryCriteria, QueryScope};
use crate::application::error::AppError;
use crate::application::repos::{CandidateHints, CategoriesRepo, TipsRepo, UsersRepo};
use crate::application::search::{Candidate, SearchEngine};
use crate::cache::{CacheConfig, CacheKey, CacheStore};

pub(crate) const METRIC_CACHE_HIT_TOTAL: &str = "tipcat_cache_hit_total";
pub(crate) const METRIC_CACHE_MISS_TOTAL: &str = "tipcat_cache_miss_total";

pub const DASHBOARD_RECENT_TIPS: u32 = 5;

#[derive(Clone)]
pub struct ViewService {
    tips: Arc<dyn TipsRepo>,
    categories: Arc<dyn CategoriesRepo>,
    users: Arc<dyn UsersRepo>,
    store: Arc<dyn CacheStore>,
    config: CacheConfig,
}

impl ViewService {
    pub fn new(
        tips: Arc<dyn TipsRepo>,
        categories: Arc<dyn CategoriesRepo>,
        users: Arc<dyn UsersRepo>,
        store: Arc<dyn CacheStore>,
        config: CacheConfig,
    ) -> Self {
        Self {
            tips,
            categories,
            users,
            store,
            config,
        }
    }

    /// Live categories sorted by name, each with its live tip count.
    pub async fn category_list(&self) -> Result<Vec<CategorySummary>, AppError> {
        self.read_through(CacheKey::CategoryList, || async {
            let counts: HashMap<Uuid, u64> = self
                .tips
                .count_by_category()
                .await?
                .into_iter()
                .map(|row| (row.category_id, row.tip_count))
                .collect();
            let mut categories = self.categories.list_categories().await?;
            categories.retain(|category| !category.is_deleted());
            categories.sort_by(|a, b| {
                (a.name.to_lowercase(), a.id).cmp(&(b.name.to_lowercase(), b.id))
            });
            Ok(categories
                .into_iter()
                .map(|category| CategorySummary {
                    tip_count: counts.get(&category.id).copied().unwrap_or(0),
                    id: category.id,
                    name: category.name,
                })
                .collect())
        })
        .await
    }

    /// One live category with its live tips, newest first.
    pub async fn category_detail(&self, id: Uuid) -> Result<CategoryDetail, AppError> {
        self.read_through(CacheKey::Category(id), || async {
            let category = self
                .categories
                .find_category(id)
                .await?
                .filter(|category| !category.is_deleted())
                .ok_or(AppError::not_found("category"))?;
            let mut tips = self.tips.tips_by_category(id).await?;
            tips.retain(|tip| !tip.is_deleted());
            tips.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
            Ok(CategoryDetail {
                id: category.id,
                name: category.name,
                tip_count: tips.len() as u64,
                tips: tips.iter().map(|tip| tip.summary(None)).collect(),
            })
        })
        .await
    }

    pub async fn dashboard(&self) -> Result<DashboardSummary, AppError> {
        self.read_through(CacheKey::Dashboard, || async {
            let total_tips = self.tips.count_tips().await?;
            let total_categories = self.categories.count_categories().await?;
            let total_users = self.users.count_users().await?;

            let criteria = QueryCriteria::first_page(QueryScope::Catalog, DASHBOARD_RECENT_TIPS)?;
            let candidates = self
                .tips
                .fetch_candidates(&CandidateHints::default())
                .await?
                .into_iter()
                .map(Candidate::catalog)
                .collect();
            let recent = SearchEngine::search(candidates, &criteria);

            Ok(DashboardSummary {
                total_tips,
                total_categories,
                total_users,
                recent_tips: recent
                    .items
                    .iter()
                    .map(|candidate| candidate.tip.summary(None))
                    .collect(),
            })
        })
        .await
    }

    async fn read_through<T, F, Fut>(&self, key: CacheKey, load: F) -> Result<T, AppError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        if !self.config.enabled {
            return load().await;
        }

        let wire = key.to_string();
        let family = key.family().as_str();

        match self.store.get(&wire).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<T>(&bytes) {
                Ok(value) => {
                    counter!(METRIC_CACHE_HIT_TOTAL, "family" => family).increment(1);
                    return Ok(value);
                }
                Err(err) => {
                    warn!(key = %wire, error = %err, "Discarding undecodable cache entry");
                }
            },
            Ok(None) => {}
            Err(err) => {
                warn!(key = %wire, error = %err, "Cache read failed; loading from repository");
                counter!(METRIC_CACHE_MISS_TOTAL, "family" => family).increment(1);
                return load().await;
            }
        }

        counter!(METRIC_CACHE_MISS_TOTAL, "family" => family).increment(1);
        let value = load().await?;
        match serde_json::to_vec(&value) {
            Ok(encoded) => {
                if let Err(err) = self
                    .store
                    .set(&wire, Bytes::from(encoded), self.config.ttl())
                    .await
                {
                    warn!(key = %wire, error = %err, "Cache fill failed");
                }
            }
            Err(err) => warn!(key = %wire, error = %err, "Cache entry could not be encoded"),
        }
        Ok(value)
    }
}
