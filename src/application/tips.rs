//! Catalog queries and tip mutations.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use tipcat_api_types::TipPage;

use crate::application::criteria::{QueryCriteria, QueryLimits, QueryScope, TipQuery};
use crate::application::error::AppError;
use crate::application::mutation::run_to_completion;
use crate::application::repos::{
    CandidateHints, CategoriesRepo, CreateTipParams, TipUpdate, TipsRepo, TipsWriteRepo,
    UpdateTipParams,
};
use crate::application::search::{Candidate, SearchEngine};
use crate::cache::CacheInvalidator;
use crate::domain::entities::TipRecord;
use crate::domain::tips::TipDraft;

#[derive(Clone)]
pub struct TipService {
    reader: Arc<dyn TipsRepo>,
    writer: Arc<dyn TipsWriteRepo>,
    categories: Arc<dyn CategoriesRepo>,
    invalidator: Arc<CacheInvalidator>,
    limits: QueryLimits,
}

impl TipService {
    pub fn new(
        reader: Arc<dyn TipsRepo>,
        writer: Arc<dyn TipsWriteRepo>,
        categories: Arc<dyn CategoriesRepo>,
        invalidator: Arc<CacheInvalidator>,
        limits: QueryLimits,
    ) -> Self {
        Self {
            reader,
            writer,
            categories,
            invalidator,
            limits,
        }
    }

    /// Filter, sort and paginate the live catalog.
    pub async fn query(&self, query: &TipQuery) -> Result<TipPage, AppError> {
        let criteria = QueryCriteria::from_query(query, &self.limits, QueryScope::Catalog)?;
        let hints = CandidateHints {
            category_id: criteria.category_id(),
            tip_ids: None,
        };
        let candidates = self
            .reader
            .fetch_candidates(&hints)
            .await?
            .into_iter()
            .map(Candidate::catalog)
            .collect();
        Ok(SearchEngine::search(candidates, &criteria).into_page())
    }

    pub async fn create_tip(
        &self,
        category_id: Uuid,
        draft: TipDraft,
    ) -> Result<TipRecord, AppError> {
        let content = draft.validate()?;
        self.ensure_live_category(category_id).await?;

        let this = self.clone();
        run_to_completion("create_tip", async move {
            let tip = this
                .writer
                .create_tip(CreateTipParams {
                    category_id,
                    content,
                })
                .await
                .map_err(|err| AppError::from_repo(err, "category"))?;
            this.invalidator
                .tip_created(tip.id, tip.category_id)
                .await?;
            info!(tip_id = %tip.id, category_id = %tip.category_id, "Tip created");
            Ok(tip)
        })
        .await
    }

    /// Replace a tip's content, optionally moving it to another category.
    ///
    /// The vacated category is the one the repository saw when applying the write.
    pub async fn update_tip(
        &self,
        id: Uuid,
        category_id: Uuid,
        draft: TipDraft,
    ) -> Result<TipRecord, AppError> {
        let content = draft.validate()?;

        let this = self.clone();
        run_to_completion("update_tip", async move {
            let TipUpdate {
                previous_category_id,
                tip,
            } = this
                .writer
                .update_tip(UpdateTipParams {
                    id,
                    category_id,
                    content,
                })
                .await
                .map_err(|err| AppError::from_repo(err, "tip"))?;
            this.invalidator
                .tip_updated(tip.id, previous_category_id, tip.category_id)
                .await?;
            info!(
                tip_id = %tip.id,
                previous_category_id = %previous_category_id,
                category_id = %tip.category_id,
                "Tip updated"
            );
            Ok(tip)
        })
        .await
    }

    pub async fn delete_tip(&self, id: Uuid) -> Result<TipRecord, AppError> {
        let this = self.clone();
        run_to_completion("delete_tip", async move {
            let tip = this
                .writer
                .soft_delete_tip(id)
                .await
                .map_err(|err| AppError::from_repo(err, "tip"))?;
            this.invalidator
                .tip_deleted(tip.id, tip.category_id)
                .await?;
            info!(tip_id = %tip.id, category_id = %tip.category_id, "Tip deleted");
            Ok(tip)
        })
        .await
    }

    async fn ensure_live_category(&self, category_id: Uuid) -> Result<(), AppError> {
        match self.categories.find_category(category_id).await? {
            Some(category) if !category.is_deleted() => Ok(()),
            _ => Err(AppError::not_found("category")),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use time::OffsetDateTime;

    use super::*;
    use crate::application::repos::{CategoryTipCount, RepoError};
    use crate::cache::{CacheConfig, MemoryCacheStore};
    use crate::domain::entities::CategoryRecord;
    use crate::infra::memory::InMemoryRepositories;

    struct StubCategories {
        live: Uuid,
    }

    #[async_trait]
    impl CategoriesRepo for StubCategories {
        async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError> {
            Ok(Vec::new())
        }

        async fn find_category(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError> {
            Ok((id == self.live).then(|| CategoryRecord {
                id,
                name: "Kitchen".into(),
                created_at: OffsetDateTime::UNIX_EPOCH,
                updated_at: None,
                deleted_at: None,
            }))
        }

        async fn find_category_by_name(
            &self,
            _name: &str,
        ) -> Result<Option<CategoryRecord>, RepoError> {
            Ok(None)
        }

        async fn count_categories(&self) -> Result<u64, RepoError> {
            Ok(1)
        }
    }

    #[derive(Default)]
    struct RecordingTips {
        created: Mutex<Vec<CreateTipParams>>,
    }

    #[async_trait]
    impl TipsRepo for RecordingTips {
        async fn fetch_candidates(
            &self,
            _hints: &CandidateHints,
        ) -> Result<Vec<TipRecord>, RepoError> {
            Ok(Vec::new())
        }

        async fn find_tip(&self, _id: Uuid) -> Result<Option<TipRecord>, RepoError> {
            Ok(None)
        }

        async fn tips_by_category(&self, _category_id: Uuid) -> Result<Vec<TipRecord>, RepoError> {
            Ok(Vec::new())
        }

        async fn count_tips(&self) -> Result<u64, RepoError> {
            Ok(0)
        }

        async fn count_by_category(&self) -> Result<Vec<CategoryTipCount>, RepoError> {
            Ok(Vec::new())
        }
    }

    #[async_trait]
    impl TipsWriteRepo for RecordingTips {
        async fn create_tip(&self, params: CreateTipParams) -> Result<TipRecord, RepoError> {
            self.created.lock().unwrap().push(params.clone());
            Ok(TipRecord {
                id: Uuid::new_v4(),
                title: params.content.title,
                description: params.content.description,
                steps: params.content.steps,
                category_id: params.category_id,
                tags: params.content.tags,
                video_url: params.content.video_url,
                image_url: params.content.image_url,
                created_at: OffsetDateTime::now_utc(),
                updated_at: None,
                deleted_at: None,
            })
        }

        async fn update_tip(&self, _params: UpdateTipParams) -> Result<TipUpdate, RepoError> {
            Err(RepoError::NotFound)
        }

        async fn soft_delete_tip(&self, _id: Uuid) -> Result<TipRecord, RepoError> {
            Err(RepoError::NotFound)
        }
    }

    fn service(category: Uuid, tips: Arc<RecordingTips>) -> TipService {
        let store = Arc::new(MemoryCacheStore::new(&CacheConfig::default()));
        TipService::new(
            tips.clone(),
            tips,
            Arc::new(StubCategories { live: category }),
            Arc::new(CacheInvalidator::new(store)),
            QueryLimits::default(),
        )
    }

    fn draft() -> TipDraft {
        TipDraft {
            title: "Descale a kettle".into(),
            steps: vec!["Fill with vinegar".into()],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_requires_live_category() {
        let tips = Arc::new(RecordingTips::default());
        let service = service(Uuid::new_v4(), tips.clone());

        let err = service
            .create_tip(Uuid::new_v4(), draft())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { entity: "category" }));
        assert!(tips.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_draft_never_reaches_the_repository() {
        let category = Uuid::new_v4();
        let tips = Arc::new(RecordingTips::default());
        let service = service(category, tips.clone());

        let err = service
            .create_tip(category, TipDraft::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(tips.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_persists_normalized_content() {
        let category = Uuid::new_v4();
        let tips = Arc::new(RecordingTips::default());
        let service = service(category, tips.clone());

        let tip = service.create_tip(category, draft()).await.unwrap();
        assert_eq!(tip.category_id, category);
        assert_eq!(tips.created.lock().unwrap().len(), 1);
    }

    /// Service over the in-memory adapter whose category reader still reports
    /// `stale_live` as live, whatever the adapter holds.
    fn service_with_stale_categories(
        repos: Arc<InMemoryRepositories>,
        stale_live: Uuid,
    ) -> TipService {
        let store = Arc::new(MemoryCacheStore::new(&CacheConfig::default()));
        TipService::new(
            repos.clone(),
            repos,
            Arc::new(StubCategories { live: stale_live }),
            Arc::new(CacheInvalidator::new(store)),
            QueryLimits::default(),
        )
    }

    fn category(id: Uuid, deleted: bool) -> CategoryRecord {
        CategoryRecord {
            id,
            name: format!("category-{id}"),
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: None,
            deleted_at: deleted.then_some(OffsetDateTime::UNIX_EPOCH),
        }
    }

    #[tokio::test]
    async fn create_into_category_deleted_after_check_is_not_found() {
        let gone = Uuid::new_v4();
        let repos = Arc::new(InMemoryRepositories::new());
        repos.insert_category(category(gone, true)).await;
        let service = service_with_stale_categories(repos, gone);

        let err = service.create_tip(gone, draft()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { entity: "category" }));
    }

    #[tokio::test]
    async fn update_tells_missing_tip_from_missing_category() {
        let live = Uuid::new_v4();
        let gone = Uuid::new_v4();
        let repos = Arc::new(InMemoryRepositories::new());
        repos.insert_category(category(live, false)).await;
        repos.insert_category(category(gone, true)).await;
        let service = service_with_stale_categories(repos, live);
        let tip = service.create_tip(live, draft()).await.unwrap();

        let err = service.update_tip(tip.id, gone, draft()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { entity: "category" }));

        let err = service
            .update_tip(Uuid::new_v4(), live, draft())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { entity: "tip" }));
    }

    #[tokio::test]
    async fn delete_of_unknown_tip_is_not_found() {
        let tips = Arc::new(RecordingTips::default());
        let service = service(Uuid::new_v4(), tips);
        let err = service.delete_tip(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { entity: "tip" }));
    }
}
