use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::application::error::AppError;
use crate::application::mutation::run_to_completion;
use crate::application::repos::{
    CategoriesRepo, CategoriesWriteRepo, CategoryDeletion, CreateCategoryParams,
    RenameCategoryParams,
};
use crate::cache::CacheInvalidator;
use crate::domain::categories::normalize_name;
use crate::domain::entities::CategoryRecord;

#[derive(Clone)]
pub struct CategoryService {
    reader: Arc<dyn CategoriesRepo>,
    writer: Arc<dyn CategoriesWriteRepo>,
    invalidator: Arc<CacheInvalidator>,
}

impl CategoryService {
    pub fn new(
        reader: Arc<dyn CategoriesRepo>,
        writer: Arc<dyn CategoriesWriteRepo>,
        invalidator: Arc<CacheInvalidator>,
    ) -> Self {
        Self {
            reader,
            writer,
            invalidator,
        }
    }

    pub async fn create_category(&self, name: &str) -> Result<CategoryRecord, AppError> {
        let name = normalize_name(name)?;
        self.ensure_name_available(&name, None).await?;

        let this = self.clone();
        run_to_completion("create_category", async move {
            let category = this
                .writer
                .create_category(CreateCategoryParams { name })
                .await?;
            this.invalidator.category_created(category.id).await?;
            info!(category_id = %category.id, name = %category.name, "Category created");
            Ok(category)
        })
        .await
    }

    pub async fn rename_category(&self, id: Uuid, name: &str) -> Result<CategoryRecord, AppError> {
        let name = normalize_name(name)?;
        match self.reader.find_category(id).await? {
            Some(category) if !category.is_deleted() => {}
            _ => return Err(AppError::not_found("category")),
        }
        self.ensure_name_available(&name, Some(id)).await?;

        let this = self.clone();
        run_to_completion("rename_category", async move {
            let category = this
                .writer
                .rename_category(RenameCategoryParams { id, name })
                .await
                .map_err(|err| AppError::from_repo(err, "category"))?;
            this.invalidator.category_renamed(category.id).await?;
            info!(category_id = %category.id, name = %category.name, "Category renamed");
            Ok(category)
        })
        .await
    }

    /// Soft-delete a category together with every live tip filed under it.
    pub async fn delete_category(&self, id: Uuid) -> Result<CategoryDeletion, AppError> {
        let this = self.clone();
        run_to_completion("delete_category", async move {
            let deletion = this
                .writer
                .soft_delete_category(id)
                .await
                .map_err(|err| AppError::from_repo(err, "category"))?;
            this.invalidator.category_deleted(id).await?;
            info!(
                category_id = %id,
                tips_deleted = deletion.tips_deleted,
                "Category deleted"
            );
            Ok(deletion)
        })
        .await
    }

    async fn ensure_name_available(&self, name: &str, owner: Option<Uuid>) -> Result<(), AppError> {
        match self.reader.find_category_by_name(name).await? {
            Some(existing) if Some(existing.id) != owner && !existing.is_deleted() => {
                Err(AppError::conflict(format!(
                    "category `{}` already exists",
                    existing.name
                )))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use time::OffsetDateTime;

    use super::*;
    use crate::application::repos::RepoError;
    use crate::cache::{CacheConfig, MemoryCacheStore};
    use crate::domain::categories::name_key;

    #[derive(Default)]
    struct StubCategories {
        rows: Mutex<Vec<CategoryRecord>>,
    }

    impl StubCategories {
        fn with(names: &[&str]) -> Self {
            let rows = names
                .iter()
                .map(|name| CategoryRecord {
                    id: Uuid::new_v4(),
                    name: name.to_string(),
                    created_at: OffsetDateTime::UNIX_EPOCH,
                    updated_at: None,
                    deleted_at: None,
                })
                .collect();
            Self {
                rows: Mutex::new(rows),
            }
        }

        fn id_of(&self, name: &str) -> Uuid {
            self.rows
                .lock()
                .unwrap()
                .iter()
                .find(|row| row.name == name)
                .map(|row| row.id)
                .unwrap()
        }
    }

    #[async_trait]
    impl CategoriesRepo for StubCategories {
        async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError> {
            Ok(self.rows.lock().unwrap().clone())
        }

        async fn find_category(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .find(|row| row.id == id)
                .cloned())
        }

        async fn find_category_by_name(
            &self,
            name: &str,
        ) -> Result<Option<CategoryRecord>, RepoError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .find(|row| name_key(&row.name) == name_key(name))
                .cloned())
        }

        async fn count_categories(&self) -> Result<u64, RepoError> {
            Ok(self.rows.lock().unwrap().len() as u64)
        }
    }

    #[async_trait]
    impl CategoriesWriteRepo for StubCategories {
        async fn create_category(
            &self,
            params: CreateCategoryParams,
        ) -> Result<CategoryRecord, RepoError> {
            let record = CategoryRecord {
                id: Uuid::new_v4(),
                name: params.name,
                created_at: OffsetDateTime::now_utc(),
                updated_at: None,
                deleted_at: None,
            };
            self.rows.lock().unwrap().push(record.clone());
            Ok(record)
        }

        async fn rename_category(
            &self,
            params: RenameCategoryParams,
        ) -> Result<CategoryRecord, RepoError> {
            let mut rows = self.rows.lock().unwrap();
            let row = rows
                .iter_mut()
                .find(|row| row.id == params.id)
                .ok_or(RepoError::NotFound)?;
            row.name = params.name;
            Ok(row.clone())
        }

        async fn soft_delete_category(&self, _id: Uuid) -> Result<CategoryDeletion, RepoError> {
            Err(RepoError::NotFound)
        }
    }

    fn service(repo: Arc<StubCategories>) -> CategoryService {
        let store = Arc::new(MemoryCacheStore::new(&CacheConfig::default()));
        CategoryService::new(
            repo.clone(),
            repo,
            Arc::new(CacheInvalidator::new(store)),
        )
    }

    #[tokio::test]
    async fn duplicate_name_is_a_conflict_regardless_of_case() {
        let repo = Arc::new(StubCategories::with(&["Garden"]));
        let err = service(repo)
            .create_category("  gARDEN ")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn renaming_to_own_name_with_new_case_is_allowed() {
        let repo = Arc::new(StubCategories::with(&["Garden"]));
        let id = repo.id_of("Garden");
        let renamed = service(repo)
            .rename_category(id, "GARDEN")
            .await
            .unwrap();
        assert_eq!(renamed.name, "GARDEN");
    }

    #[tokio::test]
    async fn renaming_onto_another_category_conflicts() {
        let repo = Arc::new(StubCategories::with(&["Garden", "Kitchen"]));
        let id = repo.id_of("Kitchen");
        let err = service(repo)
            .rename_category(id, "garden")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn deleting_unknown_category_is_not_found() {
        let repo = Arc::new(StubCategories::default());
        let err = service(repo)
            .delete_category(Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { entity: "category" }));
    }
}
