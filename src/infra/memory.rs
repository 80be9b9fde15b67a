//! In-process repository adapter.
//!
//! Holds the whole catalog behind one async `RwLock`. Each trait call takes the lock
//! once, so every write is atomic with respect to readers.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::application::repos::{
    CandidateHints, CategoriesRepo, CategoriesWriteRepo, CategoryDeletion, CategoryTipCount,
    CreateCategoryParams, CreateTipParams, FavoritesRepo, RenameCategoryParams, RepoError,
    TipUpdate, TipsRepo, TipsWriteRepo, UpdateTipParams, UsersRepo,
};
use crate::domain::categories::name_key;
use crate::domain::entities::{CategoryRecord, FavoriteRecord, TipRecord, UserRecord};

const CATEGORY_NAME_CONSTRAINT: &str = "categories_live_name_key";
const FAVORITE_CONSTRAINT: &str = "favorites_pkey";

/// Records an adapter starts from.
#[derive(Debug, Clone, Default)]
pub struct CatalogSeed {
    pub users: Vec<UserRecord>,
    pub categories: Vec<CategoryRecord>,
    pub tips: Vec<TipRecord>,
    pub favorites: Vec<FavoriteRecord>,
}

#[derive(Debug, Default)]
struct CatalogState {
    users: HashMap<Uuid, UserRecord>,
    categories: HashMap<Uuid, CategoryRecord>,
    tips: HashMap<Uuid, TipRecord>,
    favorites: BTreeMap<(Uuid, Uuid), FavoriteRecord>,
}

impl CatalogState {
    fn live_name_taken(&self, name: &str, except: Option<Uuid>) -> bool {
        let wanted = name_key(name);
        self.categories.values().any(|category| {
            !category.is_deleted() && Some(category.id) != except && name_key(&category.name) == wanted
        })
    }

    fn live_category(&self, id: Uuid) -> Result<&CategoryRecord, RepoError> {
        match self.categories.get(&id) {
            Some(category) if !category.is_deleted() => Ok(category),
            Some(_) | None => Err(RepoError::MissingReference { entity: "category" }),
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryRepositories {
    state: RwLock<CatalogState>,
}

impl InMemoryRepositories {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: CatalogSeed) -> Self {
        let state = CatalogState {
            users: seed.users.into_iter().map(|user| (user.id, user)).collect(),
            categories: seed
                .categories
                .into_iter()
                .map(|category| (category.id, category))
                .collect(),
            tips: seed.tips.into_iter().map(|tip| (tip.id, tip)).collect(),
            favorites: seed
                .favorites
                .into_iter()
                .map(|favorite| ((favorite.user_id, favorite.tip_id), favorite))
                .collect(),
        };
        Self {
            state: RwLock::new(state),
        }
    }

    pub async fn insert_user(&self, user: UserRecord) {
        self.state.write().await.users.insert(user.id, user);
    }

    pub async fn insert_category(&self, category: CategoryRecord) {
        self.state
            .write()
            .await
            .categories
            .insert(category.id, category);
    }

    pub async fn insert_tip(&self, tip: TipRecord) {
        self.state.write().await.tips.insert(tip.id, tip);
    }
}

#[async_trait]
impl TipsRepo for InMemoryRepositories {
    async fn fetch_candidates(&self, hints: &CandidateHints) -> Result<Vec<TipRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .tips
            .values()
            .filter(|tip| hints.admits(tip))
            .cloned()
            .collect())
    }

    async fn find_tip(&self, id: Uuid) -> Result<Option<TipRecord>, RepoError> {
        Ok(self.state.read().await.tips.get(&id).cloned())
    }

    async fn tips_by_category(&self, category_id: Uuid) -> Result<Vec<TipRecord>, RepoError> {
        self.fetch_candidates(&CandidateHints::in_category(category_id))
            .await
    }

    async fn count_tips(&self) -> Result<u64, RepoError> {
        let state = self.state.read().await;
        Ok(state.tips.values().filter(|tip| !tip.is_deleted()).count() as u64)
    }

    async fn count_by_category(&self) -> Result<Vec<CategoryTipCount>, RepoError> {
        let state = self.state.read().await;
        let mut counts: BTreeMap<Uuid, u64> = BTreeMap::new();
        for tip in state.tips.values().filter(|tip| !tip.is_deleted()) {
            *counts.entry(tip.category_id).or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(category_id, tip_count)| CategoryTipCount {
                category_id,
                tip_count,
            })
            .collect())
    }
}

#[async_trait]
impl TipsWriteRepo for InMemoryRepositories {
    async fn create_tip(&self, params: CreateTipParams) -> Result<TipRecord, RepoError> {
        let mut state = self.state.write().await;
        state.live_category(params.category_id)?;

        let content = params.content;
        let tip = TipRecord {
            id: Uuid::new_v4(),
            title: content.title,
            description: content.description,
            steps: content.steps,
            category_id: params.category_id,
            tags: content.tags,
            video_url: content.video_url,
            image_url: content.image_url,
            created_at: OffsetDateTime::now_utc(),
            updated_at: None,
            deleted_at: None,
        };
        state.tips.insert(tip.id, tip.clone());
        Ok(tip)
    }

    async fn update_tip(&self, params: UpdateTipParams) -> Result<TipUpdate, RepoError> {
        let mut state = self.state.write().await;
        if !state.tips.get(&params.id).is_some_and(|tip| !tip.is_deleted()) {
            return Err(RepoError::NotFound);
        }
        state.live_category(params.category_id)?;

        let tip = state
            .tips
            .get_mut(&params.id)
            .ok_or(RepoError::NotFound)?;
        let previous_category_id = tip.category_id;
        let content = params.content;
        tip.title = content.title;
        tip.description = content.description;
        tip.steps = content.steps;
        tip.category_id = params.category_id;
        tip.tags = content.tags;
        tip.video_url = content.video_url;
        tip.image_url = content.image_url;
        tip.updated_at = Some(OffsetDateTime::now_utc());
        Ok(TipUpdate {
            previous_category_id,
            tip: tip.clone(),
        })
    }

    async fn soft_delete_tip(&self, id: Uuid) -> Result<TipRecord, RepoError> {
        let mut state = self.state.write().await;
        let tip = state
            .tips
            .get_mut(&id)
            .filter(|tip| !tip.is_deleted())
            .ok_or(RepoError::NotFound)?;
        tip.deleted_at = Some(OffsetDateTime::now_utc());
        Ok(tip.clone())
    }
}

#[async_trait]
impl CategoriesRepo for InMemoryRepositories {
    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .categories
            .values()
            .filter(|category| !category.is_deleted())
            .cloned()
            .collect())
    }

    async fn find_category(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError> {
        Ok(self.state.read().await.categories.get(&id).cloned())
    }

    async fn find_category_by_name(
        &self,
        name: &str,
    ) -> Result<Option<CategoryRecord>, RepoError> {
        let wanted = name_key(name);
        let state = self.state.read().await;
        Ok(state
            .categories
            .values()
            .find(|category| !category.is_deleted() && name_key(&category.name) == wanted)
            .cloned())
    }

    async fn count_categories(&self) -> Result<u64, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .categories
            .values()
            .filter(|category| !category.is_deleted())
            .count() as u64)
    }
}

#[async_trait]
impl CategoriesWriteRepo for InMemoryRepositories {
    async fn create_category(
        &self,
        params: CreateCategoryParams,
    ) -> Result<CategoryRecord, RepoError> {
        let mut state = self.state.write().await;
        if state.live_name_taken(&params.name, None) {
            return Err(RepoError::Duplicate {
                constraint: CATEGORY_NAME_CONSTRAINT.to_string(),
            });
        }
        let category = CategoryRecord {
            id: Uuid::new_v4(),
            name: params.name,
            created_at: OffsetDateTime::now_utc(),
            updated_at: None,
            deleted_at: None,
        };
        state.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn rename_category(
        &self,
        params: RenameCategoryParams,
    ) -> Result<CategoryRecord, RepoError> {
        let mut state = self.state.write().await;
        if state.live_name_taken(&params.name, Some(params.id)) {
            return Err(RepoError::Duplicate {
                constraint: CATEGORY_NAME_CONSTRAINT.to_string(),
            });
        }
        let category = state
            .categories
            .get_mut(&params.id)
            .filter(|category| !category.is_deleted())
            .ok_or(RepoError::NotFound)?;
        category.name = params.name;
        category.updated_at = Some(OffsetDateTime::now_utc());
        Ok(category.clone())
    }

    async fn soft_delete_category(&self, id: Uuid) -> Result<CategoryDeletion, RepoError> {
        let mut state = self.state.write().await;
        let now = OffsetDateTime::now_utc();

        let category = state
            .categories
            .get_mut(&id)
            .filter(|category| !category.is_deleted())
            .ok_or(RepoError::NotFound)?;
        category.deleted_at = Some(now);
        let category = category.clone();

        let mut tips_deleted = 0;
        for tip in state
            .tips
            .values_mut()
            .filter(|tip| tip.category_id == id && !tip.is_deleted())
        {
            tip.deleted_at = Some(now);
            tips_deleted += 1;
        }

        Ok(CategoryDeletion {
            category,
            tips_deleted,
        })
    }
}

#[async_trait]
impl FavoritesRepo for InMemoryRepositories {
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<FavoriteRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .favorites
            .range((user_id, Uuid::nil())..=(user_id, Uuid::from_u128(u128::MAX)))
            .map(|(_, favorite)| *favorite)
            .collect())
    }

    async fn find_favorite(
        &self,
        user_id: Uuid,
        tip_id: Uuid,
    ) -> Result<Option<FavoriteRecord>, RepoError> {
        Ok(self
            .state
            .read()
            .await
            .favorites
            .get(&(user_id, tip_id))
            .copied())
    }

    async fn add_favorite(&self, favorite: FavoriteRecord) -> Result<FavoriteRecord, RepoError> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&favorite.user_id)
            || !state.tips.contains_key(&favorite.tip_id)
        {
            return Err(RepoError::Integrity {
                message: "favorite references an unknown user or tip".to_string(),
            });
        }
        let key = (favorite.user_id, favorite.tip_id);
        if state.favorites.contains_key(&key) {
            return Err(RepoError::Duplicate {
                constraint: FAVORITE_CONSTRAINT.to_string(),
            });
        }
        state.favorites.insert(key, favorite);
        Ok(favorite)
    }

    async fn remove_favorite(&self, user_id: Uuid, tip_id: Uuid) -> Result<bool, RepoError> {
        Ok(self
            .state
            .write()
            .await
            .favorites
            .remove(&(user_id, tip_id))
            .is_some())
    }
}

#[async_trait]
impl UsersRepo for InMemoryRepositories {
    async fn find_user(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn count_users(&self) -> Result<u64, RepoError> {
        Ok(self.state.read().await.users.len() as u64)
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, RepoError> {
        let mut state = self.state.write().await;
        if state.users.remove(&id).is_none() {
            return Ok(false);
        }
        state.favorites.retain(|(user_id, _), _| *user_id != id);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tips::TipContent;

    fn content(title: &str) -> TipContent {
        TipContent {
            title: title.to_string(),
            description: String::new(),
            steps: vec!["step".into()],
            tags: Vec::new(),
            video_url: None,
            image_url: None,
        }
    }

    async fn with_category(repos: &InMemoryRepositories, name: &str) -> CategoryRecord {
        repos
            .create_category(CreateCategoryParams { name: name.into() })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn category_delete_cascades_to_live_tips() {
        let repos = InMemoryRepositories::new();
        let category = with_category(&repos, "Garden").await;
        for title in ["a", "b"] {
            repos
                .create_tip(CreateTipParams {
                    category_id: category.id,
                    content: content(title),
                })
                .await
                .unwrap();
        }

        let deletion = repos.soft_delete_category(category.id).await.unwrap();
        assert_eq!(deletion.tips_deleted, 2);
        assert_eq!(repos.count_tips().await.unwrap(), 0);
        assert!(repos.tips_by_category(category.id).await.unwrap().is_empty());
        assert!(matches!(
            repos.soft_delete_category(category.id).await,
            Err(RepoError::NotFound)
        ));
    }

    #[tokio::test]
    async fn live_category_names_are_unique_ignoring_case() {
        let repos = InMemoryRepositories::new();
        let garden = with_category(&repos, "Garden").await;
        let err = repos
            .create_category(CreateCategoryParams {
                name: "GARDEN".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Duplicate { .. }));

        repos.soft_delete_category(garden.id).await.unwrap();
        assert!(
            repos
                .create_category(CreateCategoryParams {
                    name: "garden".into(),
                })
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn deleting_user_removes_their_favorites() {
        let repos = InMemoryRepositories::new();
        let category = with_category(&repos, "Kitchen").await;
        let tip = repos
            .create_tip(CreateTipParams {
                category_id: category.id,
                content: content("kettle"),
            })
            .await
            .unwrap();
        let user = UserRecord {
            id: Uuid::new_v4(),
            display_name: "sam".into(),
            created_at: OffsetDateTime::now_utc(),
        };
        repos.insert_user(user.clone()).await;
        repos
            .add_favorite(FavoriteRecord {
                user_id: user.id,
                tip_id: tip.id,
                added_at: OffsetDateTime::now_utc(),
            })
            .await
            .unwrap();

        assert!(repos.delete_user(user.id).await.unwrap());
        assert!(repos.list_for_user(user.id).await.unwrap().is_empty());
        assert!(!repos.delete_user(user.id).await.unwrap());
    }

    #[tokio::test]
    async fn favorites_are_unique_per_pair() {
        let repos = InMemoryRepositories::new();
        let category = with_category(&repos, "Kitchen").await;
        let tip = repos
            .create_tip(CreateTipParams {
                category_id: category.id,
                content: content("kettle"),
            })
            .await
            .unwrap();
        let user_id = Uuid::new_v4();
        repos
            .insert_user(UserRecord {
                id: user_id,
                display_name: "kim".into(),
                created_at: OffsetDateTime::now_utc(),
            })
            .await;
        let favorite = FavoriteRecord {
            user_id,
            tip_id: tip.id,
            added_at: OffsetDateTime::now_utc(),
        };

        repos.add_favorite(favorite).await.unwrap();
        assert!(matches!(
            repos.add_favorite(favorite).await,
            Err(RepoError::Duplicate { .. })
        ));
    }
}
