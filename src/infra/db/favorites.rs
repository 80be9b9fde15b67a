use async_trait::async_trait;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{FavoritesRepo, RepoError};
use crate::domain::entities::FavoriteRecord;

use super::PostgresRepositories;
use super::util::map_sqlx_error;

#[derive(FromRow)]
struct FavoriteRow {
    user_id: Uuid,
    tip_id: Uuid,
    added_at: OffsetDateTime,
}

impl From<FavoriteRow> for FavoriteRecord {
    fn from(row: FavoriteRow) -> Self {
        Self {
            user_id: row.user_id,
            tip_id: row.tip_id,
            added_at: row.added_at,
        }
    }
}

#[async_trait]
impl FavoritesRepo for PostgresRepositories {
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<FavoriteRecord>, RepoError> {
        let rows = sqlx::query_as::<_, FavoriteRow>(
            "SELECT user_id, tip_id, added_at FROM favorites WHERE user_id = $1 ORDER BY tip_id",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(FavoriteRecord::from).collect())
    }

    async fn find_favorite(
        &self,
        user_id: Uuid,
        tip_id: Uuid,
    ) -> Result<Option<FavoriteRecord>, RepoError> {
        let row = sqlx::query_as::<_, FavoriteRow>(
            "SELECT user_id, tip_id, added_at FROM favorites WHERE user_id = $1 AND tip_id = $2",
        )
        .bind(user_id)
        .bind(tip_id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(FavoriteRecord::from))
    }

    async fn add_favorite(&self, favorite: FavoriteRecord) -> Result<FavoriteRecord, RepoError> {
        let row = sqlx::query_as::<_, FavoriteRow>(
            r#"
            INSERT INTO favorites (user_id, tip_id, added_at)
            VALUES ($1, $2, $3)
            RETURNING user_id, tip_id, added_at
            "#,
        )
        .bind(favorite.user_id)
        .bind(favorite.tip_id)
        .bind(favorite.added_at)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn remove_favorite(&self, user_id: Uuid, tip_id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND tip_id = $2")
            .bind(user_id)
            .bind(tip_id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}
