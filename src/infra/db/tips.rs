use async_trait::async_trait;
use sqlx::{FromRow, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    CandidateHints, CategoryTipCount, CreateTipParams, RepoError, TipUpdate, TipsRepo,
    TipsWriteRepo, UpdateTipParams,
};
use crate::domain::entities::TipRecord;

use super::PostgresRepositories;
use super::util::{convert_count, map_sqlx_error};

const TIP_COLUMNS: &str = "t.id, t.title, t.description, t.steps, t.category_id, t.tags, \
    t.video_url, t.image_url, t.created_at, t.updated_at, t.deleted_at";

#[derive(FromRow)]
struct TipRow {
    id: Uuid,
    title: String,
    description: String,
    steps: Vec<String>,
    category_id: Uuid,
    tags: Vec<String>,
    video_url: Option<String>,
    image_url: Option<String>,
    created_at: OffsetDateTime,
    updated_at: Option<OffsetDateTime>,
    deleted_at: Option<OffsetDateTime>,
}

impl From<TipRow> for TipRecord {
    fn from(row: TipRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            steps: row.steps,
            category_id: row.category_id,
            tags: row.tags,
            video_url: row.video_url,
            image_url: row.image_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        }
    }
}

#[derive(FromRow)]
struct CategoryCountRow {
    category_id: Uuid,
    tip_count: i64,
}

/// Live tips narrowed by the hints. Returns `None` when the hints admit nothing.
fn candidate_query(hints: &CandidateHints) -> Option<QueryBuilder<'_, Postgres>> {
    if hints.tip_ids.as_ref().is_some_and(Vec::is_empty) {
        return None;
    }

    let mut qb = QueryBuilder::new("SELECT ");
    qb.push(TIP_COLUMNS);
    qb.push(" FROM tips t WHERE t.deleted_at IS NULL");

    if let Some(category_id) = hints.category_id {
        qb.push(" AND t.category_id = ");
        qb.push_bind(category_id);
    }
    if let Some(ids) = hints.tip_ids.as_ref() {
        qb.push(" AND t.id = ANY(");
        qb.push_bind(ids.clone());
        qb.push(")");
    }
    Some(qb)
}

async fn ensure_live_category<'e, E>(executor: E, category_id: Uuid) -> Result<(), RepoError>
where
    E: sqlx::PgExecutor<'e>,
{
    let found: Option<Uuid> = sqlx::query_scalar(
        "SELECT id FROM categories WHERE id = $1 AND deleted_at IS NULL FOR SHARE",
    )
    .bind(category_id)
    .fetch_optional(executor)
    .await
    .map_err(map_sqlx_error)?;

    match found {
        Some(_) => Ok(()),
        None => Err(RepoError::MissingReference { entity: "category" }),
    }
}

#[async_trait]
impl TipsRepo for PostgresRepositories {
    async fn fetch_candidates(&self, hints: &CandidateHints) -> Result<Vec<TipRecord>, RepoError> {
        let Some(mut qb) = candidate_query(hints) else {
            return Ok(Vec::new());
        };

        let rows = qb
            .build_query_as::<TipRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(TipRecord::from).collect())
    }

    async fn find_tip(&self, id: Uuid) -> Result<Option<TipRecord>, RepoError> {
        let sql = format!("SELECT {TIP_COLUMNS} FROM tips t WHERE t.id = $1");
        let row = sqlx::query_as::<_, TipRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(TipRecord::from))
    }

    async fn tips_by_category(&self, category_id: Uuid) -> Result<Vec<TipRecord>, RepoError> {
        self.fetch_candidates(&CandidateHints::in_category(category_id))
            .await
    }

    async fn count_tips(&self) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tips WHERE deleted_at IS NULL")
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        convert_count(count)
    }

    async fn count_by_category(&self) -> Result<Vec<CategoryTipCount>, RepoError> {
        let rows = sqlx::query_as::<_, CategoryCountRow>(
            r#"
            SELECT category_id, COUNT(*) AS tip_count
            FROM tips
            WHERE deleted_at IS NULL
            GROUP BY category_id
            ORDER BY category_id
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|row| {
                Ok(CategoryTipCount {
                    category_id: row.category_id,
                    tip_count: convert_count(row.tip_count)?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl TipsWriteRepo for PostgresRepositories {
    async fn create_tip(&self, params: CreateTipParams) -> Result<TipRecord, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;
        ensure_live_category(&mut *tx, params.category_id).await?;

        let content = params.content;
        let row = sqlx::query_as::<_, TipRow>(
            r#"
            INSERT INTO tips (
                id, title, description, steps, category_id, tags, video_url, image_url, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now())
            RETURNING id, title, description, steps, category_id, tags, video_url, image_url,
                created_at, updated_at, deleted_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(content.title)
        .bind(content.description)
        .bind(content.steps)
        .bind(params.category_id)
        .bind(content.tags)
        .bind(content.video_url)
        .bind(content.image_url)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn update_tip(&self, params: UpdateTipParams) -> Result<TipUpdate, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;
        let previous_category_id: Uuid = sqlx::query_scalar(
            "SELECT category_id FROM tips WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
        )
        .bind(params.id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?
        .ok_or(RepoError::NotFound)?;
        ensure_live_category(&mut *tx, params.category_id).await?;

        let content = params.content;
        let row = sqlx::query_as::<_, TipRow>(
            r#"
            UPDATE tips
            SET title = $2,
                description = $3,
                steps = $4,
                category_id = $5,
                tags = $6,
                video_url = $7,
                image_url = $8,
                updated_at = now()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING id, title, description, steps, category_id, tags, video_url, image_url,
                created_at, updated_at, deleted_at
            "#,
        )
        .bind(params.id)
        .bind(content.title)
        .bind(content.description)
        .bind(content.steps)
        .bind(params.category_id)
        .bind(content.tags)
        .bind(content.video_url)
        .bind(content.image_url)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?
        .ok_or(RepoError::NotFound)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(TipUpdate {
            previous_category_id,
            tip: row.into(),
        })
    }

    async fn soft_delete_tip(&self, id: Uuid) -> Result<TipRecord, RepoError> {
        let row = sqlx::query_as::<_, TipRow>(
            r#"
            UPDATE tips
            SET deleted_at = now()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING id, title, description, steps, category_id, tags, video_url, image_url,
                created_at, updated_at, deleted_at
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?
        .ok_or(RepoError::NotFound)?;

        Ok(row.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_query_without_hints_selects_live_tips() {
        let hints = CandidateHints::default();
        let qb = candidate_query(&hints).expect("query");
        let sql = qb.sql();
        assert!(sql.contains("FROM tips t WHERE t.deleted_at IS NULL"));
        assert!(!sql.contains("category_id ="));
        assert!(!sql.contains("ANY("));
    }

    #[test]
    fn candidate_query_pushes_category_and_ids() {
        let hints = CandidateHints {
            category_id: Some(Uuid::new_v4()),
            tip_ids: Some(vec![Uuid::new_v4(), Uuid::new_v4()]),
        };
        let qb = candidate_query(&hints).expect("query");
        let sql = qb.sql();
        assert!(sql.contains("AND t.category_id = $1"));
        assert!(sql.contains("AND t.id = ANY($2)"));
    }

    #[test]
    fn empty_id_set_skips_the_query() {
        let hints = CandidateHints {
            category_id: None,
            tip_ids: Some(Vec::new()),
        };
        assert!(candidate_query(&hints).is_none());
    }
}
