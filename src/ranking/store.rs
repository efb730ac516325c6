use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySql, MySqlPool, QueryBuilder, Transaction};
use thiserror::Error;

use crate::doi::normalize_doi;
use crate::models::{
    CreatePublication, Publication, PublicationRow, PublicationScoreDetail, RankingHistoryEntry,
    ScoredPublication, TopRankedUser, User, UserRating,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("publication {doi} already added for user {user_id}")]
    DuplicatePublication { user_id: i64, doi: String },
}

/// Storage operations the ranking engine depends on.
#[async_trait]
pub trait RankingStore: Send + Sync {
    /// Every registered user, ascending by id.
    async fn list_all_user_ids(&self) -> Result<Vec<i64>, StoreError>;

    /// A user's publications, newest year first.
    async fn list_user_publications(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Publication>, StoreError>;

    async fn begin(&self) -> Result<Box<dyn RankingTransaction>, StoreError>;
}

/// One user's write set. Nothing is visible until `commit`; dropping the
/// transaction discards every staged write.
#[async_trait]
pub trait RankingTransaction: Send {
    /// Deletes the user's existing breakdowns and inserts `scores`.
    async fn replace_publication_scores(
        &mut self,
        user_id: i64,
        scores: &[ScoredPublication],
        computed_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn upsert_user_rating(&mut self, rating: &UserRating) -> Result<(), StoreError>;

    async fn append_ranking_history(&mut self, entry: &RankingHistoryEntry)
    -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

const PUBLICATION_SELECT: &str = r#"
    SELECT
        id,
        user_id,
        doi,
        title,
        CAST(authors AS CHAR) AS authors_json,
        journal,
        year,
        publication_type,
        abstract_text,
        created_at
    FROM publications
"#;

// Seven placeholders per row; MySQL caps a statement at 65,535.
const SCORE_ROWS_PER_INSERT: usize = 1000;

/// Splits breakdown rows into multi-row INSERT batches that stay under the
/// placeholder limit. Empty input yields no batches.
fn score_insert_batches(
    scores: &[ScoredPublication],
) -> impl Iterator<Item = &[ScoredPublication]> {
    scores.chunks(SCORE_ROWS_PER_INSERT)
}

#[derive(Clone)]
pub struct MySqlRankingStore {
    pool: MySqlPool,
}

impl MySqlRankingStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Stores a publication under its normalised DOI.
    pub async fn insert_publication(
        &self,
        user_id: i64,
        input: &CreatePublication,
    ) -> Result<i64, StoreError> {
        let doi = normalize_doi(&input.doi);
        let authors_json = serde_json::to_string(&input.authors)
            .map_err(|e| StoreError::Unavailable(format!("author encoding failed: {e}")))?;

        let result = sqlx::query(
            r#"
            INSERT INTO publications
                (user_id, doi, title, authors, journal, year, publication_type, abstract_text, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(&doi)
        .bind(&input.title)
        .bind(authors_json)
        .bind(input.journal.as_deref())
        .bind(input.year)
        .bind(input.publication_type.as_code())
        .bind(input.abstract_text.as_deref())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db_error) if db_error.is_unique_violation() => StoreError::DuplicatePublication {
                user_id,
                doi: doi.clone(),
            },
            _ => StoreError::Database(e),
        })?;

        Ok(result.last_insert_id() as i64)
    }

    pub async fn find_user(&self, user_id: i64) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, display_name, field, institution, bio, is_admin, created_at, updated_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn top_ranked_users(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TopRankedUser>, StoreError> {
        let rows = sqlx::query_as::<_, TopRankedUser>(
            r#"
            SELECT
                u.id AS user_id,
                u.username,
                u.display_name,
                u.field,
                u.institution,
                CAST(r.score AS SIGNED) AS score,
                r.`rank` AS `rank`,
                r.publication_count
            FROM user_ratings r
            JOIN users u ON u.id = r.user_id
            WHERE r.`rank` IS NOT NULL
            ORDER BY r.`rank` ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn user_rating(&self, user_id: i64) -> Result<Option<UserRating>, StoreError> {
        let rating = sqlx::query_as::<_, UserRating>(
            r#"
            SELECT
                user_id,
                CAST(score AS SIGNED) AS score,
                `rank`,
                publication_count,
                computed_at
            FROM user_ratings
            WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(rating)
    }

    pub async fn user_ranking_history(
        &self,
        user_id: i64,
        since: DateTime<Utc>,
    ) -> Result<Vec<RankingHistoryEntry>, StoreError> {
        let rows = sqlx::query_as::<_, RankingHistoryEntry>(
            r#"
            SELECT
                user_id,
                CAST(score AS SIGNED) AS score,
                `rank`,
                publication_count,
                recorded_at
            FROM ranking_history
            WHERE user_id = ? AND recorded_at >= ?
            ORDER BY recorded_at ASC, id ASC
            "#,
        )
        .bind(user_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn user_publication_scores(
        &self,
        user_id: i64,
    ) -> Result<Vec<PublicationScoreDetail>, StoreError> {
        let rows = sqlx::query_as::<_, PublicationScoreDetail>(
            r#"
            SELECT
                p.id AS publication_id,
                p.doi,
                p.title,
                p.journal,
                p.year,
                CAST(s.base_score AS SIGNED) AS base_score,
                CAST(s.recency_bonus AS SIGNED) AS recency_bonus,
                CAST(s.impact_bonus AS SIGNED) AS impact_bonus,
                CAST(s.total_score AS SIGNED) AS total_score,
                s.computed_at
            FROM publication_scores s
            JOIN publications p ON p.id = s.publication_id
            WHERE s.user_id = ?
            ORDER BY s.total_score DESC, p.id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[async_trait]
impl RankingStore for MySqlRankingStore {
    async fn list_all_user_ids(&self) -> Result<Vec<i64>, StoreError> {
        let rows: Vec<(i64,)> = sqlx::query_as("SELECT id FROM users ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn list_user_publications(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Publication>, StoreError> {
        let sql = format!(
            "{} WHERE user_id = ? ORDER BY year DESC, created_at DESC, id DESC LIMIT ? OFFSET ?",
            PUBLICATION_SELECT
        );
        let rows = sqlx::query_as::<_, PublicationRow>(&sql)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Publication::from).collect())
    }

    async fn begin(&self) -> Result<Box<dyn RankingTransaction>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(MySqlRankingTransaction { tx }))
    }
}

pub struct MySqlRankingTransaction {
    tx: Transaction<'static, MySql>,
}

#[async_trait]
impl RankingTransaction for MySqlRankingTransaction {
    async fn replace_publication_scores(
        &mut self,
        user_id: i64,
        scores: &[ScoredPublication],
        computed_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM publication_scores WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *self.tx)
            .await?;

        for batch in score_insert_batches(scores) {
            let mut query_builder = QueryBuilder::<MySql>::new(
                r#"
                INSERT INTO publication_scores
                    (publication_id, user_id, base_score, recency_bonus, impact_bonus, total_score, computed_at)
                "#,
            );
            query_builder.push_values(batch, |mut row, scored| {
                row.push_bind(scored.publication_id)
                    .push_bind(user_id)
                    .push_bind(scored.breakdown.base_score)
                    .push_bind(scored.breakdown.recency_bonus)
                    .push_bind(scored.breakdown.impact_bonus)
                    .push_bind(scored.breakdown.total_score)
                    .push_bind(computed_at);
            });
            query_builder.build().execute(&mut *self.tx).await?;
        }

        Ok(())
    }

    async fn upsert_user_rating(&mut self, rating: &UserRating) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO user_ratings (user_id, score, `rank`, publication_count, computed_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                score = VALUES(score),
                `rank` = VALUES(`rank`),
                publication_count = VALUES(publication_count),
                computed_at = VALUES(computed_at),
                updated_at = VALUES(updated_at)
            "#,
        )
        .bind(rating.user_id)
        .bind(rating.score)
        .bind(rating.rank)
        .bind(rating.publication_count)
        .bind(rating.computed_at)
        .bind(rating.computed_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn append_ranking_history(
        &mut self,
        entry: &RankingHistoryEntry,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO ranking_history (user_id, score, `rank`, publication_count, recorded_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.user_id)
        .bind(entry.score)
        .bind(entry.rank)
        .bind(entry.publication_count)
        .bind(entry.recorded_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}
