use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::models::{
    Publication, RankingHistoryEntry, RankingSummary, ScoredPublication, UserRating,
};
use crate::ranking::scorer::score_publication;
use crate::ranking::store::{RankingStore, StoreError};

pub const DEFAULT_PUBLICATION_LIMIT: i64 = 1000;
pub const MAX_PUBLICATION_LIMIT: i64 = 10_000;

#[derive(Debug, Error)]
pub enum RankingError {
    #[error("a ranking recalculation is already running")]
    AlreadyRunning,
    #[error("failed to load ranking input: {source}")]
    Load {
        #[source]
        source: StoreError,
    },
    #[error(
        "ranking recalculation aborted at user {user_id} after {written} of {total} users: {source}"
    )]
    Aborted {
        user_id: i64,
        written: usize,
        total: usize,
        #[source]
        source: StoreError,
    },
    #[error("ranking recalculation task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Aggregated result for one user before ranks are assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserScore {
    pub user_id: i64,
    pub score: i64,
    pub publication_count: i32,
    pub scores: Vec<ScoredPublication>,
}

impl UserScore {
    pub fn from_publications(user_id: i64, publications: &[Publication], current_year: i32) -> Self {
        let scores: Vec<ScoredPublication> = publications
            .iter()
            .map(|publication| ScoredPublication {
                publication_id: publication.id,
                breakdown: score_publication(publication, current_year),
            })
            .collect();

        Self {
            user_id,
            score: scores.iter().map(|s| s.breakdown.total_score).sum(),
            publication_count: i32::try_from(scores.len()).unwrap_or(i32::MAX),
            scores,
        }
    }
}

/// Orders users by score descending, then user id ascending. No two distinct
/// users compare equal, so position + 1 is a unique rank.
pub fn sort_for_ranking(users: &mut [UserScore]) {
    users.sort_by(|a, b| b.score.cmp(&a.score).then(a.user_id.cmp(&b.user_id)));
}

pub struct RankingEngine {
    store: Arc<dyn RankingStore>,
    publication_limit: i64,
    running: Mutex<()>,
}

impl RankingEngine {
    pub fn new(store: Arc<dyn RankingStore>, publication_limit: i64) -> Self {
        Self {
            store,
            publication_limit,
            running: Mutex::new(()),
        }
    }

    pub async fn recalculate_all(&self) -> Result<RankingSummary, RankingError> {
        self.recalculate_at(Utc::now()).await
    }

    /// Rescores and reranks every user as of `now`.
    ///
    /// Each user's rows are committed in their own transaction. A failure
    /// stops the cycle and leaves already-committed users on their new
    /// values; the error reports how far the cycle got.
    pub async fn recalculate_at(&self, now: DateTime<Utc>) -> Result<RankingSummary, RankingError> {
        let _guard = self
            .running
            .try_lock()
            .map_err(|_| RankingError::AlreadyRunning)?;

        tracing::info!("Starting ranking recalculation");

        let current_year = now.year();
        let user_ids = self
            .store
            .list_all_user_ids()
            .await
            .map_err(|source| RankingError::Load { source })?;

        if user_ids.is_empty() {
            tracing::info!("No users found, nothing to rank");
            return Ok(RankingSummary {
                users_ranked: 0,
                publications_scored: 0,
                started_at: now,
                finished_at: Utc::now(),
            });
        }

        let mut user_scores = Vec::with_capacity(user_ids.len());
        for user_id in user_ids {
            let publications = self
                .store
                .list_user_publications(user_id, self.publication_limit, 0)
                .await
                .map_err(|source| RankingError::Load { source })?;
            user_scores.push(UserScore::from_publications(
                user_id,
                &publications,
                current_year,
            ));
        }

        sort_for_ranking(&mut user_scores);

        let total = user_scores.len();
        let mut publications_scored = 0;
        for (position, user) in user_scores.iter().enumerate() {
            let rank = i32::try_from(position + 1).unwrap_or(i32::MAX);
            if let Err(source) = self.commit_user(user, rank, now).await {
                tracing::error!(
                    user_id = user.user_id,
                    written = position,
                    total,
                    "Ranking recalculation aborted: {}",
                    source
                );
                return Err(RankingError::Aborted {
                    user_id: user.user_id,
                    written: position,
                    total,
                    source,
                });
            }
            publications_scored += user.scores.len();
        }

        tracing::info!(
            users = total,
            publications = publications_scored,
            "Successfully recalculated rankings"
        );

        Ok(RankingSummary {
            users_ranked: total,
            publications_scored,
            started_at: now,
            finished_at: Utc::now(),
        })
    }

    async fn commit_user(
        &self,
        user: &UserScore,
        rank: i32,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tx = self.store.begin().await?;

        tx.replace_publication_scores(user.user_id, &user.scores, now)
            .await?;
        tx.upsert_user_rating(&UserRating {
            user_id: user.user_id,
            score: user.score,
            rank: Some(rank),
            publication_count: user.publication_count,
            computed_at: now,
        })
        .await?;
        tx.append_ranking_history(&RankingHistoryEntry {
            user_id: user.user_id,
            score: user.score,
            rank: Some(rank),
            publication_count: user.publication_count,
            recorded_at: now,
        })
        .await?;

        tx.commit().await
    }
}
