use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const BASE_SCORE: i64 = 10;

/// Per-publication score components. `total_score` is always the sum of the
/// other three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationScoreBreakdown {
    pub base_score: i64,
    pub recency_bonus: i64,
    pub impact_bonus: i64,
    pub total_score: i64,
}

impl PublicationScoreBreakdown {
    pub fn new(base_score: i64, recency_bonus: i64, impact_bonus: i64) -> Self {
        Self {
            base_score,
            recency_bonus,
            impact_bonus,
            total_score: base_score + recency_bonus + impact_bonus,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredPublication {
    pub publication_id: i64,
    pub breakdown: PublicationScoreBreakdown,
}

/// Current rating for one user; one row per user, overwritten every cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UserRating {
    pub user_id: i64,
    pub score: i64,
    pub rank: Option<i32>,
    pub publication_count: i32,
    pub computed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct RankingHistoryEntry {
    pub user_id: i64,
    pub score: i64,
    pub rank: Option<i32>,
    pub publication_count: i32,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TopRankedUser {
    pub user_id: i64,
    pub username: String,
    pub display_name: Option<String>,
    pub field: Option<String>,
    pub institution: Option<String>,
    pub score: i64,
    pub rank: Option<i32>,
    pub publication_count: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PublicationScoreDetail {
    pub publication_id: i64,
    pub doi: String,
    pub title: String,
    pub journal: Option<String>,
    pub year: Option<i32>,
    pub base_score: i64,
    pub recency_bonus: i64,
    pub impact_bonus: i64,
    pub total_score: i64,
    pub computed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopRankedListResponse {
    pub users: Vec<TopRankedUser>,
    pub limit: i32,
    pub offset: i32,
}

/// Outcome of a cycle that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingSummary {
    pub users_ranked: usize,
    pub publications_scored: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}
