use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{Duration, Utc};
use serde::Deserialize;

use crate::models::TopRankedListResponse;
use crate::ranking::RankingError;
use crate::routes::auth::extract_admin_user;
use crate::state::AppState;

pub const DEFAULT_TOP_LIMIT: i32 = 50;
pub const MAX_TOP_LIMIT: i32 = 100;
pub const DEFAULT_HISTORY_DAYS: i64 = 90;
pub const MAX_HISTORY_DAYS: i64 = 3650;

type ApiError = (StatusCode, Json<serde_json::Value>);

#[derive(Debug, Deserialize)]
struct TopRankedQuery {
    limit: Option<i32>,
    offset: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    days: Option<i64>,
}

pub fn ranking_routes() -> Router<AppState> {
    Router::new()
        .route("/top", get(get_top_users))
        .route("/users/{user_id}", get(get_user_rating))
        .route("/users/{user_id}/history", get(get_user_history))
        .route("/users/{user_id}/scores", get(get_user_scores))
}

pub fn admin_ranking_routes() -> Router<AppState> {
    Router::new().route("/ranking/recalculate", post(recalculate))
}

fn page_bounds(limit: Option<i32>, offset: Option<i32>) -> (i32, i32) {
    (
        limit.unwrap_or(DEFAULT_TOP_LIMIT).clamp(1, MAX_TOP_LIMIT),
        offset.unwrap_or(0).max(0),
    )
}

fn history_days(days: Option<i64>) -> i64 {
    days.unwrap_or(DEFAULT_HISTORY_DAYS).clamp(1, MAX_HISTORY_DAYS)
}

fn internal_error<E: ToString>(error: E) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({"detail": error.to_string()})),
    )
}

async fn get_top_users(
    State(state): State<AppState>,
    Query(query): Query<TopRankedQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (limit, offset) = page_bounds(query.limit, query.offset);
    let users = state
        .store
        .top_ranked_users(i64::from(limit), i64::from(offset))
        .await
        .map_err(internal_error)?;

    Ok(Json(TopRankedListResponse {
        users,
        limit,
        offset,
    }))
}

async fn get_user_rating(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let rating = state
        .store
        .user_rating(user_id)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({"detail": "Rating not found"})),
            )
        })?;

    Ok(Json(rating))
}

async fn get_user_history(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let since = Utc::now() - Duration::days(history_days(query.days));
    let history = state
        .store
        .user_ranking_history(user_id, since)
        .await
        .map_err(internal_error)?;

    Ok(Json(history))
}

async fn get_user_scores(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let scores = state
        .store
        .user_publication_scores(user_id)
        .await
        .map_err(internal_error)?;

    Ok(Json(scores))
}

async fn recalculate(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let admin = extract_admin_user(&state, &headers).await?;
    tracing::info!(admin = %admin.username, "Admin requested ranking recalculation");

    match state.scheduler.trigger_now().await {
        Ok(summary) => Ok(Json(serde_json::json!({
            "success": true,
            "message": "Ranking recalculation completed",
            "users": summary.users_ranked,
            "publications": summary.publications_scored,
        }))),
        Err(RankingError::AlreadyRunning) => Err((
            StatusCode::CONFLICT,
            Json(serde_json::json!({"detail": "Ranking recalculation already in progress"})),
        )),
        Err(_) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"detail": "Failed to trigger ranking recalculation"})),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_bounds_are_clamped() {
        assert_eq!(page_bounds(None, None), (50, 0));
        assert_eq!(page_bounds(Some(0), Some(-5)), (1, 0));
        assert_eq!(page_bounds(Some(500), Some(20)), (100, 20));
    }

    #[test]
    fn history_window_is_clamped() {
        assert_eq!(history_days(None), 90);
        assert_eq!(history_days(Some(0)), 1);
        assert_eq!(history_days(Some(100_000)), 3650);
    }
}
