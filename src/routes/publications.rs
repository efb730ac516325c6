use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;

use crate::doi::{is_valid_doi, normalize_doi};
use crate::models::CreatePublication;
use crate::ranking::{RankingStore, StoreError};
use crate::routes::auth::extract_current_user;
use crate::state::AppState;

type ApiError = (StatusCode, Json<serde_json::Value>);

#[derive(Debug, Deserialize)]
struct PublicationListQuery {
    limit: Option<i64>,
    offset: Option<i64>,
}

pub fn publications_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(add_publication))
        .route("/mine", get(list_my_publications))
        .route("/users/{user_id}", get(list_user_publications))
}

// Metadata arrives already resolved; registry lookup happens upstream.
async fn add_publication(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CreatePublication>,
) -> Result<impl IntoResponse, ApiError> {
    let user = extract_current_user(&state, &headers).await?;

    if !is_valid_doi(&input.doi) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"detail": "Invalid DOI format"})),
        ));
    }
    if input.title.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"detail": "Title is required"})),
        ));
    }

    let publication_id = state
        .store
        .insert_publication(user.id, &input)
        .await
        .map_err(|e| match e {
            StoreError::DuplicatePublication { .. } => (
                StatusCode::CONFLICT,
                Json(serde_json::json!({"detail": "This publication has already been added"})),
            ),
            other => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"detail": other.to_string()})),
            ),
        })?;

    tracing::info!(user_id = user.id, publication_id, "Publication added");

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "success": true,
            "id": publication_id,
            "doi": normalize_doi(&input.doi),
        })),
    ))
}

fn list_bounds(query: &PublicationListQuery) -> (i64, i64) {
    (
        query.limit.unwrap_or(50).clamp(1, 100),
        query.offset.unwrap_or(0).max(0),
    )
}

async fn list_my_publications(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<PublicationListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let user = extract_current_user(&state, &headers).await?;
    let (limit, offset) = list_bounds(&query);

    let publications = state
        .store
        .list_user_publications(user.id, limit, offset)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"detail": e.to_string()})),
            )
        })?;

    Ok(Json(publications))
}

async fn list_user_publications(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Query(query): Query<PublicationListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (limit, offset) = list_bounds(&query);

    let publications = state
        .store
        .list_user_publications(user_id, limit, offset)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"detail": e.to_string()})),
            )
        })?;

    Ok(Json(publications))
}
