use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use crate::models::UserProfile;
use crate::ranking::RankingStore;
use crate::state::AppState;

pub const PROFILE_PUBLICATION_LIMIT: i64 = 100;

type ApiError = (StatusCode, Json<serde_json::Value>);

pub fn users_routes() -> Router<AppState> {
    Router::new().route("/{user_id}", get(get_public_profile))
}

fn internal_error<E: ToString>(error: E) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({"detail": error.to_string()})),
    )
}

async fn get_public_profile(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .store
        .find_user(user_id)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({"detail": "User not found"})),
            )
        })?;

    let rating = state.store.user_rating(user.id).await.map_err(internal_error)?;
    let publications = state
        .store
        .list_user_publications(user.id, PROFILE_PUBLICATION_LIMIT, 0)
        .await
        .map_err(internal_error)?;

    Ok(Json(UserProfile::new(user, rating, publications)))
}
