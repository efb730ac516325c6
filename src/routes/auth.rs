use axum::{
    extract::Json,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::models::User;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

type ApiError = (StatusCode, Json<serde_json::Value>);

fn unauthorized(detail: &str) -> ApiError {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({"detail": detail})),
    )
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

pub fn decode_claims(token: &str, secret: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .ok()
    .map(|data| data.claims)
}

pub async fn extract_current_user(state: &AppState, headers: &HeaderMap) -> Result<User, ApiError> {
    let secret = state.secret_key.as_deref().ok_or_else(|| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"detail": "Authentication is not configured"})),
        )
    })?;

    let token = bearer_token(headers).ok_or_else(|| unauthorized("Missing authorization header"))?;
    let claims = decode_claims(token, secret).ok_or_else(|| unauthorized("Invalid token"))?;

    sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, email, display_name, field, institution, bio, is_admin, created_at, updated_at
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(&claims.sub)
    .fetch_optional(&state.pool)
    .await
    .map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"detail": e.to_string()})),
        )
    })?
    .ok_or_else(|| unauthorized("User not found"))
}

pub async fn extract_admin_user(state: &AppState, headers: &HeaderMap) -> Result<User, ApiError> {
    let user = extract_current_user(state, headers).await?;
    if !user.is_admin {
        return Err((
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({"detail": "Admin access required"})),
        ));
    }
    Ok(user)
}
