use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::{Publication, UserRating};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub field: Option<String>,
    pub institution: Option<String>,
    pub bio: Option<String>,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Public view of a researcher: no email or admin flag.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub display_name: Option<String>,
    pub field: Option<String>,
    pub institution: Option<String>,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
    pub rating: Option<UserRating>,
    pub publications: Vec<Publication>,
}

impl UserProfile {
    pub fn new(user: User, rating: Option<UserRating>, publications: Vec<Publication>) -> Self {
        Self {
            id: user.id,
            username: user.username,
            display_name: user.display_name,
            field: user.field,
            institution: user.institution,
            bio: user.bio,
            created_at: user.created_at,
            rating,
            publications,
        }
    }
}
