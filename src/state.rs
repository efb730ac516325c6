use std::sync::Arc;

use sqlx::MySqlPool;

use crate::jobs::RankingScheduler;
use crate::ranking::MySqlRankingStore;

#[derive(Clone)]
pub struct AppState {
    pub pool: MySqlPool,
    pub store: MySqlRankingStore,
    pub scheduler: Arc<RankingScheduler>,
    pub secret_key: Option<Arc<str>>,
}
