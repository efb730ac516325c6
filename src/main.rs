mod config;
mod db;
mod doi;
mod jobs;
mod models;
mod ranking;
mod routes;
mod state;

use std::sync::Arc;

use axum::{Router, response::IntoResponse, routing::get};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::AppConfig;
use jobs::RankingScheduler;
use ranking::{MySqlRankingStore, RankingEngine};
use routes::{admin_ranking_routes, publications_routes, ranking_routes, users_routes};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "neurosci_rank=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env();

    let pool = db::init_db(
        &config.database_url,
        config.max_connections,
        config.admin_username.as_deref(),
    )
    .await?;
    tracing::info!("Database initialized");

    if config.secret_key.is_none() {
        tracing::warn!("SECRET_KEY is not set, authenticated routes will reject every request");
    }

    let store = MySqlRankingStore::new(pool.clone());
    let engine = Arc::new(RankingEngine::new(
        Arc::new(store.clone()),
        config.publication_limit,
    ));
    let scheduler = Arc::new(RankingScheduler::new(engine));
    scheduler.start();

    if config.run_on_startup {
        let startup_scheduler = Arc::clone(&scheduler);
        tokio::spawn(async move {
            if let Err(error) = startup_scheduler.trigger_now().await {
                tracing::error!("Startup ranking recalculation failed: {}", error);
            }
        });
    }

    let state = AppState {
        pool,
        store,
        scheduler: Arc::clone(&scheduler),
        secret_key: config.secret_key.as_deref().map(Arc::from),
    };

    // CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .nest("/api/ranking", ranking_routes())
        .nest("/api/publications", publications_routes())
        .nest("/api/users", users_routes())
        .nest("/api/admin", admin_ranking_routes())
        .route("/api/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!("Server running on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.stop().await;
    Ok(())
}

async fn health_check() -> impl IntoResponse {
    axum::Json(serde_json::json!({"status": "healthy"}))
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", error);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
