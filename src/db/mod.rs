use sqlx::{MySqlPool, mysql::MySqlPoolOptions};

pub async fn init_db(
    database_url: &str,
    max_connections: u32,
    admin_username: Option<&str>,
) -> Result<MySqlPool, sqlx::Error> {
    let pool = MySqlPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id BIGINT AUTO_INCREMENT PRIMARY KEY,
            username VARCHAR(191) NOT NULL UNIQUE,
            email VARCHAR(320) NULL,
            display_name VARCHAR(255) NULL,
            field VARCHAR(255) NULL,
            institution VARCHAR(255) NULL,
            bio TEXT NULL,
            is_admin BOOLEAN NOT NULL DEFAULT FALSE,
            created_at DATETIME(6) NOT NULL DEFAULT CURRENT_TIMESTAMP(6),
            updated_at DATETIME(6) NULL,
            INDEX idx_users_email (email)
        ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS publications (
            id BIGINT AUTO_INCREMENT PRIMARY KEY,
            user_id BIGINT NOT NULL,
            doi VARCHAR(255) NOT NULL,
            title TEXT NOT NULL,
            authors JSON NOT NULL,
            journal VARCHAR(255) NULL,
            year INT NULL,
            publication_type VARCHAR(32) NOT NULL DEFAULT 'journal-article',
            abstract_text TEXT NULL,
            created_at DATETIME(6) NOT NULL DEFAULT CURRENT_TIMESTAMP(6),
            UNIQUE KEY uq_publications_doi_user (doi, user_id),
            INDEX idx_publications_user_year (user_id, year),
            CONSTRAINT fk_publications_user_id FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS publication_scores (
            id BIGINT AUTO_INCREMENT PRIMARY KEY,
            publication_id BIGINT NOT NULL,
            user_id BIGINT NOT NULL,
            base_score DECIMAL(10, 2) NOT NULL DEFAULT 10,
            recency_bonus DECIMAL(10, 2) NOT NULL DEFAULT 0,
            impact_bonus DECIMAL(10, 2) NOT NULL DEFAULT 0,
            total_score DECIMAL(10, 2) NOT NULL,
            computed_at DATETIME(6) NOT NULL,
            INDEX idx_publication_scores_publication_id (publication_id),
            INDEX idx_publication_scores_user_id (user_id),
            CONSTRAINT fk_publication_scores_publication_id FOREIGN KEY (publication_id) REFERENCES publications(id) ON DELETE CASCADE,
            CONSTRAINT fk_publication_scores_user_id FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_ratings (
            id BIGINT AUTO_INCREMENT PRIMARY KEY,
            user_id BIGINT NOT NULL UNIQUE,
            score DECIMAL(10, 2) NOT NULL DEFAULT 0,
            `rank` INT NULL,
            publication_count INT NOT NULL DEFAULT 0,
            computed_at DATETIME(6) NOT NULL,
            updated_at DATETIME(6) NOT NULL,
            INDEX idx_user_ratings_score (score),
            INDEX idx_user_ratings_rank (`rank`),
            CONSTRAINT fk_user_ratings_user_id FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci
        "#,
    )
    .execute(&pool)
    .await?;

    // append-only
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ranking_history (
            id BIGINT AUTO_INCREMENT PRIMARY KEY,
            user_id BIGINT NOT NULL,
            score DECIMAL(10, 2) NOT NULL,
            `rank` INT NULL,
            publication_count INT NOT NULL,
            recorded_at DATETIME(6) NOT NULL,
            INDEX idx_ranking_history_user_recorded (user_id, recorded_at),
            INDEX idx_ranking_history_recorded_at (recorded_at),
            CONSTRAINT fk_ranking_history_user_id FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci
        "#,
    )
    .execute(&pool)
    .await?;

    if let Some(admin_username) = admin_username {
        match sqlx::query("UPDATE users SET is_admin = 1 WHERE username = ?")
            .bind(admin_username)
            .execute(&pool)
            .await
        {
            Ok(_) => tracing::info!("Admin promotion checked for username: {}", admin_username),
            Err(error) => tracing::warn!(
                "Admin promotion failed for username {}: {}",
                admin_username,
                error
            ),
        }
    }

    Ok(pool)
}
