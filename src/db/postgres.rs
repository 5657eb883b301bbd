use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    error::AppResult,
    models::{FavoriteRecord, PlaceRecord},
    services::providers::{CatalogStore, FavoritesStore},
};

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Applies the bundled schema migrations
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Curated catalog stored in the `places` table
#[derive(Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CatalogStore for PgCatalogStore {
    async fn list_all(&self) -> AppResult<Vec<PlaceRecord>> {
        let records = sqlx::query_as::<_, PlaceRecord>(
            r#"
            SELECT id, name, address, lat, lon, category, price_level, rating,
                   tags, weather_suitability
            FROM places
            WHERE active = true
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        tracing::debug!(records = records.len(), "Loaded curated catalog rows");
        Ok(records)
    }
}

/// Per-user favorites stored in the `favorites` table
#[derive(Clone)]
pub struct PgFavoritesStore {
    pool: PgPool,
}

impl PgFavoritesStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl FavoritesStore for PgFavoritesStore {
    async fn list_favorites(&self, user_id: &str, limit: i64) -> AppResult<Vec<FavoriteRecord>> {
        let favorites = sqlx::query_as::<_, FavoriteRecord>(
            r#"
            SELECT category, tags, price_level
            FROM favorites
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(favorites)
    }
}
