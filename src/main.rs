use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use placewise::{
    config::Config,
    db::{
        create_pool, create_redis_client, run_migrations, CacheLayer, CacheTtls, InMemoryStore,
        KeyValueStore, PgCatalogStore, PgFavoritesStore, RedisStore,
    },
    models::{GeoPoint, RecommendationRequest, TimeOfDay},
    services::{providers::GooglePlacesProvider, EngineSettings, RecommendationEngine},
};

/// Usage: placewise <lat> <lon> [mañana|tarde|noche]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let lat: f64 = args
        .first()
        .context("missing latitude argument")?
        .parse()
        .context("latitude must be a number")?;
    let lon: f64 = args
        .get(1)
        .context("missing longitude argument")?
        .parse()
        .context("longitude must be a number")?;
    let time_of_day: TimeOfDay = match args.get(2) {
        Some(label) => serde_json::from_value(serde_json::Value::String(label.clone()))
            .with_context(|| format!("unknown time of day '{}'", label))?,
        None => TimeOfDay::Tarde,
    };

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;
    tracing::info!("Database ready");

    let durable: Arc<dyn KeyValueStore> = match &config.redis_url {
        Some(url) => {
            tracing::info!("Using Redis for the durable cache tier");
            Arc::new(RedisStore::new(create_redis_client(url)?))
        }
        None => {
            tracing::info!("REDIS_URL not set, durable cache tier kept in memory");
            Arc::new(InMemoryStore::new())
        }
    };
    let cache = Arc::new(CacheLayer::new(durable, CacheTtls::from(&config)));

    let places_provider = GooglePlacesProvider::new(
        config.places_api_key.clone(),
        config.places_api_url.clone(),
        config.upstream_timeout(),
    )?;

    let engine = RecommendationEngine::new(
        Arc::new(PgCatalogStore::new(pool.clone())),
        Arc::new(places_provider),
        Arc::new(PgFavoritesStore::new(pool)),
        cache,
        EngineSettings::from(&config),
    );

    let request = RecommendationRequest {
        user_location: GeoPoint::new(lat, lon),
        current_weather: None,
        time_of_day,
        user_id: String::new(),
    };

    match engine.get_quick_recommendation(&request).await {
        Ok(recommendation) => println!("{}", serde_json::to_string_pretty(&recommendation)?),
        Err(e) if e.is_no_candidates() => println!("{}", e),
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
