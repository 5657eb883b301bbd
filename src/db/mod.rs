pub mod cache;
pub mod postgres;
pub mod redis;
pub mod store;

pub use cache::{CacheEntry, CacheKey, CacheLayer, CacheTier, CacheTtls, TieredCache};
pub use postgres::{create_pool, run_migrations, PgCatalogStore, PgFavoritesStore};
pub use self::redis::{create_redis_client, RedisStore};
pub use store::{InMemoryStore, KeyValueStore};
