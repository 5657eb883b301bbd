use redis::AsyncCommands;
use redis::Client;
use std::time::Duration;

use crate::db::store::KeyValueStore;
use crate::error::AppResult;

const KEY_PREFIX: &str = "placewise:";
const SCAN_BATCH: usize = 100;

/// Creates a Redis client for the durable cache tier
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Durable cache tier backed by Redis
///
/// Writes are synchronous: `set` returns once Redis acknowledged the value,
/// so a subsequent read from any process sees it.
#[derive(Clone)]
pub struct RedisStore {
    redis_client: Client,
}

impl RedisStore {
    pub fn new(redis_client: Client) -> Self {
        Self { redis_client }
    }

    fn full_key(key: &str) -> String {
        format!("{}{}", KEY_PREFIX, key)
    }
}

#[async_trait::async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(Self::full_key(key)).await?;
        Ok(cached)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> AppResult<()> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        // Redis rejects a zero expiry
        let seconds = ttl.as_secs().max(1);
        let _: () = conn.set_ex(Self::full_key(key), value, seconds).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let _: () = conn.del(Self::full_key(key)).await?;
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> AppResult<usize> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let pattern = format!("{}*", Self::full_key(prefix));
        let mut cursor: u64 = 0;
        let mut deleted = 0;

        loop {
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                let _: () = conn.del(&keys).await?;
                deleted += keys.len();
            }

            if next_cursor == 0 {
                break;
            }
            cursor = next_cursor;
        }

        tracing::debug!(pattern = %pattern, deleted, "Redis prefix delete");
        Ok(deleted)
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
