use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::error::AppResult;

/// Durable key-value tier behind the cache layer
///
/// Values are opaque strings (serialized `CacheEntry` payloads). Expiry is
/// decided by the entry's own timestamp; `ttl` is only a hint the backend may
/// use to reclaim space.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Must not return before the value is stored
    async fn set(&self, key: &str, value: String, ttl: Duration) -> AppResult<()>;

    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Deletes every key starting with `prefix`, returning how many were removed
    async fn delete_prefix(&self, prefix: &str) -> AppResult<usize>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// Process-local store, used when no Redis is configured
#[derive(Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String, _ttl: Duration) -> AppResult<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> AppResult<usize> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        Ok(before - entries.len())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = InMemoryStore::new();
        store
            .set("route:a", "1".to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(store.get("route:a").await.unwrap(), Some("1".to_string()));
        store.delete("route:a").await.unwrap();
        assert_eq!(store.get("route:a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_prefix_only_touches_namespace() {
        let store = InMemoryStore::new();
        let ttl = Duration::from_secs(60);
        store.set("route:a", "1".to_string(), ttl).await.unwrap();
        store.set("route:b", "2".to_string(), ttl).await.unwrap();
        store.set("catalog:all", "3".to_string(), ttl).await.unwrap();

        let removed = store.delete_prefix("route:").await.unwrap();
        assert_eq!(removed, 2);
        assert!(store.get("catalog:all").await.unwrap().is_some());
    }
}
