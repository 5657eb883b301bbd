use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::db::store::{InMemoryStore, KeyValueStore};
use crate::models::{GeoPoint, Place, RouteSummary, TravelMode};

/// Keys for the three engine caches
///
/// Coordinates are rounded before they reach the key, so nearby requests
/// share entries. A key never maps 1:1 to exact coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheKey {
    /// The whole curated catalog (singleton)
    Catalog,
    /// Recommendation-path nearby search
    Nearby {
        location: GeoPoint,
        types: Vec<String>,
    },
    /// Ranking-path nearby search (lodging allowed)
    RankingNearby {
        location: GeoPoint,
        types: Vec<String>,
    },
    Route {
        origin: GeoPoint,
        destination: GeoPoint,
        mode: TravelMode,
    },
}

impl CacheKey {
    const EXTERNAL_PRECISION: usize = 2;
    const ROUTE_PRECISION: usize = 3;

    fn type_signature(types: &[String]) -> String {
        let mut sorted: Vec<String> = types.iter().map(|t| t.trim().to_lowercase()).collect();
        sorted.sort();
        sorted.dedup();
        sorted.join(",")
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Catalog => write!(f, "catalog:all"),
            CacheKey::Nearby { location, types } => write!(
                f,
                "external:nearby:{}:{}",
                location.rounded(Self::EXTERNAL_PRECISION),
                Self::type_signature(types)
            ),
            CacheKey::RankingNearby { location, types } => write!(
                f,
                "external:ranking:{}:{}",
                location.rounded(Self::EXTERNAL_PRECISION),
                Self::type_signature(types)
            ),
            CacheKey::Route {
                origin,
                destination,
                mode,
            } => write!(
                f,
                "route:{}:{}:{}",
                origin.rounded(Self::ROUTE_PRECISION),
                destination.rounded(Self::ROUTE_PRECISION),
                mode
            ),
        }
    }
}

/// A cached payload stamped with its creation time and time-to-live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub payload: T,
    pub timestamp: DateTime<Utc>,
    pub ttl_ms: u64,
}

impl<T> CacheEntry<T> {
    pub fn new(payload: T, ttl: Duration) -> Self {
        Self::with_timestamp(payload, Utc::now(), ttl)
    }

    pub fn with_timestamp(payload: T, timestamp: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            payload,
            timestamp,
            ttl_ms: ttl.as_millis() as u64,
        }
    }

    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.ttl_ms as i64)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// `now - timestamp > ttl`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now - self.timestamp > self.ttl()
    }
}

/// Where a cache keeps its entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
    Memory,
    MemoryAndDurable,
    Durable,
}

impl CacheTier {
    fn uses_memory(&self) -> bool {
        matches!(self, CacheTier::Memory | CacheTier::MemoryAndDurable)
    }

    fn uses_durable(&self) -> bool {
        matches!(self, CacheTier::Durable | CacheTier::MemoryAndDurable)
    }
}

/// One named cache with its own TTL and storage tier
///
/// Reads prefer memory, then fall back to the durable store and rehydrate
/// memory on a hit. Expired entries are removed by the read that finds them.
/// Durable failures and corrupt payloads are misses, never errors.
pub struct TieredCache<T> {
    name: &'static str,
    namespace: &'static str,
    ttl: Duration,
    tier: CacheTier,
    memory: RwLock<HashMap<String, CacheEntry<T>>>,
    durable: Arc<dyn KeyValueStore>,
}

impl<T> TieredCache<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    pub fn new(
        name: &'static str,
        namespace: &'static str,
        ttl: Duration,
        tier: CacheTier,
        durable: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            name,
            namespace,
            ttl,
            tier,
            memory: RwLock::new(HashMap::new()),
            durable,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn tier(&self) -> CacheTier {
        self.tier
    }

    /// Returns the cached value, or `None` on miss or expiry
    pub async fn get(&self, key: &CacheKey) -> Option<T> {
        let key = key.to_string();
        let now = Utc::now();

        if self.tier.uses_memory() {
            let lookup = {
                let memory = self.memory.read().await;
                memory
                    .get(&key)
                    .map(|entry| (!entry.is_expired_at(now)).then(|| entry.payload.clone()))
            };

            match lookup {
                Some(Some(payload)) => {
                    tracing::debug!(cache = self.name, key = %key, "Memory cache hit");
                    return Some(payload);
                }
                Some(None) => {
                    let mut memory = self.memory.write().await;
                    // A concurrent put may have refreshed it meanwhile
                    if memory.get(&key).is_some_and(|e| e.is_expired_at(now)) {
                        memory.remove(&key);
                        tracing::debug!(cache = self.name, key = %key, "Evicted expired memory entry");
                    }
                }
                None => {}
            }
        }

        if self.tier.uses_durable() {
            if let Some(entry) = self.read_durable(&key, now).await {
                let payload = entry.payload.clone();
                if self.tier.uses_memory() {
                    self.memory.write().await.insert(key.clone(), entry);
                }
                tracing::debug!(cache = self.name, key = %key, "Durable cache hit");
                return Some(payload);
            }
        }

        tracing::debug!(cache = self.name, key = %key, "Cache miss");
        None
    }

    async fn read_durable(&self, key: &str, now: DateTime<Utc>) -> Option<CacheEntry<T>> {
        let raw = match self.durable.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(cache = self.name, error = %e, "Durable cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_str::<CacheEntry<T>>(&raw) {
            Ok(entry) if !entry.is_expired_at(now) => Some(entry),
            Ok(_) => {
                tracing::debug!(cache = self.name, key = %key, "Evicting expired durable entry");
                self.delete_durable(key).await;
                None
            }
            Err(e) => {
                tracing::warn!(
                    cache = self.name,
                    key = %key,
                    error = %e,
                    "Corrupt durable cache entry, dropping"
                );
                self.delete_durable(key).await;
                None
            }
        }
    }

    async fn delete_durable(&self, key: &str) {
        if let Err(e) = self.durable.delete(key).await {
            tracing::warn!(cache = self.name, error = %e, "Failed to delete durable cache entry");
        }
    }

    /// Stores `value` under `key`, overwriting any previous entry
    pub async fn put(&self, key: &CacheKey, value: T) {
        self.insert_entry(key, CacheEntry::new(value, self.ttl)).await;
    }

    /// Stores a pre-built entry. The durable write completes before this returns.
    pub async fn insert_entry(&self, key: &CacheKey, entry: CacheEntry<T>) {
        let key = key.to_string();

        if self.tier.uses_durable() {
            match serde_json::to_string(&entry) {
                Ok(json) => {
                    if let Err(e) = self.durable.set(&key, json, self.ttl).await {
                        tracing::warn!(
                            cache = self.name,
                            backend = self.durable.name(),
                            error = %e,
                            "Durable cache write failed"
                        );
                    }
                }
                Err(e) => {
                    tracing::error!(cache = self.name, error = %e, "Cache serialization error");
                }
            }
        }

        if self.tier.uses_memory() {
            self.memory.write().await.insert(key, entry);
        }
    }

    /// Removes every entry of this cache from both tiers
    pub async fn clear(&self) {
        if self.tier.uses_memory() {
            self.memory.write().await.clear();
        }
        if self.tier.uses_durable() {
            match self.durable.delete_prefix(self.namespace).await {
                Ok(removed) => {
                    tracing::info!(cache = self.name, removed, "Durable cache cleared")
                }
                Err(e) => {
                    tracing::warn!(cache = self.name, error = %e, "Failed to clear durable cache")
                }
            }
        }
    }
}

/// TTLs for the three engine caches
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheTtls {
    pub catalog: Duration,
    pub external: Duration,
    pub route: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            catalog: Duration::from_secs(24 * 60 * 60),
            external: Duration::from_secs(30 * 60),
            route: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl From<&Config> for CacheTtls {
    fn from(config: &Config) -> Self {
        Self {
            catalog: Duration::from_secs(config.catalog_cache_ttl_secs),
            external: Duration::from_secs(config.external_cache_ttl_secs),
            route: Duration::from_secs(config.route_cache_ttl_secs),
        }
    }
}

/// The engine's caches, constructed once and shared via `Arc`
pub struct CacheLayer {
    /// Curated catalog: memory + durable
    pub catalog: TieredCache<Vec<Place>>,
    /// External nearby search: memory only
    pub external: TieredCache<Vec<Place>>,
    /// Computed routes: durable only
    pub routes: TieredCache<RouteSummary>,
}

impl CacheLayer {
    pub fn new(durable: Arc<dyn KeyValueStore>, ttls: CacheTtls) -> Self {
        Self {
            catalog: TieredCache::new(
                "curated-catalog",
                "catalog:",
                ttls.catalog,
                CacheTier::MemoryAndDurable,
                durable.clone(),
            ),
            external: TieredCache::new(
                "external-search",
                "external:",
                ttls.external,
                CacheTier::Memory,
                durable.clone(),
            ),
            routes: TieredCache::new(
                "route",
                "route:",
                ttls.route,
                CacheTier::Durable,
                durable,
            ),
        }
    }

    /// All tiers in process memory with default TTLs
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStore::new()), CacheTtls::default())
    }

    pub async fn clear_all(&self) {
        self.catalog.clear().await;
        self.external.clear().await;
        self.routes.clear().await;
    }
}
