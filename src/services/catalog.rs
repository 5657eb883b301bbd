use std::sync::Arc;

use crate::{
    cached,
    db::{CacheKey, CacheLayer},
    error::{AppError, AppResult},
    models::{GeoPoint, Place},
    services::providers::CatalogStore,
};

/// Read-through access to the curated catalog.
///
/// The whole catalog is cached as one entry under `catalog:all`, in memory
/// and in the durable tier.
pub struct PlaceCatalogSource {
    store: Arc<dyn CatalogStore>,
    cache: Arc<CacheLayer>,
}

impl PlaceCatalogSource {
    pub fn new(store: Arc<dyn CatalogStore>, cache: Arc<CacheLayer>) -> Self {
        Self { store, cache }
    }

    pub async fn fetch_all(&self) -> AppResult<Vec<Place>> {
        cached!(self.cache.catalog, CacheKey::Catalog, async {
            let records = self.store.list_all().await?;
            let places: Vec<Place> = records.into_iter().map(Place::from).collect();
            tracing::info!(places = places.len(), "Curated catalog loaded from store");
            Ok::<_, AppError>(places)
        })
    }

    /// Catalog places within `radius_km` of `center`
    pub async fn within_radius(&self, center: GeoPoint, radius_km: f64) -> AppResult<Vec<Place>> {
        let places = self.fetch_all().await?;
        Ok(places
            .into_iter()
            .filter(|p| center.distance_km(&p.location) <= radius_km)
            .collect())
    }
}
