use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{error::Elapsed, timeout};

use crate::{
    error::{AppError, AppResult},
    models::{Category, GeoPoint, Place},
    services::{catalog::PlaceCatalogSource, external_search::ExternalPlaceSearch},
};

/// Provider types requested for the recommendation inventory
pub const DEFAULT_EXTERNAL_TYPES: &[&str] = &[
    "restaurant",
    "cafe",
    "bar",
    "park",
    "museum",
    "shopping_mall",
    "movie_theater",
    "tourist_attraction",
];

/// Merges the curated catalog and the external provider into one candidate list.
///
/// Both sources are queried concurrently and each wait is bounded by the
/// upstream timeout. A failed or slow source contributes nothing; only when
/// both come back empty and at least one failed does the search fail.
pub struct PlaceAggregator {
    catalog: Arc<PlaceCatalogSource>,
    external: Arc<ExternalPlaceSearch>,
    upstream_timeout: Duration,
    external_types: Vec<String>,
}

impl PlaceAggregator {
    pub fn new(
        catalog: Arc<PlaceCatalogSource>,
        external: Arc<ExternalPlaceSearch>,
        upstream_timeout: Duration,
    ) -> Self {
        Self {
            catalog,
            external,
            upstream_timeout,
            external_types: DEFAULT_EXTERNAL_TYPES.iter().map(|t| t.to_string()).collect(),
        }
    }

    pub async fn find_candidates(&self, location: GeoPoint, radius_km: f64) -> AppResult<Vec<Place>> {
        let radius_meters = (radius_km * 1000.0).round().max(0.0) as u32;

        let (catalog_result, external_result) = tokio::join!(
            timeout(
                self.upstream_timeout,
                self.catalog.within_radius(location, radius_km)
            ),
            timeout(
                self.upstream_timeout,
                self.external
                    .search_nearby(location, radius_meters, &self.external_types)
            ),
        );

        let (catalog_places, catalog_failed) = settle("catalog", catalog_result);
        let (external_places, external_failed) = settle("external", external_result);

        if catalog_places.is_empty()
            && external_places.is_empty()
            && (catalog_failed || external_failed)
        {
            return Err(AppError::NoCandidates(format!(
                "no place sources available within {:.1} km",
                radius_km
            )));
        }

        let catalog_count = catalog_places.len();
        let external_count = external_places.len();
        let candidates = merge(catalog_places, external_places);

        tracing::info!(
            catalog = catalog_count,
            external = external_count,
            candidates = candidates.len(),
            radius_km,
            "Candidates aggregated"
        );

        Ok(candidates)
    }
}

/// Collapses a bounded source call into its places and a failure flag
pub(crate) fn settle(
    source: &'static str,
    result: Result<AppResult<Vec<Place>>, Elapsed>,
) -> (Vec<Place>, bool) {
    match result {
        Ok(Ok(places)) => (places, false),
        Ok(Err(e)) => {
            tracing::warn!(source, error = %e, "Place source failed, continuing without it");
            (Vec::new(), true)
        }
        Err(_) => {
            tracing::warn!(source, "Place source timed out, continuing without it");
            (Vec::new(), true)
        }
    }
}

/// Catalog first, then external. Hotels are dropped.
pub fn merge(catalog: Vec<Place>, external: Vec<Place>) -> Vec<Place> {
    dedup(
        catalog
            .into_iter()
            .chain(external)
            .filter(|p| p.category != Category::Hotel),
    )
}

/// First place with a given normalized name (or id) wins
pub fn dedup(places: impl IntoIterator<Item = Place>) -> Vec<Place> {
    let mut seen_names = HashSet::new();
    let mut seen_ids = HashSet::new();

    places
        .into_iter()
        .filter(|p| {
            let name = p.normalized_name();
            if seen_names.contains(&name) || seen_ids.contains(&p.id) {
                return false;
            }
            seen_names.insert(name);
            seen_ids.insert(p.id.clone());
            true
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::CacheLayer;
    use crate::models::{PlaceRecord, PlaceSource, ProviderGeometry, ProviderLatLng, ProviderPlace};
    use crate::services::providers::{
        CatalogStore, MockCatalogStore, MockNearbySearchProvider, NearbySearchProvider,
    };
    use std::collections::BTreeSet;

    const LOCATION: GeoPoint = GeoPoint {
        lat: -12.12,
        lon: -77.03,
    };

    fn place(id: &str, name: &str, category: Category, source: PlaceSource) -> Place {
        Place {
            id: id.to_string(),
            name: name.to_string(),
            address: String::new(),
            location: LOCATION,
            category,
            price_level: 2,
            rating: 4.0,
            tags: BTreeSet::new(),
            weather_suitability: category.weather_suitability(),
            source,
        }
    }

    fn record(id: &str, name: &str) -> PlaceRecord {
        PlaceRecord {
            id: id.to_string(),
            name: name.to_string(),
            address: None,
            lat: LOCATION.lat,
            lon: LOCATION.lon,
            category: Some("cafe".to_string()),
            price_level: None,
            rating: None,
            tags: None,
            weather_suitability: None,
        }
    }

    fn provider_place(id: &str, name: &str) -> ProviderPlace {
        ProviderPlace {
            place_id: id.to_string(),
            name: name.to_string(),
            vicinity: None,
            geometry: ProviderGeometry {
                location: ProviderLatLng {
                    lat: LOCATION.lat,
                    lng: LOCATION.lon,
                },
            },
            types: vec!["restaurant".to_string()],
            rating: Some(4.2),
            price_level: Some(2),
            user_ratings_total: None,
        }
    }

    /// Provider that never answers within any reasonable timeout
    struct StalledProvider;

    #[async_trait::async_trait]
    impl NearbySearchProvider for StalledProvider {
        async fn nearby_search(
            &self,
            _location: GeoPoint,
            _radius_meters: u32,
            _types: &[String],
        ) -> AppResult<Vec<ProviderPlace>> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(Vec::new())
        }

        fn name(&self) -> &'static str {
            "stalled"
        }
    }

    fn aggregator(
        store: impl CatalogStore + 'static,
        provider: impl NearbySearchProvider + 'static,
        upstream_timeout: Duration,
    ) -> PlaceAggregator {
        let cache = Arc::new(CacheLayer::in_memory());
        PlaceAggregator::new(
            Arc::new(PlaceCatalogSource::new(Arc::new(store), cache.clone())),
            Arc::new(ExternalPlaceSearch::new(Arc::new(provider), cache)),
            upstream_timeout,
        )
    }

    #[test]
    fn test_merge_catalog_wins_on_duplicate_names() {
        let catalog = vec![place("c1", "La Lucha", Category::Restaurante, PlaceSource::Catalog)];
        let external = vec![
            place("e1", "  la lucha ", Category::Restaurante, PlaceSource::External),
            place("e2", "Parque Kennedy", Category::Parque, PlaceSource::External),
        ];

        let merged = merge(catalog, external);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].id, "c1");
        assert_eq!(merged[0].source, PlaceSource::Catalog);
        assert_eq!(merged[1].id, "e2");
    }

    #[test]
    fn test_merge_drops_hotels() {
        let merged = merge(
            vec![place("h1", "Hotel Bolívar", Category::Hotel, PlaceSource::Catalog)],
            vec![place("e1", "Café Bisetti", Category::Cafe, PlaceSource::External)],
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].category, Category::Cafe);
    }

    #[test]
    fn test_dedup_rejected_id_does_not_claim_its_name() {
        let places = vec![
            place("1", "A", Category::Cafe, PlaceSource::Catalog),
            place("1", "B", Category::Cafe, PlaceSource::External),
            place("2", "B", Category::Cafe, PlaceSource::External),
        ];

        let ids: Vec<String> = dedup(places).into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_both_sources_contribute() {
        let mut store = MockCatalogStore::new();
        store
            .expect_list_all()
            .returning(|| Ok(vec![record("c1", "Café Tostado")]));

        let mut provider = MockNearbySearchProvider::new();
        provider
            .expect_nearby_search()
            .returning(|_, _, _| Ok(vec![provider_place("e1", "La Mar"), provider_place("e2", "café tostado")]));
        provider.expect_name().return_const("mock");

        let candidates = aggregator(store, provider, Duration::from_secs(1))
            .find_candidates(LOCATION, 5.0)
            .await
            .unwrap();

        let ids: Vec<&str> = candidates.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "e1"]);
    }

    #[tokio::test]
    async fn test_external_failure_still_returns_catalog() {
        let mut store = MockCatalogStore::new();
        store
            .expect_list_all()
            .returning(|| Ok(vec![record("c1", "Café Tostado")]));

        let mut provider = MockNearbySearchProvider::new();
        provider
            .expect_nearby_search()
            .returning(|_, _, _| Err(AppError::ExternalApi("REQUEST_DENIED".to_string())));
        provider.expect_name().return_const("mock");

        let candidates = aggregator(store, provider, Duration::from_secs(1))
            .find_candidates(LOCATION, 5.0)
            .await
            .unwrap();

        assert_eq!(candidates.len(), 1);
    }

    #[tokio::test]
    async fn test_slow_external_source_is_abandoned() {
        let mut store = MockCatalogStore::new();
        store
            .expect_list_all()
            .returning(|| Ok(vec![record("c1", "Café Tostado")]));

        let candidates = aggregator(store, StalledProvider, Duration::from_millis(50))
            .find_candidates(LOCATION, 5.0)
            .await
            .unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, "c1");
    }

    #[tokio::test]
    async fn test_total_failure_is_no_candidates() {
        let mut store = MockCatalogStore::new();
        store
            .expect_list_all()
            .returning(|| Err(AppError::Internal("pool closed".to_string())));

        let err = aggregator(store, StalledProvider, Duration::from_millis(50))
            .find_candidates(LOCATION, 5.0)
            .await
            .unwrap_err();

        assert!(err.is_no_candidates());
    }

    #[tokio::test]
    async fn test_empty_but_healthy_sources_are_ok() {
        let mut store = MockCatalogStore::new();
        store.expect_list_all().returning(|| Ok(Vec::new()));

        let mut provider = MockNearbySearchProvider::new();
        provider.expect_nearby_search().returning(|_, _, _| Ok(Vec::new()));
        provider.expect_name().return_const("mock");

        let candidates = aggregator(store, provider, Duration::from_secs(1))
            .find_candidates(LOCATION, 5.0)
            .await
            .unwrap();

        assert!(candidates.is_empty());
    }
}
