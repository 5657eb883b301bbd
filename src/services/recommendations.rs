use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use rand::{rngs::StdRng, SeedableRng};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    config::Config,
    db::CacheLayer,
    error::{AppError, AppResult},
    models::{
        Budget, GeoPoint, Itinerary, PersonalizedRequest, Place, RecommendationRequest,
        ScoredRecommendation, UserContext, DATE_FORMAT,
    },
    services::{
        aggregator::{self, PlaceAggregator, DEFAULT_EXTERNAL_TYPES},
        catalog::PlaceCatalogSource,
        external_search::ExternalPlaceSearch,
        itinerary::ItineraryPlanner,
        providers::{CatalogStore, FavoritesStore, NearbySearchProvider},
        scoring::ScoringEngine,
    },
};

/// Longest trip an itinerary is generated for
pub const MAX_ITINERARY_DAYS: i64 = 30;

/// Tunables for the engine, usually taken from `Config`
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub search_radius_km: f64,
    pub upstream_timeout: Duration,
    pub favorites_limit: i64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            search_radius_km: 5.0,
            upstream_timeout: Duration::from_secs(5),
            favorites_limit: 20,
        }
    }
}

impl From<&Config> for EngineSettings {
    fn from(config: &Config) -> Self {
        Self {
            search_radius_km: config.search_radius_km,
            upstream_timeout: config.upstream_timeout(),
            favorites_limit: config.favorites_limit,
        }
    }
}

/// Entry point for callers
///
/// Wires the catalog, the external search and the favorites store around one
/// shared `CacheLayer`. Every call rebuilds the user's context from their
/// favorites; nothing about the user is kept between calls.
pub struct RecommendationEngine {
    catalog: Arc<PlaceCatalogSource>,
    external: Arc<ExternalPlaceSearch>,
    aggregator: PlaceAggregator,
    favorites: Arc<dyn FavoritesStore>,
    cache: Arc<CacheLayer>,
    rng: Mutex<StdRng>,
    settings: EngineSettings,
}

impl RecommendationEngine {
    pub fn new(
        catalog_store: Arc<dyn CatalogStore>,
        places_provider: Arc<dyn NearbySearchProvider>,
        favorites: Arc<dyn FavoritesStore>,
        cache: Arc<CacheLayer>,
        settings: EngineSettings,
    ) -> Self {
        let catalog = Arc::new(PlaceCatalogSource::new(catalog_store, cache.clone()));
        let external = Arc::new(ExternalPlaceSearch::new(places_provider, cache.clone()));
        let aggregator =
            PlaceAggregator::new(catalog.clone(), external.clone(), settings.upstream_timeout);

        Self {
            catalog,
            external,
            aggregator,
            favorites,
            cache,
            rng: Mutex::new(StdRng::from_entropy()),
            settings,
        }
    }

    /// Replaces the entropy-seeded RNG, making quick picks and itineraries reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn cache(&self) -> &Arc<CacheLayer> {
        &self.cache
    }

    /// Favorites-derived context. A failing store degrades to the empty context.
    async fn user_context(&self, user_id: &str) -> UserContext {
        if user_id.trim().is_empty() {
            return UserContext::default();
        }

        match self
            .favorites
            .list_favorites(user_id, self.settings.favorites_limit)
            .await
        {
            Ok(favorites) => UserContext::from_favorites(&favorites),
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Favorites unavailable, using empty context");
                UserContext::default()
            }
        }
    }

    #[instrument(
        skip_all,
        fields(request_id = %Uuid::new_v4(), user_id = %request.user_id, time_of_day = ?request.time_of_day)
    )]
    pub async fn get_quick_recommendation(
        &self,
        request: &RecommendationRequest,
    ) -> AppResult<ScoredRecommendation> {
        let (context, candidates) = tokio::join!(
            self.user_context(&request.user_id),
            self.aggregator
                .find_candidates(request.user_location, self.settings.search_radius_km),
        );
        let candidates = candidates?;

        let recommendation = {
            let mut rng = self.rng.lock().await;
            ScoringEngine::new(&candidates, &context).quick(request, &mut *rng)?
        };

        tracing::info!(
            place_id = %recommendation.place.id,
            category = %recommendation.place.category,
            score = recommendation.score,
            candidates = candidates.len(),
            "Quick recommendation selected"
        );

        Ok(recommendation)
    }

    #[instrument(
        skip_all,
        fields(request_id = %Uuid::new_v4(), user_id = %request.user_id, mood = ?request.mood)
    )]
    pub async fn get_personalized_recommendation(
        &self,
        request: &PersonalizedRequest,
    ) -> AppResult<ScoredRecommendation> {
        let (context, candidates) = tokio::join!(
            self.user_context(&request.user_id),
            self.aggregator
                .find_candidates(request.user_location, self.settings.search_radius_km),
        );
        let candidates = candidates?;

        let recommendation = ScoringEngine::new(&candidates, &context).personalized(request)?;

        tracing::info!(
            place_id = %recommendation.place.id,
            category = %recommendation.place.category,
            score = recommendation.score,
            candidates = candidates.len(),
            "Personalized recommendation selected"
        );

        Ok(recommendation)
    }

    /// Plans `start..=end` (dates as `dd/MM/yyyy`) from the curated catalog.
    ///
    /// Places whose address mentions the destination are preferred; when none
    /// do, the whole catalog is used.
    #[instrument(skip(self, interests), fields(request_id = %Uuid::new_v4()))]
    pub async fn generate_itinerary(
        &self,
        destination: &str,
        start: &str,
        end: &str,
        budget: Budget,
        interests: &[String],
    ) -> AppResult<Itinerary> {
        let destination = destination.trim();
        if destination.is_empty() {
            return Err(AppError::InvalidInput("destination is empty".to_string()));
        }

        let start_date = parse_date(start)?;
        let end_date = parse_date(end)?;
        if end_date < start_date {
            return Err(AppError::InvalidInput(format!(
                "end date {} is before start date {}",
                end.trim(),
                start.trim()
            )));
        }

        let num_days = (end_date - start_date).num_days() + 1;
        if num_days > MAX_ITINERARY_DAYS {
            return Err(AppError::InvalidInput(format!(
                "trips longer than {} days are not supported",
                MAX_ITINERARY_DAYS
            )));
        }

        let catalog = self.catalog.fetch_all().await?;
        let needle = destination.to_lowercase();
        let local: Vec<Place> = catalog
            .iter()
            .filter(|p| p.address.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        let inventory = if local.is_empty() { catalog } else { local };

        let itinerary = {
            let mut rng = self.rng.lock().await;
            ItineraryPlanner::new(destination, &inventory, budget, interests).generate(
                start_date,
                num_days as u32,
                &mut *rng,
            )
        };

        tracing::info!(
            destination,
            days = itinerary.days.len(),
            inventory = inventory.len(),
            total_cost = itinerary.cost.total,
            "Itinerary generated"
        );

        Ok(itinerary)
    }

    /// Best-rated places around `location`, hotels included
    ///
    /// Reads the ranking inventory of the external provider plus the catalog.
    /// A failed or slow source contributes nothing, as in candidate search.
    #[instrument(skip(self), fields(request_id = %Uuid::new_v4()))]
    pub async fn top_rated_nearby(
        &self,
        location: GeoPoint,
        radius_km: f64,
        limit: usize,
    ) -> AppResult<Vec<Place>> {
        let mut types: Vec<String> = DEFAULT_EXTERNAL_TYPES.iter().map(|t| t.to_string()).collect();
        types.push("lodging".to_string());
        let radius_meters = (radius_km * 1000.0).round().max(0.0) as u32;

        let (catalog_result, external_result) = tokio::join!(
            timeout(
                self.settings.upstream_timeout,
                self.catalog.within_radius(location, radius_km)
            ),
            timeout(
                self.settings.upstream_timeout,
                self.external
                    .search_nearby_for_ranking(location, radius_meters, &types)
            ),
        );

        let (catalog, catalog_failed) = aggregator::settle("catalog", catalog_result);
        let (external, external_failed) = aggregator::settle("external", external_result);

        if catalog.is_empty() && external.is_empty() && (catalog_failed || external_failed) {
            return Err(AppError::NoCandidates(format!(
                "no ranking sources available within {:.1} km",
                radius_km
            )));
        }

        let mut ranked = aggregator::dedup(catalog.into_iter().chain(external));
        ranked.sort_by(|a, b| {
            b.rating
                .partial_cmp(&a.rating)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(limit);

        Ok(ranked)
    }
}

fn parse_date(value: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|e| {
        AppError::InvalidInput(format!("invalid date '{}', expected dd/MM/yyyy: {}", value, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Category, FavoriteRecord, PlaceRecord, ProviderGeometry, ProviderLatLng, ProviderPlace,
        TimeOfDay, Weather,
    };
    use crate::services::providers::{
        MockCatalogStore, MockFavoritesStore, MockNearbySearchProvider,
    };

    const HOME: GeoPoint = GeoPoint {
        lat: -12.1211,
        lon: -77.0297,
    };

    fn record(id: &str, name: &str, category: &str, address: &str, rating: f64) -> PlaceRecord {
        PlaceRecord {
            id: id.to_string(),
            name: name.to_string(),
            address: Some(address.to_string()),
            lat: HOME.lat,
            lon: HOME.lon,
            category: Some(category.to_string()),
            price_level: Some(1),
            rating: Some(rating),
            tags: None,
            weather_suitability: None,
        }
    }

    fn engine(records: Vec<PlaceRecord>, favorites: MockFavoritesStore) -> RecommendationEngine {
        let mut store = MockCatalogStore::new();
        store.expect_list_all().returning(move || Ok(records.clone()));

        let mut provider = MockNearbySearchProvider::new();
        provider
            .expect_nearby_search()
            .returning(|_, _, _| Err(AppError::ExternalApi("OVER_QUERY_LIMIT".to_string())));
        provider.expect_name().return_const("mock");

        engine_with(store, provider, favorites)
    }

    fn engine_with(
        store: MockCatalogStore,
        provider: MockNearbySearchProvider,
        favorites: MockFavoritesStore,
    ) -> RecommendationEngine {
        RecommendationEngine::new(
            Arc::new(store),
            Arc::new(provider),
            Arc::new(favorites),
            Arc::new(CacheLayer::in_memory()),
            EngineSettings::default(),
        )
        .with_seed(7)
    }

    fn failing_catalog() -> MockCatalogStore {
        let mut store = MockCatalogStore::new();
        store
            .expect_list_all()
            .returning(|| Err(AppError::Internal("db down".to_string())));
        store
    }

    fn no_favorites() -> MockFavoritesStore {
        let mut favorites = MockFavoritesStore::new();
        favorites.expect_list_favorites().returning(|_, _| Ok(Vec::new()));
        favorites
    }

    fn quick_request() -> RecommendationRequest {
        RecommendationRequest {
            user_location: HOME,
            current_weather: Some(Weather::Soleado),
            time_of_day: TimeOfDay::Noche,
            user_id: "user-1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_quick_recommendation_uses_favorites() {
        let mut favorites = MockFavoritesStore::new();
        favorites
            .expect_list_favorites()
            .times(1)
            .returning(|_, _| {
                Ok(vec![FavoriteRecord {
                    category: Some("bar".to_string()),
                    tags: Vec::new(),
                    price_level: Some(1),
                }])
            });

        let engine = engine(
            vec![
                record("1", "Bar Huaringas", "bar", "Lima", 4.0),
                record("2", "Museo Larco", "museo", "Lima", 4.0),
            ],
            favorites,
        );

        let recommendation = engine.get_quick_recommendation(&quick_request()).await.unwrap();
        assert!(recommendation.score > 0.0);
        assert!(recommendation.distance_km < 0.01);
    }

    #[tokio::test]
    async fn test_favorites_failure_degrades_to_empty_context() {
        let mut favorites = MockFavoritesStore::new();
        favorites
            .expect_list_favorites()
            .returning(|_, _| Err(AppError::Internal("favorites offline".to_string())));

        let engine = engine(vec![record("1", "Café Tostado", "cafe", "Lima", 4.5)], favorites);
        let recommendation = engine.get_quick_recommendation(&quick_request()).await.unwrap();
        assert_eq!(recommendation.place.id, "1");
    }

    #[tokio::test]
    async fn test_itinerary_date_validation() {
        let engine = engine(vec![record("1", "Museo Larco", "museo", "Lima", 4.5)], no_favorites());

        let reversed = engine
            .generate_itinerary("Lima", "03/03/2025", "01/03/2025", Budget::Moderado, &[])
            .await;
        assert!(matches!(reversed, Err(AppError::InvalidInput(_))));

        let malformed = engine
            .generate_itinerary("Lima", "2025-03-01", "03/03/2025", Budget::Moderado, &[])
            .await;
        assert!(matches!(malformed, Err(AppError::InvalidInput(_))));

        let too_long = engine
            .generate_itinerary("Lima", "01/01/2025", "01/06/2025", Budget::Moderado, &[])
            .await;
        assert!(matches!(too_long, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_single_day_itinerary() {
        let engine = engine(vec![record("1", "Museo Larco", "museo", "Lima", 4.5)], no_favorites());

        let itinerary = engine
            .generate_itinerary("Lima", "05/04/2025", "05/04/2025", Budget::Alto, &[])
            .await
            .unwrap();

        assert_eq!(itinerary.days.len(), 1);
        assert_eq!(itinerary.cost.total, 300.0);
    }

    #[tokio::test]
    async fn test_itinerary_prefers_destination_inventory() {
        let engine = engine(
            vec![
                record("lima", "Museo Larco", "museo", "Pueblo Libre, Lima", 4.5),
                record("cusco", "Qorikancha", "museo", "Cusco", 4.8),
            ],
            no_favorites(),
        );

        let itinerary = engine
            .generate_itinerary("cusco", "01/03/2025", "02/03/2025", Budget::Moderado, &[])
            .await
            .unwrap();

        let used: Vec<String> = itinerary
            .days
            .iter()
            .flat_map(|d| d.activities.iter())
            .filter_map(|a| a.place.as_ref().map(|p| p.id.clone()))
            .collect();
        assert!(!used.is_empty());
        assert!(used.iter().all(|id| id == "cusco"));
    }

    #[tokio::test]
    async fn test_top_rated_includes_hotels_and_sorts() {
        let engine = engine(
            vec![
                record("h", "Hotel Bolívar", "hotel", "Lima", 4.9),
                record("c", "Café Tostado", "cafe", "Lima", 4.1),
                record("m", "Museo Larco", "museo", "Lima", 4.6),
            ],
            no_favorites(),
        );

        let ranked = engine.top_rated_nearby(HOME, 2.0, 2).await.unwrap();
        let ids: Vec<&str> = ranked.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["h", "m"]);
        assert_eq!(ranked[0].category, Category::Hotel);
    }

    #[tokio::test]
    async fn test_top_rated_survives_catalog_outage() {
        let mut provider = MockNearbySearchProvider::new();
        provider.expect_nearby_search().returning(|_, _, _| {
            Ok(vec![ProviderPlace {
                place_id: "ext-hotel".to_string(),
                name: "Hotel Country Club".to_string(),
                vicinity: Some("San Isidro".to_string()),
                geometry: ProviderGeometry {
                    location: ProviderLatLng {
                        lat: HOME.lat,
                        lng: HOME.lon,
                    },
                },
                types: vec!["lodging".to_string()],
                rating: Some(4.7),
                price_level: Some(4),
                user_ratings_total: None,
            }])
        });
        provider.expect_name().return_const("mock");

        let engine = engine_with(failing_catalog(), provider, no_favorites());
        let ranked = engine.top_rated_nearby(HOME, 2.0, 5).await.unwrap();

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].id, "ext-hotel");
        assert_eq!(ranked[0].category, Category::Hotel);
    }

    #[tokio::test]
    async fn test_top_rated_with_both_sources_down_is_no_candidates() {
        let mut provider = MockNearbySearchProvider::new();
        provider
            .expect_nearby_search()
            .returning(|_, _, _| Err(AppError::ExternalApi("OVER_QUERY_LIMIT".to_string())));
        provider.expect_name().return_const("mock");

        let engine = engine_with(failing_catalog(), provider, no_favorites());
        let err = engine.top_rated_nearby(HOME, 2.0, 5).await.unwrap_err();

        assert!(err.is_no_candidates());
    }
}
