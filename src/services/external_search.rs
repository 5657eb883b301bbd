//! Nearby search against the external places provider.
//!
//! Provider taxonomy is mapped into the engine's `Category` model by one of
//! two strategies. `RecommendationStrategy` never lets lodging through;
//! `RankingStrategy` serves consumers that need the broader inventory and
//! maps lodging to `Category::Hotel`.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::{
    cached,
    db::{CacheKey, CacheLayer},
    error::{AppError, AppResult},
    models::{Category, GeoPoint, Place, PlaceRecord, PlaceSource, ProviderPlace},
    services::providers::NearbySearchProvider,
};

/// Provider types the recommendation path accepts (at least one required)
pub const ALLOWED_TYPES: &[&str] = &[
    "restaurant",
    "food",
    "meal_takeaway",
    "meal_delivery",
    "cafe",
    "bakery",
    "bar",
    "night_club",
    "park",
    "museum",
    "art_gallery",
    "aquarium",
    "zoo",
    "shopping_mall",
    "movie_theater",
    "tourist_attraction",
    "amusement_park",
    "bowling_alley",
];

/// Provider types that disqualify a result outright
pub const DENIED_TYPES: &[&str] = &[
    // lodging
    "lodging",
    // medical
    "hospital",
    "doctor",
    "dentist",
    "pharmacy",
    "physiotherapist",
    "veterinary_care",
    "health",
    // government
    "local_government_office",
    "city_hall",
    "courthouse",
    "embassy",
    "police",
    "fire_station",
    "post_office",
    // infrastructure
    "transit_station",
    "bus_station",
    "train_station",
    "subway_station",
    "light_rail_station",
    "airport",
    "parking",
    // religious
    "church",
    "mosque",
    "synagogue",
    "hindu_temple",
    "place_of_worship",
    "cemetery",
    "funeral_home",
    // automotive
    "car_dealer",
    "car_rental",
    "car_repair",
    "car_wash",
    "gas_station",
    // personal care
    "hair_care",
    "beauty_salon",
    "laundry",
    // services
    "bank",
    "atm",
    "insurance_agency",
    "real_estate_agency",
    "lawyer",
    "accounting",
    "storage",
    "school",
    "primary_school",
    "secondary_school",
    "university",
];

const LODGING: &str = "lodging";

/// First match wins
const CATEGORY_RULES: &[(&[&str], Category)] = &[
    (&["night_club"], Category::Discoteca),
    (&["bar"], Category::Bar),
    (
        &["restaurant", "food", "meal_takeaway", "meal_delivery"],
        Category::Restaurante,
    ),
    (&["cafe", "bakery"], Category::Cafe),
    (&["park"], Category::Parque),
    (&["museum", "art_gallery", "aquarium"], Category::Museo),
    (&["shopping_mall"], Category::CentroComercial),
    (&["movie_theater"], Category::Cine),
    (&["tourist_attraction"], Category::AtraccionTuristica),
    (
        &["amusement_park", "bowling_alley", "zoo"],
        Category::Entretenimiento,
    ),
];

fn has_any(types: &[String], wanted: &[&str]) -> bool {
    types.iter().any(|t| wanted.contains(&t.as_str()))
}

/// Recommendation-path category inference. Falls back to `Otro`.
pub fn infer_category(types: &[String]) -> Category {
    CATEGORY_RULES
        .iter()
        .find(|(wanted, _)| has_any(types, wanted))
        .map(|(_, category)| *category)
        .unwrap_or(Category::Otro)
}

/// Ranking-path category inference: lodging is a hotel, whatever else it is.
pub fn infer_category_for_ranking(types: &[String]) -> Category {
    if has_any(types, &[LODGING]) {
        Category::Hotel
    } else {
        infer_category(types)
    }
}

/// Static soft tags per category
pub fn category_tags(category: Category) -> &'static [&'static str] {
    match category {
        Category::Restaurante => &["gastronomía", "social"],
        Category::Cafe => &["tranquilo", "relajante", "acogedor"],
        Category::Bar => &["nocturno", "social", "divertido"],
        Category::Discoteca => &["nocturno", "fiesta", "emocionante", "divertido"],
        Category::Parque => &["naturaleza", "aire_libre", "familiar", "relajante"],
        Category::Museo => &["cultural", "educativo", "tranquilo", "familiar"],
        Category::CentroComercial => &["compras", "familiar", "entretenimiento"],
        Category::Cine => &["entretenimiento", "romántico", "familiar"],
        Category::AtraccionTuristica => &["turístico", "cultural", "único"],
        Category::Entretenimiento => &["divertido", "aventura", "emocionante", "familiar"],
        Category::Mirador => &["vista", "romántico", "aire_libre"],
        Category::Playa => &["naturaleza", "aire_libre", "relajante", "aventura"],
        Category::Hotel => &["hospedaje", "descanso"],
        Category::Otro => &[],
    }
}

/// Soft tags from the provider's own rating and price plus the category set.
/// Missing provider signals add no tag.
pub fn infer_tags(category: Category, rating: Option<f64>, price_level: Option<u8>) -> BTreeSet<String> {
    let mut tags: BTreeSet<String> = category_tags(category).iter().map(|t| t.to_string()).collect();
    match rating {
        Some(r) if r >= 4.5 => tags.insert("excelente".to_string()),
        Some(r) if r >= 4.0 => tags.insert("bueno".to_string()),
        Some(r) if r >= 3.5 => tags.insert("popular".to_string()),
        _ => false,
    };
    if let Some(level) = price_level {
        let tag = match level {
            0 | 1 => "economico",
            2 => "moderado",
            _ => "premium",
        };
        tags.insert(tag.to_string());
    }
    tags
}

/// How provider taxonomy becomes engine places
pub trait CategoryStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Deny-list then allow-list, before any mapping work
    fn accepts(&self, types: &[String]) -> bool;

    fn infer_category(&self, types: &[String]) -> Category;

    fn infer_tags(
        &self,
        category: Category,
        rating: Option<f64>,
        price_level: Option<u8>,
    ) -> BTreeSet<String>;

    fn cache_key(&self, location: GeoPoint, types: &[String]) -> CacheKey;
}

/// Default strategy for recommendations. Lodging never passes.
pub struct RecommendationStrategy;

impl CategoryStrategy for RecommendationStrategy {
    fn name(&self) -> &'static str {
        "recommendation"
    }

    fn accepts(&self, types: &[String]) -> bool {
        !has_any(types, DENIED_TYPES) && has_any(types, ALLOWED_TYPES)
    }

    fn infer_category(&self, types: &[String]) -> Category {
        infer_category(types)
    }

    fn infer_tags(
        &self,
        category: Category,
        rating: Option<f64>,
        price_level: Option<u8>,
    ) -> BTreeSet<String> {
        infer_tags(category, rating, price_level)
    }

    fn cache_key(&self, location: GeoPoint, types: &[String]) -> CacheKey {
        CacheKey::Nearby {
            location,
            types: types.to_vec(),
        }
    }
}

/// Broader strategy for ranking consumers. Lodging is allowed and surfaces as hotels.
pub struct RankingStrategy;

impl CategoryStrategy for RankingStrategy {
    fn name(&self) -> &'static str {
        "ranking"
    }

    fn accepts(&self, types: &[String]) -> bool {
        let denied = types.iter().any(|t| t != LODGING && DENIED_TYPES.contains(&t.as_str()));
        let allowed = has_any(types, ALLOWED_TYPES) || has_any(types, &[LODGING]);
        !denied && allowed
    }

    fn infer_category(&self, types: &[String]) -> Category {
        infer_category_for_ranking(types)
    }

    fn infer_tags(
        &self,
        category: Category,
        rating: Option<f64>,
        price_level: Option<u8>,
    ) -> BTreeSet<String> {
        let mut tags = infer_tags(category, rating, price_level);
        if category == Category::Hotel {
            tags.insert("hotel".to_string());
        }
        tags
    }

    fn cache_key(&self, location: GeoPoint, types: &[String]) -> CacheKey {
        CacheKey::RankingNearby {
            location,
            types: types.to_vec(),
        }
    }
}

/// Maps accepted provider results to places; rejected and `Otro` results are dropped
pub fn map_results(strategy: &dyn CategoryStrategy, results: Vec<ProviderPlace>) -> Vec<Place> {
    results
        .into_iter()
        .filter(|result| strategy.accepts(&result.types))
        .filter_map(|result| {
            let category = strategy.infer_category(&result.types);
            if category == Category::Otro {
                return None;
            }

            let price_level = result.price_level.map(Place::clamp_price_level);
            let rating = result.rating.map(Place::clamp_rating);
            let tags = strategy.infer_tags(category, rating, price_level);

            Some(Place {
                id: result.place_id,
                name: result.name.trim().to_string(),
                address: result.vicinity.unwrap_or_default(),
                location: GeoPoint::new(result.geometry.location.lat, result.geometry.location.lng),
                category,
                price_level: price_level
                    .unwrap_or(PlaceRecord::DEFAULT_PRICE_LEVEL as u8),
                rating: rating.unwrap_or(PlaceRecord::DEFAULT_RATING),
                tags,
                weather_suitability: category.weather_suitability(),
                source: PlaceSource::External,
            })
        })
        .collect()
}

/// External nearby search with a 30-minute memory cache in front of the provider
pub struct ExternalPlaceSearch {
    provider: Arc<dyn NearbySearchProvider>,
    cache: Arc<CacheLayer>,
}

impl ExternalPlaceSearch {
    pub fn new(provider: Arc<dyn NearbySearchProvider>, cache: Arc<CacheLayer>) -> Self {
        Self { provider, cache }
    }

    /// Recommendation inventory. Never contains lodging.
    pub async fn search_nearby(
        &self,
        location: GeoPoint,
        radius_meters: u32,
        types: &[String],
    ) -> AppResult<Vec<Place>> {
        self.search_with(&RecommendationStrategy, location, radius_meters, types)
            .await
    }

    /// Ranking inventory, hotels included
    pub async fn search_nearby_for_ranking(
        &self,
        location: GeoPoint,
        radius_meters: u32,
        types: &[String],
    ) -> AppResult<Vec<Place>> {
        self.search_with(&RankingStrategy, location, radius_meters, types)
            .await
    }

    async fn search_with(
        &self,
        strategy: &dyn CategoryStrategy,
        location: GeoPoint,
        radius_meters: u32,
        types: &[String],
    ) -> AppResult<Vec<Place>> {
        cached!(
            self.cache.external,
            strategy.cache_key(location, types),
            async move {
                let results = self
                    .provider
                    .nearby_search(location, radius_meters, types)
                    .await?;
                let fetched = results.len();
                let places = map_results(strategy, results);

                tracing::info!(
                    provider = self.provider.name(),
                    strategy = strategy.name(),
                    fetched,
                    kept = places.len(),
                    "External places mapped"
                );

                Ok::<_, AppError>(places)
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProviderGeometry, ProviderLatLng, Weather};
    use crate::services::providers::MockNearbySearchProvider;

    fn types(list: &[&str]) -> Vec<String> {
        list.iter().map(|t| t.to_string()).collect()
    }

    fn provider_place(id: &str, name: &str, kinds: &[&str]) -> ProviderPlace {
        ProviderPlace {
            place_id: id.to_string(),
            name: name.to_string(),
            vicinity: Some("Miraflores".to_string()),
            geometry: ProviderGeometry {
                location: ProviderLatLng {
                    lat: -12.12,
                    lng: -77.03,
                },
            },
            types: types(kinds),
            rating: Some(4.6),
            price_level: Some(1),
            user_ratings_total: Some(120),
        }
    }

    #[test]
    fn test_decision_list_priority() {
        assert_eq!(infer_category(&types(&["bar", "night_club"])), Category::Discoteca);
        assert_eq!(infer_category(&types(&["restaurant", "bar"])), Category::Bar);
        assert_eq!(infer_category(&types(&["cafe", "food"])), Category::Restaurante);
        assert_eq!(infer_category(&types(&["bakery"])), Category::Cafe);
        assert_eq!(infer_category(&types(&["museum", "park"])), Category::Parque);
        assert_eq!(infer_category(&types(&["aquarium"])), Category::Museo);
        assert_eq!(infer_category(&types(&["zoo"])), Category::Entretenimiento);
        assert_eq!(infer_category(&types(&["store"])), Category::Otro);
    }

    #[test]
    fn test_recommendation_inference_never_yields_hotel() {
        assert_eq!(
            infer_category(&types(&["lodging", "restaurant"])),
            Category::Restaurante
        );
        assert_eq!(infer_category(&types(&["lodging"])), Category::Otro);
    }

    #[test]
    fn test_ranking_inference_lodging_is_hotel() {
        for extra in [&[][..], &["night_club"][..], &["restaurant", "bar"][..], &["park"][..]] {
            let mut kinds = types(extra);
            kinds.push("lodging".to_string());
            assert_eq!(infer_category_for_ranking(&kinds), Category::Hotel);
        }
        assert_eq!(infer_category_for_ranking(&types(&["cafe"])), Category::Cafe);
    }

    #[test]
    fn test_denied_type_beats_allowed_type() {
        let strategy = RecommendationStrategy;
        assert!(!strategy.accepts(&types(&["restaurant", "lodging"])));
        assert!(!strategy.accepts(&types(&["museum", "church"])));
        assert!(!strategy.accepts(&types(&["point_of_interest", "establishment"])));
        assert!(strategy.accepts(&types(&["park", "point_of_interest"])));
    }

    #[test]
    fn test_ranking_strategy_allows_lodging_only() {
        let strategy = RankingStrategy;
        assert!(strategy.accepts(&types(&["lodging", "point_of_interest"])));
        assert!(!strategy.accepts(&types(&["lodging", "hospital"])));
    }

    #[test]
    fn test_tag_bands() {
        let tags = infer_tags(Category::Cafe, Some(4.5), Some(1));
        assert!(tags.contains("excelente"));
        assert!(tags.contains("economico"));
        assert!(tags.contains("tranquilo"));

        let tags = infer_tags(Category::Bar, Some(4.2), Some(2));
        assert!(tags.contains("bueno") && !tags.contains("excelente"));
        assert!(tags.contains("moderado"));

        let tags = infer_tags(Category::Bar, Some(3.6), Some(4));
        assert!(tags.contains("popular"));
        assert!(tags.contains("premium"));

        let tags = infer_tags(Category::Bar, Some(2.0), None);
        assert!(!tags.contains("popular"));
        assert!(!tags.iter().any(|t| t == "economico" || t == "moderado" || t == "premium"));
    }

    #[test]
    fn test_map_results_filters_and_maps() {
        let results = vec![
            provider_place("1", " La Lucha ", &["restaurant", "food"]),
            provider_place("2", "Hotel Central", &["lodging", "restaurant"]),
            provider_place("3", "Ferretería", &["hardware_store", "store"]),
            provider_place("4", "Parque Kennedy", &["park"]),
        ];

        let places = map_results(&RecommendationStrategy, results);
        let ids: Vec<&str> = places.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "4"]);

        assert_eq!(places[0].name, "La Lucha");
        assert_eq!(places[0].category, Category::Restaurante);
        assert_eq!(places[0].source, PlaceSource::External);
        assert!(!places[1].suits_weather(Weather::Lluvioso));
    }

    #[test]
    fn test_map_results_for_ranking_keeps_hotels() {
        let results = vec![provider_place("2", "Hotel Central", &["lodging", "restaurant"])];
        let places = map_results(&RankingStrategy, results);
        assert_eq!(places.len(), 1);
        assert_eq!(places[0].category, Category::Hotel);
        assert!(places[0].has_tag("hotel"));
    }

    #[test]
    fn test_missing_provider_signals_use_defaults() {
        let mut result = provider_place("1", "Sin datos", &["cafe"]);
        result.rating = None;
        result.price_level = None;

        let places = map_results(&RecommendationStrategy, vec![result]);
        assert_eq!(places[0].rating, 4.0);
        assert_eq!(places[0].price_level, 2);
        assert!(!places[0].has_tag("bueno"));
    }

    #[tokio::test]
    async fn test_search_nearby_caches_results() {
        let mut provider = MockNearbySearchProvider::new();
        provider
            .expect_nearby_search()
            .times(1)
            .returning(|_, _, _| Ok(vec![provider_place("1", "La Lucha", &["restaurant"])]));
        provider.expect_name().return_const("mock");

        let search = ExternalPlaceSearch::new(Arc::new(provider), Arc::new(CacheLayer::in_memory()));
        let kinds = types(&["restaurant"]);

        let first = search
            .search_nearby(GeoPoint::new(-12.1201, -77.0301), 2000, &kinds)
            .await
            .unwrap();
        // Rounds to the same key, served from cache
        let second = search
            .search_nearby(GeoPoint::new(-12.1249, -77.0349), 2000, &kinds)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
    }

    #[tokio::test]
    async fn test_provider_error_is_not_cached() {
        let mut provider = MockNearbySearchProvider::new();
        let mut calls = 0;
        provider.expect_nearby_search().times(2).returning(move |_, _, _| {
            calls += 1;
            if calls == 1 {
                Err(AppError::ExternalApi("OVER_QUERY_LIMIT".to_string()))
            } else {
                Ok(vec![])
            }
        });
        provider.expect_name().return_const("mock");

        let search = ExternalPlaceSearch::new(Arc::new(provider), Arc::new(CacheLayer::in_memory()));
        let location = GeoPoint::new(-12.12, -77.03);

        assert!(search.search_nearby(location, 1000, &[]).await.is_err());
        assert!(search.search_nearby(location, 1000, &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ranking_and_recommendation_use_separate_cache_entries() {
        let mut provider = MockNearbySearchProvider::new();
        provider
            .expect_nearby_search()
            .times(2)
            .returning(|_, _, _| Ok(vec![provider_place("h", "Hotel Central", &["lodging"])]));
        provider.expect_name().return_const("mock");

        let search = ExternalPlaceSearch::new(Arc::new(provider), Arc::new(CacheLayer::in_memory()));
        let location = GeoPoint::new(-12.12, -77.03);

        let ranking = search
            .search_nearby_for_ranking(location, 1000, &[])
            .await
            .unwrap();
        let recommendation = search.search_nearby(location, 1000, &[]).await.unwrap();

        assert_eq!(ranking.len(), 1);
        assert!(recommendation.is_empty());
    }
}
