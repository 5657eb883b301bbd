use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub mod context;
pub mod itinerary;
pub mod place;
pub mod route;

pub use context::{
    Budget, FavoriteRecord, Mood, PersonalizedRequest, PlanType, RecommendationRequest,
    ScoredRecommendation, TimeOfDay, UserContext,
};
pub use itinerary::{CostBreakdown, DayPlan, Itinerary, PlannedItem, Slot, DATE_FORMAT};
pub use place::{Category, GeoPoint, Place, PlaceSource, Weather};
pub use route::{RouteSummary, TravelMode};

// ============================================================================
// Curated catalog records
// ============================================================================

/// Raw curated-catalog row. Every descriptive field may be missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PlaceRecord {
    pub id: String,
    pub name: String,
    pub address: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub category: Option<String>,
    pub price_level: Option<i32>,
    pub rating: Option<f64>,
    pub tags: Option<Vec<String>>,
    pub weather_suitability: Option<Vec<String>>,
}

impl PlaceRecord {
    pub const DEFAULT_RATING: f64 = 4.0;
    pub const DEFAULT_PRICE_LEVEL: i32 = 2;
}

impl From<PlaceRecord> for Place {
    fn from(record: PlaceRecord) -> Self {
        let category = record
            .category
            .as_deref()
            .map(Category::from_label)
            .unwrap_or(Category::Otro);

        let weather_suitability: BTreeSet<Weather> = record
            .weather_suitability
            .unwrap_or_default()
            .iter()
            .filter_map(|w| Weather::from_label(w))
            .collect();

        // Records with no usable weather labels fall back to the category table
        let weather_suitability = if weather_suitability.is_empty() {
            category.weather_suitability()
        } else {
            weather_suitability
        };

        Place {
            id: record.id,
            name: record.name.trim().to_string(),
            address: record.address.unwrap_or_default(),
            location: GeoPoint::new(record.lat, record.lon),
            category,
            price_level: Place::clamp_price_level(
                record.price_level.unwrap_or(PlaceRecord::DEFAULT_PRICE_LEVEL) as i64,
            ),
            rating: Place::clamp_rating(record.rating.unwrap_or(PlaceRecord::DEFAULT_RATING)),
            tags: record
                .tags
                .unwrap_or_default()
                .into_iter()
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
            weather_suitability,
            source: PlaceSource::Catalog,
        }
    }
}

// ============================================================================
// Places provider API types
// ============================================================================

/// Nearby search response envelope
#[derive(Debug, Clone, Deserialize)]
pub struct NearbySearchResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<ProviderPlace>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// A single provider result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderPlace {
    pub place_id: String,
    pub name: String,
    #[serde(default)]
    pub vicinity: Option<String>,
    pub geometry: ProviderGeometry,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub price_level: Option<i64>,
    #[serde(default)]
    pub user_ratings_total: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderGeometry {
    pub location: ProviderLatLng,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProviderLatLng {
    pub lat: f64,
    pub lng: f64,
}
