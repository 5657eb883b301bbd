/// Upstream collaborators of the engine
///
/// Each data source the engine reads from sits behind a narrow trait so the
/// engine can be wired against Postgres, the Places API and a routing service
/// in production, and against fakes in tests.
use crate::{
    error::AppResult,
    models::{FavoriteRecord, GeoPoint, PlaceRecord, ProviderPlace, RouteSummary, TravelMode},
};

pub mod google_places;

pub use google_places::GooglePlacesProvider;

/// Third-party nearby places search
///
/// `ZERO_RESULTS` is an empty `Ok`. Any other non-OK status is an
/// `ExternalApi` error, which callers treat as an empty contribution.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait NearbySearchProvider: Send + Sync {
    async fn nearby_search(
        &self,
        location: GeoPoint,
        radius_meters: u32,
        types: &[String],
    ) -> AppResult<Vec<ProviderPlace>>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// The hand-maintained curated catalog
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_all(&self) -> AppResult<Vec<PlaceRecord>>;
}

/// A user's saved places, most recent first
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait FavoritesStore: Send + Sync {
    async fn list_favorites(&self, user_id: &str, limit: i64) -> AppResult<Vec<FavoriteRecord>>;
}

/// External routing service. The engine only caches its answers.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RouteProvider: Send + Sync {
    async fn compute_route(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        mode: TravelMode,
    ) -> AppResult<RouteSummary>;
}
