use std::sync::Arc;

use crate::{
    cached,
    db::{CacheKey, CacheLayer},
    error::{AppError, AppResult},
    models::{GeoPoint, RouteSummary, TravelMode},
    services::providers::RouteProvider,
};

/// Route lookups cached in the durable tier for 24 hours.
/// Origins and destinations within ~100 m share an entry.
pub struct RouteService {
    provider: Arc<dyn RouteProvider>,
    cache: Arc<CacheLayer>,
}

impl RouteService {
    pub fn new(provider: Arc<dyn RouteProvider>, cache: Arc<CacheLayer>) -> Self {
        Self { provider, cache }
    }

    #[tracing::instrument(skip(self))]
    pub async fn route(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        mode: TravelMode,
    ) -> AppResult<RouteSummary> {
        let key = CacheKey::Route {
            origin,
            destination,
            mode,
        };

        cached!(self.cache.routes, key, async {
            let route = self
                .provider
                .compute_route(origin, destination, mode)
                .await?;
            tracing::debug!(
                distance_km = route.distance_km,
                duration_minutes = route.duration_minutes,
                "Route computed upstream"
            );
            Ok::<_, AppError>(route)
        })
    }
}
