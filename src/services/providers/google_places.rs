/// Google Places nearby search provider
///
/// API Flow:
/// 1. GET {api_url}/nearbysearch/json?location=lat,lng&radius=m[&type=t]&key=...
/// 2. Envelope `status` decides the outcome; `results` carries the places.
///
/// The endpoint accepts a single `type`. With several requested types the
/// parameter is omitted and the caller's allow-list does the narrowing.
use crate::{
    error::{AppError, AppResult},
    models::{GeoPoint, NearbySearchResponse, ProviderPlace},
    services::providers::NearbySearchProvider,
};
use reqwest::Client as HttpClient;
use std::time::Duration;

const STATUS_OK: &str = "OK";
const STATUS_ZERO_RESULTS: &str = "ZERO_RESULTS";

#[derive(Clone)]
pub struct GooglePlacesProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
}

impl GooglePlacesProvider {
    /// `timeout` bounds every request so a stalled provider cannot stall a recommendation
    pub fn new(api_key: String, api_url: String, timeout: Duration) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    fn build_query(
        &self,
        location: GeoPoint,
        radius_meters: u32,
        types: &[String],
    ) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("location", format!("{},{}", location.lat, location.lon)),
            ("radius", radius_meters.to_string()),
            ("key", self.api_key.clone()),
        ];
        if let [single] = types {
            query.push(("type", single.clone()));
        }
        query
    }
}

#[async_trait::async_trait]
impl NearbySearchProvider for GooglePlacesProvider {
    async fn nearby_search(
        &self,
        location: GeoPoint,
        radius_meters: u32,
        types: &[String],
    ) -> AppResult<Vec<ProviderPlace>> {
        let url = format!("{}/nearbysearch/json", self.api_url);

        let query = self.build_query(location, radius_meters, types);
        let response = self.http_client.get(&url).query(&query).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Places API returned HTTP {}: {}",
                status, body
            )));
        }

        let envelope: NearbySearchResponse = response.json().await?;
        let status = envelope.status.clone();
        let places = match status.as_str() {
            STATUS_OK => envelope.results,
            STATUS_ZERO_RESULTS => Vec::new(),
            other => {
                return Err(AppError::ExternalApi(format!(
                    "Places API returned status {}: {}",
                    other,
                    envelope.error_message.unwrap_or_default()
                )))
            }
        };

        tracing::info!(
            status = %status,
            results = places.len(),
            radius_meters,
            provider = "google_places",
            "Nearby search completed"
        );

        Ok(places)
    }

    fn name(&self) -> &'static str {
        "google_places"
    }
}
