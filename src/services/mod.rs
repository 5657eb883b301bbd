pub mod aggregator;
pub mod catalog;
pub mod external_search;
pub mod itinerary;
pub mod providers;
pub mod recommendations;
pub mod routes;
pub mod scoring;

pub use aggregator::PlaceAggregator;
pub use catalog::PlaceCatalogSource;
pub use external_search::{CategoryStrategy, ExternalPlaceSearch, RankingStrategy, RecommendationStrategy};
pub use itinerary::ItineraryPlanner;
pub use recommendations::{EngineSettings, RecommendationEngine};
pub use routes::RouteService;
pub use scoring::ScoringEngine;
