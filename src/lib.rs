//! Context-aware place recommendations with layered upstream caching.
//!
//! `RecommendationEngine` is the entry point: it merges a curated catalog
//! with an external places provider, scores candidates against time, weather,
//! mood, budget and the user's favorites, and plans multi-day itineraries.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use error::{AppError, AppResult};
