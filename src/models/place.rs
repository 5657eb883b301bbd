use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Display;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// A WGS84 coordinate pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle distance in kilometres (haversine)
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lon = (other.lon - self.lon).to_radians();
        let a = (d_lat / 2.0).sin().powi(2)
            + self.lat.to_radians().cos() * other.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_KM * c
    }

    /// Coordinates rounded to `decimals` places, formatted for cache keys
    pub fn rounded(&self, decimals: usize) -> String {
        let scale = 10f64.powi(decimals as i32);
        // + 0.0 normalizes -0.0
        let round = |v: f64| (v * scale).round() / scale + 0.0;
        format!("{:.*},{:.*}", decimals, round(self.lat), decimals, round(self.lon))
    }
}

/// Weather labels as reported by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weather {
    Soleado,
    Nublado,
    Lluvioso,
}

impl Weather {
    pub const ALL: [Weather; 3] = [Weather::Soleado, Weather::Nublado, Weather::Lluvioso];

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "soleado" | "sunny" | "clear" => Some(Weather::Soleado),
            "nublado" | "cloudy" => Some(Weather::Nublado),
            "lluvioso" | "rainy" | "rain" => Some(Weather::Lluvioso),
            _ => None,
        }
    }
}

/// Engine category model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Restaurante,
    Cafe,
    Bar,
    Discoteca,
    Parque,
    Museo,
    CentroComercial,
    Cine,
    AtraccionTuristica,
    Entretenimiento,
    Mirador,
    Playa,
    Hotel,
    Otro,
}

impl Category {
    /// Parses a curated-catalog label. Unknown labels become `Otro`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "restaurante" | "restaurant" | "comida" => Category::Restaurante,
            "cafe" | "café" | "cafeteria" | "cafetería" | "panaderia" | "panadería" => {
                Category::Cafe
            }
            "bar" => Category::Bar,
            "discoteca" | "nightclub" | "night_club" => Category::Discoteca,
            "parque" | "park" => Category::Parque,
            "museo" | "museum" | "galeria" | "galería" => Category::Museo,
            "centro_comercial" | "centro comercial" | "mall" => Category::CentroComercial,
            "cine" | "cinema" => Category::Cine,
            "atraccion_turistica" | "atracción turística" | "atraccion turistica" => {
                Category::AtraccionTuristica
            }
            "entretenimiento" | "entertainment" => Category::Entretenimiento,
            "mirador" | "viewpoint" => Category::Mirador,
            "playa" | "beach" => Category::Playa,
            "hotel" | "hospedaje" | "lodging" => Category::Hotel,
            _ => Category::Otro,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Restaurante => "restaurante",
            Category::Cafe => "cafe",
            Category::Bar => "bar",
            Category::Discoteca => "discoteca",
            Category::Parque => "parque",
            Category::Museo => "museo",
            Category::CentroComercial => "centro_comercial",
            Category::Cine => "cine",
            Category::AtraccionTuristica => "atraccion_turistica",
            Category::Entretenimiento => "entretenimiento",
            Category::Mirador => "mirador",
            Category::Playa => "playa",
            Category::Hotel => "hotel",
            Category::Otro => "otro",
        }
    }

    /// Weather labels a place of this category is comfortable in
    pub fn weather_suitability(&self) -> BTreeSet<Weather> {
        match self {
            Category::Parque
            | Category::Mirador
            | Category::Playa
            | Category::AtraccionTuristica => [Weather::Soleado, Weather::Nublado].into_iter().collect(),
            Category::Restaurante
            | Category::Cafe
            | Category::Bar
            | Category::Discoteca
            | Category::Museo
            | Category::CentroComercial
            | Category::Cine
            | Category::Entretenimiento
            | Category::Hotel
            | Category::Otro => Weather::ALL.into_iter().collect(),
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Where a place came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceSource {
    Catalog,
    External,
}

/// A point of interest
///
/// Created per request by the catalog or the external search and never
/// mutated afterwards; scoring only filters and copies it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub id: String,
    pub name: String,
    pub address: String,
    pub location: GeoPoint,
    pub category: Category,
    /// 0 (free) ..= 4 (very expensive)
    pub price_level: u8,
    /// 0.0 ..= 5.0
    pub rating: f64,
    pub tags: BTreeSet<String>,
    pub weather_suitability: BTreeSet<Weather>,
    pub source: PlaceSource,
}

impl Place {
    pub const MAX_PRICE_LEVEL: u8 = 4;
    pub const MAX_RATING: f64 = 5.0;

    pub fn clamp_rating(rating: f64) -> f64 {
        if rating.is_nan() {
            0.0
        } else {
            rating.clamp(0.0, Self::MAX_RATING)
        }
    }

    pub fn clamp_price_level(level: i64) -> u8 {
        level.clamp(0, Self::MAX_PRICE_LEVEL as i64) as u8
    }

    /// Deduplication key: trimmed, lowercased name
    pub fn normalized_name(&self) -> String {
        self.name.trim().to_lowercase()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn suits_weather(&self, weather: Weather) -> bool {
        self.weather_suitability.contains(&weather)
    }
}
