use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{Category, GeoPoint, Place, Weather};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeOfDay {
    #[serde(rename = "mañana")]
    Manana,
    #[serde(rename = "tarde")]
    Tarde,
    #[serde(rename = "noche")]
    Noche,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Feliz,
    Triste,
    Aventurero,
    Relajado,
    Romantico,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Budget {
    Economico,
    Moderado,
    Alto,
}

impl Budget {
    /// Highest price level a place may have to stay in this tier
    pub fn max_price_level(&self) -> u8 {
        match self {
            Budget::Economico => 1,
            Budget::Moderado => 3,
            Budget::Alto => 4,
        }
    }

    /// Price levels that match this tier exactly
    pub fn ideal_price_levels(&self) -> std::ops::RangeInclusive<u8> {
        match self {
            Budget::Economico => 0..=1,
            Budget::Moderado => 2..=2,
            Budget::Alto => 3..=4,
        }
    }
}

/// Who the user is going out with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    Pareja,
    Familia,
    Amigos,
    Solo,
}

/// Quick-mode input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationRequest {
    pub user_location: GeoPoint,
    #[serde(default)]
    pub current_weather: Option<Weather>,
    pub time_of_day: TimeOfDay,
    pub user_id: String,
}

/// Mood-based input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonalizedRequest {
    pub user_location: GeoPoint,
    #[serde(default)]
    pub current_weather: Option<Weather>,
    pub time_of_day: TimeOfDay,
    pub user_id: String,
    pub mood: Mood,
    pub plan_type: PlanType,
    pub budget: Budget,
    /// How long the user wants to spend out
    pub duration_minutes: u32,
}

/// Engine output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecommendation {
    pub place: Place,
    /// 0.0 ..= 100.0
    pub score: f64,
    pub reason: String,
    pub distance_km: f64,
    pub estimated_duration_minutes: u32,
}

/// One stored favorite, as returned by the favorites store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct FavoriteRecord {
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub price_level: Option<i32>,
}

/// Profile derived from the user's favorites, rebuilt on every request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    /// Most frequent first
    pub favorite_categories: Vec<Category>,
    /// Most frequent first
    pub frequent_tags: Vec<String>,
    pub average_price_level: f64,
}

impl Default for UserContext {
    fn default() -> Self {
        Self {
            favorite_categories: Vec::new(),
            frequent_tags: Vec::new(),
            average_price_level: UserContext::DEFAULT_PRICE_LEVEL,
        }
    }
}

impl UserContext {
    const DEFAULT_PRICE_LEVEL: f64 = 2.0;
    const MAX_FREQUENT_TAGS: usize = 10;

    /// Builds the context from raw favorites
    pub fn from_favorites(favorites: &[FavoriteRecord]) -> Self {
        if favorites.is_empty() {
            return Self::default();
        }

        let mut category_counts: HashMap<Category, usize> = HashMap::new();
        let mut tag_counts: HashMap<String, usize> = HashMap::new();
        let mut prices = Vec::new();

        for favorite in favorites {
            let category = favorite
                .category
                .as_deref()
                .map(Category::from_label)
                .unwrap_or(Category::Otro);
            if category != Category::Otro {
                *category_counts.entry(category).or_default() += 1;
            }
            for tag in &favorite.tags {
                let tag = tag.trim().to_lowercase();
                if !tag.is_empty() {
                    *tag_counts.entry(tag).or_default() += 1;
                }
            }
            if let Some(price) = favorite.price_level {
                prices.push(Place::clamp_price_level(price as i64) as f64);
            }
        }

        let mut categories: Vec<(Category, usize)> = category_counts.into_iter().collect();
        categories.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let mut tags: Vec<(String, usize)> = tag_counts.into_iter().collect();
        tags.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let average_price_level = if prices.is_empty() {
            Self::DEFAULT_PRICE_LEVEL
        } else {
            prices.iter().sum::<f64>() / prices.len() as f64
        };

        Self {
            favorite_categories: categories.into_iter().map(|(c, _)| c).collect(),
            frequent_tags: tags
                .into_iter()
                .take(Self::MAX_FREQUENT_TAGS)
                .map(|(t, _)| t)
                .collect(),
            average_price_level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn favorite(category: &str, tags: &[&str], price: Option<i32>) -> FavoriteRecord {
        FavoriteRecord {
            category: Some(category.to_string()),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            price_level: price,
        }
    }

    #[test]
    fn test_time_of_day_serde() {
        assert_eq!(serde_json::to_string(&TimeOfDay::Manana).unwrap(), "\"mañana\"");
        let parsed: TimeOfDay = serde_json::from_str("\"noche\"").unwrap();
        assert_eq!(parsed, TimeOfDay::Noche);
    }

    #[test]
    fn test_empty_favorites_give_default_context() {
        let ctx = UserContext::from_favorites(&[]);
        assert!(ctx.favorite_categories.is_empty());
        assert!(ctx.frequent_tags.is_empty());
        assert_eq!(ctx.average_price_level, 2.0);
    }

    #[test]
    fn test_context_orders_by_frequency() {
        let favorites = vec![
            favorite("cafe", &["tranquilo"], Some(1)),
            favorite("museo", &["cultural", "tranquilo"], Some(2)),
            favorite("cafe", &["Tranquilo "], None),
        ];

        let ctx = UserContext::from_favorites(&favorites);
        assert_eq!(ctx.favorite_categories, vec![Category::Cafe, Category::Museo]);
        assert_eq!(ctx.frequent_tags[0], "tranquilo");
        assert_eq!(ctx.frequent_tags.len(), 2);
        assert_eq!(ctx.average_price_level, 1.5);
    }

    #[test]
    fn test_unknown_categories_are_ignored() {
        let ctx = UserContext::from_favorites(&[favorite("lavanderia", &[], None)]);
        assert!(ctx.favorite_categories.is_empty());
    }

    #[test]
    fn test_budget_bands() {
        assert_eq!(Budget::Economico.max_price_level(), 1);
        assert!(Budget::Alto.ideal_price_levels().contains(&4));
        assert!(!Budget::Moderado.ideal_price_levels().contains(&1));
    }
}
