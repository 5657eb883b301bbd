use rand::Rng;

use crate::{
    error::{AppError, AppResult},
    models::{
        Budget, Category, Mood, PersonalizedRequest, Place, PlanType, RecommendationRequest,
        ScoredRecommendation, TimeOfDay, UserContext, Weather,
    },
};

/// How many of the best-ranked places quick mode draws from
pub const QUICK_TOP_K: usize = 5;

/// Probability that quick mode returns the best-ranked place
pub const TOP_PICK_PROBABILITY: f64 = 0.7;

const NEUTRAL: f64 = 0.5;
const OFF_PEAK: f64 = 0.3;

/// Soft tags each mood looks for
pub fn mood_tags(mood: Mood) -> &'static [&'static str] {
    match mood {
        Mood::Feliz => &["divertido", "social", "fiesta", "entretenimiento"],
        Mood::Triste => &["tranquilo", "relajante", "acogedor", "naturaleza"],
        Mood::Aventurero => &["aventura", "emocionante", "único"],
        Mood::Relajado => &["tranquilo", "relajante", "naturaleza", "vista"],
        Mood::Romantico => &["romántico", "vista", "gastronomía", "tranquilo"],
    }
}

/// Categories that fit a time of day best
pub fn time_affinity(time: TimeOfDay) -> &'static [Category] {
    match time {
        TimeOfDay::Manana => &[
            Category::Cafe,
            Category::Parque,
            Category::Museo,
            Category::Mirador,
            Category::Playa,
        ],
        TimeOfDay::Tarde => &[
            Category::Restaurante,
            Category::CentroComercial,
            Category::Museo,
            Category::Parque,
            Category::Cine,
            Category::AtraccionTuristica,
            Category::Entretenimiento,
            Category::Playa,
        ],
        TimeOfDay::Noche => &[
            Category::Restaurante,
            Category::Bar,
            Category::Discoteca,
            Category::Cine,
        ],
    }
}

/// Minutes a visit usually takes
pub fn estimated_duration(category: Category) -> u32 {
    match category {
        Category::Restaurante => 90,
        Category::Cafe => 45,
        Category::Bar => 120,
        Category::Discoteca => 180,
        Category::Parque => 60,
        Category::Museo => 120,
        Category::CentroComercial => 120,
        Category::Cine => 150,
        Category::AtraccionTuristica => 90,
        Category::Entretenimiento => 180,
        Category::Mirador => 30,
        Category::Playa => 180,
        Category::Hotel => 0,
        Category::Otro => 60,
    }
}

pub fn time_fit(category: Category, time: TimeOfDay) -> f64 {
    match category {
        Category::Otro | Category::Hotel => NEUTRAL,
        c if time_affinity(time).contains(&c) => 1.0,
        _ => OFF_PEAK,
    }
}

pub fn weather_fit(place: &Place, weather: Option<Weather>) -> f64 {
    match weather {
        None => NEUTRAL,
        Some(w) if place.suits_weather(w) => 1.0,
        Some(_) => 0.0,
    }
}

/// 0.5 when the user has no favorites yet
pub fn favorite_fit(context: &UserContext, category: Category) -> f64 {
    if context.favorite_categories.is_empty() {
        NEUTRAL
    } else if context.favorite_categories.contains(&category) {
        1.0
    } else {
        0.0
    }
}

pub fn mood_overlap(place: &Place, mood: Mood) -> f64 {
    let wanted = mood_tags(mood);
    let matched = wanted.iter().filter(|t| place.has_tag(t)).count();
    matched as f64 / wanted.len().max(1) as f64
}

/// 1.0 inside the tier's ideal band, 0.5 one level away, else 0
pub fn budget_fit(budget: Budget, price_level: u8) -> f64 {
    let ideal = budget.ideal_price_levels();
    let gap = if price_level < *ideal.start() {
        ideal.start() - price_level
    } else {
        price_level.saturating_sub(*ideal.end())
    };
    match gap {
        0 => 1.0,
        1 => 0.5,
        _ => 0.0,
    }
}

pub fn quick_proximity(distance_km: f64) -> f64 {
    if distance_km < 2.0 {
        1.0
    } else if distance_km < 5.0 {
        0.8
    } else if distance_km < 10.0 {
        0.5
    } else {
        0.2
    }
}

pub fn personalized_proximity(distance_km: f64) -> f64 {
    if distance_km < 3.0 {
        1.0
    } else if distance_km < 7.0 {
        0.8
    } else if distance_km < 15.0 {
        0.5
    } else {
        0.2
    }
}

pub fn quick_score(
    place: &Place,
    request: &RecommendationRequest,
    context: &UserContext,
    distance_km: f64,
) -> f64 {
    let situational = 25.0 * time_fit(place.category, request.time_of_day)
        + 15.0 * weather_fit(place, request.current_weather);
    let score = situational
        + 30.0 * favorite_fit(context, place.category)
        + place.rating / Place::MAX_RATING * 20.0
        + 10.0 * quick_proximity(distance_km);
    score.clamp(0.0, 100.0)
}

pub fn personalized_score(
    place: &Place,
    request: &PersonalizedRequest,
    context: &UserContext,
    distance_km: f64,
) -> f64 {
    let score = 30.0 * mood_overlap(place, request.mood)
        + 25.0 * time_fit(place.category, request.time_of_day)
        + 20.0 * favorite_fit(context, place.category)
        + 15.0 * budget_fit(request.budget, place.price_level)
        + 10.0 * personalized_proximity(distance_km);
    score.clamp(0.0, 100.0)
}

/// Quick-mode hard filters: no nightlife in the morning, no parks in the rain
pub fn passes_quick_filters(place: &Place, request: &RecommendationRequest) -> bool {
    let nightlife = matches!(place.category, Category::Bar | Category::Discoteca);
    if request.time_of_day == TimeOfDay::Manana && nightlife {
        return false;
    }
    if request.current_weather == Some(Weather::Lluvioso) && place.category == Category::Parque {
        return false;
    }
    true
}

/// Budget ceiling and plan-type affinity
pub fn passes_personalized_filters(place: &Place, request: &PersonalizedRequest) -> bool {
    if place.price_level > request.budget.max_price_level() {
        return false;
    }
    match request.plan_type {
        PlanType::Pareja => {
            place.has_tag("romántico")
                || matches!(place.category, Category::Restaurante | Category::Cafe)
        }
        PlanType::Familia => {
            place.has_tag("familiar") || matches!(place.category, Category::Parque | Category::Museo)
        }
        PlanType::Amigos => matches!(
            place.category,
            Category::Bar | Category::Restaurante | Category::Parque
        ),
        PlanType::Solo => true,
    }
}

fn rating_phrase(rating: f64) -> Option<&'static str> {
    if rating >= 4.5 {
        Some("con excelentes reseñas")
    } else if rating >= 4.0 {
        Some("muy bien valorado")
    } else {
        None
    }
}

pub fn quick_reason(place: &Place, request: &RecommendationRequest) -> String {
    let mut parts = Vec::new();

    let time = match request.time_of_day {
        TimeOfDay::Manana => "mañana",
        TimeOfDay::Tarde => "tarde",
        TimeOfDay::Noche => "noche",
    };
    if time_fit(place.category, request.time_of_day) >= 1.0 {
        parts.push(format!("Perfecto para la {}", time));
    } else {
        parts.push(format!("Una opción para esta {}", time));
    }

    if let Some(weather) = request.current_weather.filter(|w| place.suits_weather(*w)) {
        parts.push(
            match weather {
                Weather::Soleado => "aprovechando el sol",
                Weather::Nublado => "ideal para un día nublado",
                Weather::Lluvioso => "a cubierto de la lluvia",
            }
            .to_string(),
        );
    }

    if let Some(phrase) = rating_phrase(place.rating) {
        parts.push(phrase.to_string());
    }

    format!("{}.", parts.join(", "))
}

pub fn personalized_reason(place: &Place, request: &PersonalizedRequest) -> String {
    let mood = match request.mood {
        Mood::Feliz => "Para celebrar tu buen ánimo",
        Mood::Triste => "Un lugar para reconfortarte",
        Mood::Aventurero => "Para tu espíritu aventurero",
        Mood::Relajado => "Para desconectar y relajarte",
        Mood::Romantico => "Con un ambiente romántico",
    };
    let plan = match request.plan_type {
        PlanType::Pareja => "ideal en pareja",
        PlanType::Familia => "pensado para la familia",
        PlanType::Amigos => "perfecto con amigos",
        PlanType::Solo => "para disfrutar a tu ritmo",
    };

    let mut parts = vec![mood.to_string(), plan.to_string()];
    if let Some(phrase) = rating_phrase(place.rating) {
        parts.push(phrase.to_string());
    }
    format!("{}.", parts.join(", "))
}

/// Ranks and selects among aggregated candidates
///
/// Holds the candidate list and the user's context for one request; both
/// modes filter first, score what survives, then sort descending (stable).
pub struct ScoringEngine<'a> {
    candidates: &'a [Place],
    context: &'a UserContext,
}

impl<'a> ScoringEngine<'a> {
    pub fn new(candidates: &'a [Place], context: &'a UserContext) -> Self {
        Self {
            candidates,
            context,
        }
    }

    /// All quick-mode survivors, best first
    pub fn rank_quick(&self, request: &RecommendationRequest) -> Vec<ScoredRecommendation> {
        let mut ranked: Vec<ScoredRecommendation> = self
            .candidates
            .iter()
            .filter(|p| passes_quick_filters(p, request))
            .map(|place| {
                let distance_km = request.user_location.distance_km(&place.location);
                ScoredRecommendation {
                    score: quick_score(place, request, self.context, distance_km),
                    reason: quick_reason(place, request),
                    distance_km,
                    estimated_duration_minutes: estimated_duration(place.category),
                    place: place.clone(),
                }
            })
            .collect();
        sort_descending(&mut ranked);
        ranked
    }

    /// All personalized survivors, best first
    pub fn rank_personalized(&self, request: &PersonalizedRequest) -> Vec<ScoredRecommendation> {
        let mut ranked: Vec<ScoredRecommendation> = self
            .candidates
            .iter()
            .filter(|p| passes_personalized_filters(p, request))
            .map(|place| {
                let distance_km = request.user_location.distance_km(&place.location);
                ScoredRecommendation {
                    score: personalized_score(place, request, self.context, distance_km),
                    reason: personalized_reason(place, request),
                    distance_km,
                    estimated_duration_minutes: estimated_duration(place.category)
                        .min(request.duration_minutes),
                    place: place.clone(),
                }
            })
            .collect();
        sort_descending(&mut ranked);
        ranked
    }

    /// Weighted-random pick among the top `QUICK_TOP_K`
    pub fn quick<R: Rng + ?Sized>(
        &self,
        request: &RecommendationRequest,
        rng: &mut R,
    ) -> AppResult<ScoredRecommendation> {
        let mut ranked = self.rank_quick(request);
        ranked.truncate(QUICK_TOP_K);
        select_weighted(ranked, rng).ok_or_else(|| {
            AppError::NoCandidates("no place passed the time and weather filters".to_string())
        })
    }

    /// Deterministic best match
    pub fn personalized(&self, request: &PersonalizedRequest) -> AppResult<ScoredRecommendation> {
        self.rank_personalized(request)
            .into_iter()
            .next()
            .ok_or_else(|| {
                AppError::NoCandidates("no place matched the budget and plan".to_string())
            })
    }
}

fn sort_descending(ranked: &mut [ScoredRecommendation]) {
    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// Takes the first item with probability `TOP_PICK_PROBABILITY`, otherwise a
/// uniformly random one of the rest. `None` only for an empty list.
pub fn select_weighted<T, R: Rng + ?Sized>(mut ranked: Vec<T>, rng: &mut R) -> Option<T> {
    if ranked.is_empty() {
        return None;
    }
    let index = if ranked.len() < 2 || rng.gen::<f64>() < TOP_PICK_PROBABILITY {
        0
    } else {
        rng.gen_range(1..ranked.len())
    };
    Some(ranked.swap_remove(index))
}
