use std::collections::HashSet;
use std::fmt::Write as _;

use chrono::{Duration as ChronoDuration, NaiveDate};
use rand::{seq::SliceRandom, Rng};

use crate::models::{
    Budget, Category, CostBreakdown, DayPlan, Itinerary, Place, PlannedItem, Slot, DATE_FORMAT,
};

const LODGING_SHARE: f64 = 0.35;
const FOOD_SHARE: f64 = 0.30;
const ACTIVITIES_SHARE: f64 = 0.25;
const TRANSPORT_SHARE: f64 = 0.10;

/// Categories each filled slot draws from
fn slot_categories(slot: Slot) -> &'static [Category] {
    match slot {
        Slot::Morning => &[Category::Museo, Category::Parque, Category::Mirador],
        Slot::Lunch | Slot::Dinner => &[Category::Restaurante, Category::Cafe],
        Slot::Afternoon => &[Category::CentroComercial, Category::Museo, Category::Parque],
        Slot::Evening => &[],
    }
}

/// Daily spend for the budget tier, split over lodging, food, activities and transport
pub fn cost_breakdown(budget: Budget, num_days: u32) -> CostBreakdown {
    let per_day = match budget {
        Budget::Economico => 50.0,
        Budget::Moderado => 120.0,
        Budget::Alto => 300.0,
    };
    let total = per_day * num_days as f64;
    CostBreakdown {
        per_day,
        total,
        lodging: total * LODGING_SHARE,
        food: total * FOOD_SHARE,
        activities: total * ACTIVITIES_SHARE,
        transport: total * TRANSPORT_SHARE,
    }
}

/// Builds day-by-day plans from categorized inventory
///
/// Day 1 opens with the arrival instead of a morning excursion, the last day
/// has no evening free time, and a slot with no matching inventory is left
/// out. Places are not repeated while unused candidates remain.
pub struct ItineraryPlanner<'a> {
    destination: &'a str,
    catalog: &'a [Place],
    budget: Budget,
    interests: Vec<String>,
}

impl<'a> ItineraryPlanner<'a> {
    pub fn new(destination: &'a str, catalog: &'a [Place], budget: Budget, interests: &[String]) -> Self {
        Self {
            destination,
            catalog,
            budget,
            interests: interests
                .iter()
                .map(|i| i.trim().to_lowercase())
                .filter(|i| !i.is_empty())
                .collect(),
        }
    }

    pub fn generate<R: Rng + ?Sized>(
        &self,
        start_date: NaiveDate,
        num_days: u32,
        rng: &mut R,
    ) -> Itinerary {
        let mut used: HashSet<&str> = HashSet::new();
        let mut days = Vec::with_capacity(num_days as usize);

        for day in 1..=num_days {
            let date = start_date + ChronoDuration::days(i64::from(day - 1));
            days.push(self.plan_day(day, num_days, date, &mut used, rng));
        }

        let end_date = start_date + ChronoDuration::days(i64::from(num_days.saturating_sub(1)));
        let cost = cost_breakdown(self.budget, num_days);
        let text = render(self.destination, start_date, end_date, &days, &cost);

        Itinerary {
            destination: self.destination.to_string(),
            start_date,
            end_date,
            days,
            cost,
            text,
        }
    }

    fn plan_day<R: Rng + ?Sized>(
        &self,
        day: u32,
        num_days: u32,
        date: NaiveDate,
        used: &mut HashSet<&'a str>,
        rng: &mut R,
    ) -> DayPlan {
        let first = day == 1;
        let last = day == num_days;
        let mut activities = Vec::new();
        let mut meals = Vec::new();

        if first {
            activities.push(PlannedItem {
                slot: Slot::Morning,
                time: Slot::Morning.start_time().to_string(),
                title: format!("Llegada a {}", self.destination),
                description: "Llegada, registro en el alojamiento y primer paseo por la zona".to_string(),
                place: None,
            });
        } else if let Some(place) = self.pick(Slot::Morning, used, rng) {
            activities.push(place_item(Slot::Morning, format!("Visita a {}", place.name), place));
        }

        if let Some(place) = self.pick(Slot::Lunch, used, rng) {
            meals.push(place_item(Slot::Lunch, format!("Almuerzo en {}", place.name), place));
        }

        if let Some(place) = self.pick(Slot::Afternoon, used, rng) {
            activities.push(place_item(Slot::Afternoon, format!("Tarde en {}", place.name), place));
        }

        if let Some(place) = self.pick(Slot::Dinner, used, rng) {
            meals.push(place_item(Slot::Dinner, format!("Cena en {}", place.name), place));
        }

        if !last {
            activities.push(PlannedItem {
                slot: Slot::Evening,
                time: Slot::Evening.start_time().to_string(),
                title: "Tiempo libre".to_string(),
                description: format!("Paseo nocturno por {} a tu aire", self.destination),
                place: None,
            });
        }

        let title = if first {
            format!("Día {}: Llegada a {}", day, self.destination)
        } else if last {
            format!("Día {}: Último día en {}", day, self.destination)
        } else {
            format!("Día {}: Explorando {}", day, self.destination)
        };

        DayPlan {
            day,
            date,
            title,
            activities,
            meals,
        }
    }

    /// Unused places first, then interest matches, then a uniform category and a uniform place
    fn pick<R: Rng + ?Sized>(
        &self,
        slot: Slot,
        used: &mut HashSet<&'a str>,
        rng: &mut R,
    ) -> Option<&'a Place> {
        let categories = slot_categories(slot);
        let mut pool: Vec<&'a Place> = self
            .catalog
            .iter()
            .filter(|p| categories.contains(&p.category))
            .collect();

        let unused: Vec<&'a Place> = pool.iter().copied().filter(|p| !used.contains(p.id.as_str())).collect();
        if !unused.is_empty() {
            pool = unused;
        }

        let interesting: Vec<&'a Place> = pool
            .iter()
            .copied()
            .filter(|p| {
                self.interests.iter().any(|interest| {
                    p.has_tag(interest)
                        || (p.category != Category::Otro && Category::from_label(interest) == p.category)
                })
            })
            .collect();
        if !interesting.is_empty() {
            pool = interesting;
        }

        let available: Vec<Category> = categories
            .iter()
            .copied()
            .filter(|c| pool.iter().any(|p| p.category == *c))
            .collect();
        let category = *available.choose(rng)?;

        let candidates: Vec<&'a Place> = pool.into_iter().filter(|p| p.category == category).collect();
        let place = *candidates.choose(rng)?;

        used.insert(place.id.as_str());
        Some(place)
    }
}

fn place_item(slot: Slot, title: String, place: &Place) -> PlannedItem {
    let description = if place.address.is_empty() {
        place.category.label().replace('_', " ")
    } else {
        format!("{} en {}", place.category.label().replace('_', " "), place.address)
    };

    PlannedItem {
        slot,
        time: slot.start_time().to_string(),
        title,
        description,
        place: Some(place.clone()),
    }
}

/// Plain-text rendering of the structured plan
pub fn render(
    destination: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
    days: &[DayPlan],
    cost: &CostBreakdown,
) -> String {
    let mut text = String::new();
    let _ = writeln!(
        text,
        "Itinerario para {} ({} - {})",
        destination,
        start_date.format(DATE_FORMAT),
        end_date.format(DATE_FORMAT)
    );

    for day in days {
        let _ = writeln!(text);
        let _ = writeln!(text, "{} ({})", day.title, day.date.format(DATE_FORMAT));

        let mut items: Vec<&PlannedItem> = day.activities.iter().chain(day.meals.iter()).collect();
        items.sort_by(|a, b| a.time.cmp(&b.time));
        for item in items {
            let _ = writeln!(text, "  {} {}: {}", item.time, item.title, item.description);
        }
    }

    let _ = writeln!(text);
    let _ = writeln!(
        text,
        "Presupuesto estimado: {:.2} ({:.2} por día)",
        cost.total, cost.per_day
    );
    let _ = writeln!(text, "  Alojamiento: {:.2}", cost.lodging);
    let _ = writeln!(text, "  Comida: {:.2}", cost.food);
    let _ = writeln!(text, "  Actividades: {:.2}", cost.activities);
    let _ = write!(text, "  Transporte: {:.2}", cost.transport);

    text
}
