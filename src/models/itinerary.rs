use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Place;

/// Date format used by the caller contract
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Fixed time slots of an itinerary day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Morning,
    Lunch,
    Afternoon,
    Dinner,
    Evening,
}

impl Slot {
    pub fn start_time(&self) -> &'static str {
        match self {
            Slot::Morning => "09:00",
            Slot::Lunch => "13:00",
            Slot::Afternoon => "15:30",
            Slot::Dinner => "20:00",
            Slot::Evening => "21:30",
        }
    }
}

/// A single entry in a day: an excursion, a meal or free time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedItem {
    pub slot: Slot,
    pub time: String,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place: Option<Place>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayPlan {
    /// 1-based, contiguous
    pub day: u32,
    pub date: NaiveDate,
    pub title: String,
    pub activities: Vec<PlannedItem>,
    pub meals: Vec<PlannedItem>,
}

/// Rough budget split for the whole trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub per_day: f64,
    pub total: f64,
    pub lodging: f64,
    pub food: f64,
    pub activities: f64,
    pub transport: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Itinerary {
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: Vec<DayPlan>,
    pub cost: CostBreakdown,
    /// Human-readable rendering of `days` and `cost`
    pub text: String,
}
