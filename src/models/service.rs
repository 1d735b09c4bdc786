//! Bookable services (hotels, activities, meals, transfers, transport)

use std::fmt;

use chrono::NaiveTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceCategory {
    Hotel,
    Activity,
    Meal,
    Transfer,
    Transport,
}

impl ServiceCategory {
    pub const ALL: [ServiceCategory; 5] = [
        ServiceCategory::Hotel,
        ServiceCategory::Activity,
        ServiceCategory::Meal,
        ServiceCategory::Transfer,
        ServiceCategory::Transport,
    ];
}

impl fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServiceCategory::Hotel => "hotel",
            ServiceCategory::Activity => "activity",
            ServiceCategory::Meal => "meal",
            ServiceCategory::Transfer => "transfer",
            ServiceCategory::Transport => "transport",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
}

impl MealType {
    #[must_use]
    pub fn default_time(self) -> NaiveTime {
        match self {
            MealType::Breakfast => NaiveTime::from_hms_opt(8, 0, 0),
            MealType::Lunch => NaiveTime::from_hms_opt(13, 0, 0),
            MealType::Dinner => NaiveTime::from_hms_opt(19, 30, 0),
        }
        .unwrap_or(NaiveTime::MIN)
    }
}

/// Category-specific attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum ServiceDetails {
    Hotel {
        #[serde(default)]
        star_rating: Option<u8>,
        #[serde(default = "default_occupancy")]
        max_occupancy: u32,
        #[serde(default)]
        check_in: Option<NaiveTime>,
        #[serde(default)]
        included_meals: Vec<MealType>,
    },
    Activity {
        #[serde(default)]
        duration_minutes: Option<u32>,
        #[serde(default)]
        rating: Option<f32>,
        #[serde(default)]
        activity_type: Option<String>,
    },
    Meal {
        meal_type: MealType,
        #[serde(default)]
        cuisine: Option<String>,
        #[serde(default)]
        included_in_hotel: bool,
    },
    Transfer {
        #[serde(default)]
        vehicle_type: Option<String>,
        #[serde(default = "default_passengers")]
        max_passengers: u32,
    },
    Transport {
        mode: String,
        #[serde(default)]
        departure_city: Option<String>,
        #[serde(default)]
        service_class: Option<String>,
    },
}

fn default_occupancy() -> u32 {
    2
}

fn default_passengers() -> u32 {
    4
}

impl ServiceDetails {
    #[must_use]
    pub fn category(&self) -> ServiceCategory {
        match self {
            ServiceDetails::Hotel { .. } => ServiceCategory::Hotel,
            ServiceDetails::Activity { .. } => ServiceCategory::Activity,
            ServiceDetails::Meal { .. } => ServiceCategory::Meal,
            ServiceDetails::Transfer { .. } => ServiceCategory::Transfer,
            ServiceDetails::Transport { .. } => ServiceCategory::Transport,
        }
    }
}

/// A bookable unit offered in one destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub destination: String,
    /// Unit price
    pub cost: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(flatten)]
    pub details: ServiceDetails,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Service {
    #[must_use]
    pub fn category(&self) -> ServiceCategory {
        self.details.category()
    }

    #[must_use]
    pub fn meal_type(&self) -> Option<MealType> {
        match self.details {
            ServiceDetails::Meal { meal_type, .. } => Some(meal_type),
            _ => None,
        }
    }

    #[must_use]
    pub fn star_rating(&self) -> Option<u8> {
        match self.details {
            ServiceDetails::Hotel { star_rating, .. } => star_rating,
            _ => None,
        }
    }

    /// Whether the unit price is quoted in `currency`
    #[must_use]
    pub fn priced_in(&self, currency: &str) -> bool {
        self.currency.trim().eq_ignore_ascii_case(currency.trim())
    }

    /// Units to book so the whole party is covered
    #[must_use]
    pub fn units_for(&self, passengers: u32) -> u32 {
        let passengers = passengers.max(1);
        match self.details {
            ServiceDetails::Hotel { max_occupancy, .. } => passengers.div_ceil(max_occupancy.max(1)),
            ServiceDetails::Transfer { max_passengers, .. } => {
                passengers.div_ceil(max_passengers.max(1))
            }
            ServiceDetails::Activity { .. }
            | ServiceDetails::Meal { .. }
            | ServiceDetails::Transport { .. } => passengers,
        }
    }
}
