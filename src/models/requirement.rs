//! Trip requirement model and normalization from CRM trip records

use std::collections::BTreeSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Result, TripMatchError};

/// Read-only view of a customer trip record as exposed by the CRM
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TripRecord {
    pub reference: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub destinations: Vec<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Free-text flexibility label, e.g. "Within the week"
    #[serde(default)]
    pub flexible_days: Option<String>,
    #[serde(default)]
    pub pax: Option<u32>,
    #[serde(default)]
    pub passenger_details: Vec<PassengerDetail>,
    #[serde(default)]
    pub budget: Option<Decimal>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub activities: Vec<String>,
    /// e.g. "4 Star"
    #[serde(default)]
    pub preferred_hotel_star_rating: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PassengerDetail {
    pub name: String,
    #[serde(default)]
    pub age: Option<u32>,
}

/// How far the requested travel dates may drift
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFlexibility {
    /// Exact dates, no drift
    Exact,
    /// Within the week (±3 days)
    Week,
    /// Within the month (±15 days)
    Month,
    /// Fully flexible
    Any,
}

impl DateFlexibility {
    /// Tolerance in days, `None` for fully flexible
    #[must_use]
    pub fn tolerance_days(self) -> Option<i64> {
        match self {
            DateFlexibility::Exact => Some(0),
            DateFlexibility::Week => Some(3),
            DateFlexibility::Month => Some(15),
            DateFlexibility::Any => None,
        }
    }

    /// Parse the CRM label; unknown labels fall back to exact dates
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "within the week" | "week" | "±3d" | "+-3d" => DateFlexibility::Week,
            "within the month" | "month" | "±15d" | "+-15d" => DateFlexibility::Month,
            "fully flexible" | "any" | "flexible" => DateFlexibility::Any,
            _ => DateFlexibility::Exact,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "low" => Priority::Low,
            "high" => Priority::High,
            "urgent" => Priority::Urgent,
            _ => Priority::Medium,
        }
    }
}

/// Normalized customer requirement used as matching input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    pub trip_reference: String,
    /// Ordered, de-duplicated destination names
    pub destinations: Vec<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub date_flexibility: DateFlexibility,
    /// `None` when the customer did not state a budget
    pub budget: Option<Decimal>,
    pub passenger_count: u32,
    /// Lower-cased activity names
    pub desired_activities: BTreeSet<String>,
    pub priority: Priority,
    pub preferred_hotel_stars: Option<u8>,
}

impl Requirement {
    /// Normalize and validate a trip record
    pub fn from_trip(trip: &TripRecord) -> Result<Self> {
        let mut destinations: Vec<String> = Vec::new();
        for raw in &trip.destinations {
            let name = raw.trim();
            if name.is_empty() {
                continue;
            }
            if !destinations.iter().any(|d| d.eq_ignore_ascii_case(name)) {
                destinations.push(name.to_string());
            }
        }
        if destinations.is_empty() {
            return Err(TripMatchError::validation(format!(
                "trip {} has no destinations",
                trip.reference
            )));
        }

        match (trip.start_date, trip.end_date) {
            (Some(start), Some(end)) if end < start => {
                return Err(TripMatchError::validation(format!(
                    "end date {end} is before start date {start}"
                )));
            }
            (Some(_), None) | (None, Some(_)) => {
                return Err(TripMatchError::validation(
                    "start and end dates must be given together",
                ));
            }
            _ => {}
        }

        if let Some(budget) = trip.budget {
            if budget.is_sign_negative() && !budget.is_zero() {
                return Err(TripMatchError::validation(format!(
                    "budget cannot be negative ({budget})"
                )));
            }
        }

        // The passenger list is authoritative; pax is the fallback head count
        let passenger_count = if trip.passenger_details.is_empty() {
            trip.pax.unwrap_or(0)
        } else {
            u32::try_from(trip.passenger_details.len()).unwrap_or(u32::MAX)
        };
        if passenger_count == 0 {
            return Err(TripMatchError::validation(
                "passenger count must be at least 1",
            ));
        }

        let desired_activities = trip
            .activities
            .iter()
            .map(|a| a.trim().to_lowercase())
            .filter(|a| !a.is_empty())
            .collect();

        Ok(Self {
            trip_reference: trip.reference.clone(),
            destinations,
            start_date: trip.start_date,
            end_date: trip.end_date,
            date_flexibility: trip
                .flexible_days
                .as_deref()
                .map_or(DateFlexibility::Exact, DateFlexibility::from_label),
            budget: trip.budget,
            passenger_count,
            desired_activities,
            priority: trip
                .priority
                .as_deref()
                .map_or(Priority::Medium, Priority::from_label),
            preferred_hotel_stars: trip
                .preferred_hotel_star_rating
                .as_deref()
                .and_then(parse_star_rating),
        })
    }

    /// Nights between the requested dates, when dates are known
    #[must_use]
    pub fn nights(&self) -> Option<u32> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => u32::try_from((end - start).num_days()).ok(),
            _ => None,
        }
    }

    /// Short human-readable summary used in prompts and logs
    #[must_use]
    pub fn summary(&self) -> String {
        let dates = match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => format!("{start} to {end}"),
            _ => "dates not fixed".to_string(),
        };
        let budget = self
            .budget
            .map_or_else(|| "no budget".to_string(), |b| format!("budget {b}"));
        format!(
            "{} for {} traveller(s), {dates} ({:?}), {budget}",
            self.destinations.join(", "),
            self.passenger_count,
            self.date_flexibility
        )
    }
}

fn parse_star_rating(label: &str) -> Option<u8> {
    label
        .split_whitespace()
        .next()
        .and_then(|s| s.trim_end_matches('*').parse::<u8>().ok())
        .filter(|stars| (1..=7).contains(stars))
}
