//! Day-wise itinerary records produced by the assembler and writer

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Service, ServiceCategory};

/// One service booked on one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceAssignment {
    pub service: Service,
    pub scheduled_time: Option<NaiveTime>,
    pub quantity: u32,
    pub cost: Decimal,
    #[serde(default)]
    pub included_in_hotel: bool,
}

impl ServiceAssignment {
    /// Book `quantity` units at the service's unit price
    #[must_use]
    pub fn priced(service: Service, scheduled_time: Option<NaiveTime>, quantity: u32) -> Self {
        let cost = service.cost * Decimal::from(quantity);
        Self {
            service,
            scheduled_time,
            quantity,
            cost,
            included_in_hotel: false,
        }
    }

    /// Meal covered by the hotel rate
    #[must_use]
    pub fn included(service: Service, scheduled_time: Option<NaiveTime>, quantity: u32) -> Self {
        Self {
            service,
            scheduled_time,
            quantity,
            cost: Decimal::ZERO,
            included_in_hotel: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayPlan {
    /// 1-based
    pub day_index: u32,
    pub date: Option<NaiveDate>,
    pub destination: String,
    pub assignments: Vec<ServiceAssignment>,
}

impl DayPlan {
    #[must_use]
    pub fn cost(&self) -> Decimal {
        self.assignments.iter().map(|a| a.cost).sum()
    }
}

/// Booked cost per service category; hotel-included meals count as zero
#[must_use]
pub fn cost_by_category(day_plans: &[DayPlan]) -> BTreeMap<ServiceCategory, Decimal> {
    let mut breakdown = BTreeMap::new();
    for assignment in day_plans.iter().flat_map(|p| p.assignments.iter()) {
        *breakdown
            .entry(assignment.service.category())
            .or_insert(Decimal::ZERO) += assignment.cost;
    }
    breakdown
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItineraryStatus {
    Draft,
    Confirmed,
    Cancelled,
}

/// Advisory findings and assembly deficiencies attached to an itinerary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryNotes {
    pub alignment_score: Option<u8>,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub gaps: Vec<String>,
    #[serde(default)]
    pub customization_recommendations: Vec<String>,
    #[serde(default)]
    pub risk_factors: Vec<String>,
    pub advisory_error: Option<String>,
    #[serde(default)]
    pub deficiencies: Vec<String>,
}

/// Persisted itinerary record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Itinerary {
    pub id: String,
    pub trip_reference: String,
    pub package_id: String,
    pub version: u32,
    pub status: ItineraryStatus,
    pub total_cost: Decimal,
    pub currency: String,
    #[serde(default)]
    pub cost_breakdown: BTreeMap<ServiceCategory, Decimal>,
    pub day_plans: Vec<DayPlan>,
    pub advisory_notes: AdvisoryNotes,
    pub created_at: DateTime<Utc>,
}

impl Itinerary {
    /// Recompute the total from the assignments
    #[must_use]
    pub fn assignments_total(&self) -> Decimal {
        self.day_plans.iter().map(DayPlan::cost).sum()
    }
}
