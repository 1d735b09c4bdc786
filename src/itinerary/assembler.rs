//! Day-wise itinerary assembly
//!
//! Splits the trip nights across destinations, books one lodging per night,
//! a transport leg on every transition day, and fills activity and meal slots
//! from the resolved candidates.

use std::collections::{BTreeMap, HashSet};

use chrono::{Duration, NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, warn};

use crate::advisory::AdvisoryResult;
use crate::catalog::ResolvedServices;
use crate::config::AssemblyConfig;
use crate::models::{
    DayPlan, MealType, Package, Requirement, Service, ServiceAssignment, ServiceCategory,
    ServiceDetails, cost_by_category,
};
use crate::{Result, TripMatchError};

const ACTIVITY_TIMES: [(u32, u32); 6] = [(10, 0), (15, 0), (17, 0), (11, 30), (16, 0), (18, 0)];

fn time(hour: u32, minute: u32) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Nights spent in one destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stay {
    pub destination: String,
    pub nights: u32,
    /// 1-based day on which the stay begins
    pub first_day: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Assembly {
    pub stays: Vec<Stay>,
    pub day_plans: Vec<DayPlan>,
    pub total_cost: Decimal,
    pub currency: String,
    pub cost_breakdown: BTreeMap<ServiceCategory, Decimal>,
    pub deficiencies: Vec<String>,
}

/// Night split per destination plus notes about dropped destinations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Apportionment {
    pub stays: Vec<(String, u32)>,
    pub notes: Vec<String>,
}

/// Split `nights` across destinations
///
/// The package's own allocation wins when it is positive and sums to
/// `nights`; otherwise nights are split evenly over the requested
/// destinations with the remainder on the first one.
#[must_use]
pub fn apportion_nights(requirement: &Requirement, package: &Package, nights: u32) -> Apportionment {
    let mut notes = Vec::new();

    let allocated = package.allocated_nights();
    if !package.destination_nights.is_empty() && allocated > 0 && allocated == nights {
        let mut stays = Vec::new();
        for stay in &package.destination_nights {
            if stay.nights == 0 {
                notes.push(format!(
                    "{} dropped: package allocates no nights there",
                    stay.destination
                ));
            } else {
                stays.push((stay.destination.clone(), stay.nights));
            }
        }
        return Apportionment { stays, notes };
    }

    if !package.destination_nights.is_empty() {
        debug!(
            allocated,
            nights, "Package night allocation does not fit the trip, splitting evenly"
        );
    }

    let destinations = &requirement.destinations;
    let count = u32::try_from(destinations.len()).unwrap_or(u32::MAX).max(1);
    let base = nights / count;
    let remainder = nights % count;

    let mut stays = Vec::new();
    for (index, destination) in destinations.iter().enumerate() {
        let share = if index == 0 { base + remainder } else { base };
        if share == 0 {
            notes.push(format!("{destination} dropped: not enough nights to visit"));
        } else {
            stays.push((destination.clone(), share));
        }
    }
    Apportionment { stays, notes }
}

/// Candidates quoted in the package currency
struct Inventory<'a> {
    resolved: &'a ResolvedServices,
    currency: &'a str,
}

impl<'a> Inventory<'a> {
    fn at(
        &self,
        destination: &str,
        category: ServiceCategory,
    ) -> impl Iterator<Item = &'a Service> + use<'a> {
        let currency = self.currency;
        self.resolved
            .at(destination, category)
            .filter(move |s| s.priced_in(currency))
    }

    /// One note per destination and foreign currency left out of the plan
    fn foreign_currency_notes(&self) -> Vec<String> {
        let mut skipped: BTreeMap<(&str, &str), usize> = BTreeMap::new();
        for service in self.resolved.all().filter(|s| !s.priced_in(self.currency)) {
            *skipped
                .entry((service.destination.as_str(), service.currency.as_str()))
                .or_default() += 1;
        }
        skipped
            .into_iter()
            .map(|((destination, currency), count)| {
                format!(
                    "{destination}: {count} service(s) priced in {currency} skipped, package is priced in {}",
                    self.currency
                )
            })
            .collect()
    }
}

/// Ordering preferences for candidate services
struct Preference<'a> {
    selected: HashSet<&'a str>,
    recommendation_text: String,
    desired_activities: Vec<&'a str>,
    preferred_stars: Option<u8>,
}

impl<'a> Preference<'a> {
    fn new(requirement: &'a Requirement, advisory: Option<&'a AdvisoryResult>) -> Self {
        let selected = advisory
            .map(|a| a.selected_ids().iter().map(String::as_str).collect())
            .unwrap_or_default();
        let recommendation_text = advisory
            .map(|a| a.customization_recommendations.join("\n").to_lowercase())
            .unwrap_or_default();
        Self {
            selected,
            recommendation_text,
            desired_activities: requirement
                .desired_activities
                .iter()
                .map(String::as_str)
                .collect(),
            preferred_stars: requirement.preferred_hotel_stars,
        }
    }

    fn rank(&self, service: &Service) -> u8 {
        let name = service.name.to_lowercase();
        if self.selected.contains(service.id.as_str()) {
            0
        } else if !self.recommendation_text.is_empty() && self.recommendation_text.contains(&name) {
            1
        } else if service.category() == ServiceCategory::Activity
            && self
                .desired_activities
                .iter()
                .any(|wanted| name.contains(wanted) || wanted.contains(name.as_str()))
        {
            2
        } else {
            3
        }
    }

    /// Stars missing from a hotel against the preferred rating, unrated counts as none
    fn star_shortfall(&self, service: &Service) -> u8 {
        match (self.preferred_stars, service.category()) {
            (Some(wanted), ServiceCategory::Hotel) => {
                wanted.saturating_sub(service.star_rating().unwrap_or(0))
            }
            _ => 0,
        }
    }

    /// Stable sort keeps cheapest-first within a rank
    fn order<'s>(&self, candidates: impl Iterator<Item = &'s Service>) -> Vec<&'s Service> {
        let mut ordered: Vec<&Service> = candidates.collect();
        ordered.sort_by_key(|s| (self.rank(s), self.star_shortfall(s)));
        ordered
    }
}

pub struct ItineraryAssembler {
    activities_per_day: usize,
    meals_per_day: usize,
}

impl ItineraryAssembler {
    #[must_use]
    pub fn new(config: &AssemblyConfig) -> Self {
        Self {
            activities_per_day: config.activities_per_day,
            meals_per_day: config.meals_per_day,
        }
    }

    pub fn assemble(
        &self,
        requirement: &Requirement,
        package: &Package,
        resolved: &ResolvedServices,
        advisory: Option<&AdvisoryResult>,
    ) -> Result<Assembly> {
        let nights = requirement.nights().unwrap_or(package.duration_nights);
        let apportionment = apportion_nights(requirement, package, nights);
        let mut deficiencies = apportionment.notes;
        let inventory = Inventory {
            resolved,
            currency: &package.currency,
        };
        deficiencies.extend(inventory.foreign_currency_notes());
        let preference = Preference::new(requirement, advisory);
        let pax = requirement.passenger_count;

        let mut stays = Vec::new();
        let mut next_day = 1;
        for (destination, stay_nights) in apportionment.stays {
            stays.push(Stay {
                destination,
                nights: stay_nights,
                first_day: next_day,
            });
            next_day += stay_nights;
        }
        if stays.is_empty() {
            // Same-day trip: a single day without lodging
            stays.push(Stay {
                destination: requirement
                    .destinations
                    .first()
                    .or_else(|| package.destinations.first())
                    .cloned()
                    .unwrap_or_default(),
                nights: 0,
                first_day: 1,
            });
        }

        let total_days = nights + 1;
        let mut day_plans: Vec<DayPlan> = (1..=total_days)
            .map(|day_index| DayPlan {
                day_index,
                date: day_date(requirement.start_date, day_index),
                destination: stay_for_day(&stays, day_index)
                    .map(|s| s.destination.clone())
                    .unwrap_or_default(),
                assignments: Vec::new(),
            })
            .collect();

        let mut hotels: Vec<Option<&Service>> = Vec::with_capacity(stays.len());
        for stay in &stays {
            if stay.nights == 0 {
                hotels.push(None);
                continue;
            }
            let hotel = preference
                .order(inventory.at(&stay.destination, ServiceCategory::Hotel))
                .into_iter()
                .next()
                .ok_or_else(|| {
                    TripMatchError::insufficient_inventory(format!(
                        "no lodging priced in {} available in {} for {} night(s)",
                        package.currency, stay.destination, stay.nights
                    ))
                })?;
            hotels.push(Some(hotel));
        }

        for (stay_index, stay) in stays.iter().enumerate() {
            let hotel = hotels[stay_index];
            let last_day = if stay_index + 1 == stays.len() {
                total_days
            } else {
                stay.first_day + stay.nights - 1
            };
            let mut used_activities: HashSet<&str> = HashSet::new();
            let mut used_meals: HashSet<&str> = HashSet::new();
            let mut unfilled_activities = 0;
            let mut unfilled_meals = 0;

            for day_index in stay.first_day..=last_day {
                let plan = &mut day_plans[(day_index - 1) as usize];
                let is_night = day_index < stay.first_day + stay.nights;

                if day_index == 1 {
                    if let Some(transfer) = inventory
                        .at(&stay.destination, ServiceCategory::Transfer)
                        .next()
                    {
                        plan.assignments.push(ServiceAssignment::priced(
                            transfer.clone(),
                            time(9, 0),
                            transfer.units_for(pax),
                        ));
                    }
                } else if day_index == stay.first_day {
                    match transition_service(&inventory, &preference, stay) {
                        Some(leg) => plan.assignments.push(ServiceAssignment::priced(
                            leg.clone(),
                            time(9, 0),
                            leg.units_for(pax),
                        )),
                        None => deficiencies.push(format!(
                            "Day {day_index}: no transport or transfer available into {}",
                            stay.destination
                        )),
                    }
                }

                if is_night {
                    if let Some(hotel) = hotel {
                        plan.assignments.push(ServiceAssignment::priced(
                            hotel.clone(),
                            check_in_time(hotel),
                            hotel.units_for(pax),
                        ));
                    }
                }

                let activities: Vec<&Service> = preference
                    .order(inventory.at(&stay.destination, ServiceCategory::Activity))
                    .into_iter()
                    .filter(|s| !used_activities.contains(s.id.as_str()))
                    .take(self.activities_per_day)
                    .collect();
                unfilled_activities += self.activities_per_day - activities.len();
                for (slot, activity) in activities.into_iter().enumerate() {
                    used_activities.insert(activity.id.as_str());
                    let (hour, minute) = ACTIVITY_TIMES[slot % ACTIVITY_TIMES.len()];
                    plan.assignments.push(ServiceAssignment::priced(
                        activity.clone(),
                        time(hour, minute),
                        activity.units_for(pax),
                    ));
                }

                // Breakfast comes from last night's hotel, later meals from tonight's
                let breakfast_hotel = if day_index > stay.first_day {
                    hotel
                } else if stay_index > 0 {
                    hotels[stay_index - 1]
                } else {
                    None
                };
                let evening_hotel = if is_night { hotel } else { None };

                for meal_type in meal_slots(self.meals_per_day) {
                    let covering_hotel = if *meal_type == MealType::Breakfast {
                        breakfast_hotel
                    } else {
                        evening_hotel
                    };
                    let hotel_includes = covering_hotel.is_some_and(|h| includes_meal(h, *meal_type));

                    let candidates = preference.order(
                        inventory
                            .at(&stay.destination, ServiceCategory::Meal)
                            .filter(|s| s.meal_type() == Some(*meal_type)),
                    );
                    let meal = candidates
                        .iter()
                        .find(|s| !used_meals.contains(s.id.as_str()))
                        .or_else(|| candidates.first())
                        .copied();

                    match meal {
                        Some(meal) => {
                            used_meals.insert(meal.id.as_str());
                            let quantity = meal.units_for(pax);
                            let assignment = if hotel_includes || flagged_included(meal) {
                                ServiceAssignment::included(
                                    meal.clone(),
                                    Some(meal_type.default_time()),
                                    quantity,
                                )
                            } else {
                                ServiceAssignment::priced(
                                    meal.clone(),
                                    Some(meal_type.default_time()),
                                    quantity,
                                )
                            };
                            plan.assignments.push(assignment);
                        }
                        None if hotel_includes => {}
                        None => unfilled_meals += 1,
                    }
                }
            }

            if unfilled_activities > 0 {
                deficiencies.push(format!(
                    "{}: {unfilled_activities} activity slot(s) left empty, not enough activities available",
                    stay.destination
                ));
            }
            if unfilled_meals > 0 {
                deficiencies.push(format!(
                    "{}: {unfilled_meals} meal slot(s) left empty, no matching meals available",
                    stay.destination
                ));
            }
        }

        for plan in &mut day_plans {
            plan.assignments
                .sort_by_key(|a| a.scheduled_time.unwrap_or(NaiveTime::MIN));
        }

        let total_cost = day_plans.iter().map(DayPlan::cost).sum();
        let cost_breakdown = cost_by_category(&day_plans);
        for note in &deficiencies {
            warn!(trip = %requirement.trip_reference, "{note}");
        }

        Ok(Assembly {
            stays,
            day_plans,
            total_cost,
            currency: package.currency.clone(),
            cost_breakdown,
            deficiencies,
        })
    }
}

fn day_date(start: Option<NaiveDate>, day_index: u32) -> Option<NaiveDate> {
    start.map(|s| s + Duration::days(i64::from(day_index) - 1))
}

fn stay_for_day(stays: &[Stay], day_index: u32) -> Option<&Stay> {
    stays
        .iter()
        .rev()
        .find(|s| s.first_day <= day_index)
}

/// Transport into the stay, falling back to a local transfer
fn transition_service<'s>(
    inventory: &Inventory<'s>,
    preference: &Preference<'_>,
    stay: &Stay,
) -> Option<&'s Service> {
    preference
        .order(inventory.at(&stay.destination, ServiceCategory::Transport))
        .into_iter()
        .next()
        .or_else(|| {
            preference
                .order(inventory.at(&stay.destination, ServiceCategory::Transfer))
                .into_iter()
                .next()
        })
}

fn check_in_time(hotel: &Service) -> Option<NaiveTime> {
    match &hotel.details {
        ServiceDetails::Hotel {
            check_in: Some(check_in),
            ..
        } => Some(*check_in),
        _ => time(14, 0),
    }
}

fn includes_meal(hotel: &Service, meal_type: MealType) -> bool {
    matches!(&hotel.details, ServiceDetails::Hotel { included_meals, .. } if included_meals.contains(&meal_type))
}

fn flagged_included(meal: &Service) -> bool {
    matches!(
        meal.details,
        ServiceDetails::Meal {
            included_in_hotel: true,
            ..
        }
    )
}

fn meal_slots(meals_per_day: usize) -> &'static [MealType] {
    match meals_per_day {
        0 => &[],
        1 => &[MealType::Dinner],
        2 => &[MealType::Lunch, MealType::Dinner],
        _ => &[MealType::Breakfast, MealType::Lunch, MealType::Dinner],
    }
}
