//! Individual scoring criteria
//!
//! Each criterion reports a fraction in `[0, 1]` together with a short
//! rationale. Weighting happens in the scorer.

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::models::{DateFlexibility, Package, Requirement};

/// Neutral fraction used when the requirement leaves a dimension unspecified
pub const NEUTRAL: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct CriterionScore {
    pub fraction: f64,
    pub rationale: String,
}

impl CriterionScore {
    fn new(fraction: f64, rationale: impl Into<String>) -> Self {
        Self {
            fraction: fraction.clamp(0.0, 1.0),
            rationale: rationale.into(),
        }
    }
}

pub trait Criterion: Send + Sync {
    /// Key used in the score breakdown
    fn name(&self) -> &'static str;

    /// Weight before redistribution
    fn base_weight(&self) -> f64;

    /// Whether the requirement gives this criterion anything to judge
    fn applies(&self, _requirement: &Requirement) -> bool {
        true
    }

    fn evaluate(&self, requirement: &Requirement, package: &Package) -> CriterionScore;
}

pub struct DestinationCriterion;

impl Criterion for DestinationCriterion {
    fn name(&self) -> &'static str {
        "destination"
    }

    fn base_weight(&self) -> f64 {
        30.0
    }

    fn evaluate(&self, requirement: &Requirement, package: &Package) -> CriterionScore {
        let requested = requirement.destinations.len();
        if requested == 0 {
            return CriterionScore::new(NEUTRAL, "No destinations requested");
        }
        let (matched, missing): (Vec<&String>, Vec<&String>) = requirement
            .destinations
            .iter()
            .partition(|d| package.covers_destination(d));

        #[allow(clippy::cast_precision_loss)]
        let fraction = matched.len() as f64 / requested as f64;
        let rationale = if missing.is_empty() {
            format!("All {requested} requested destination(s) covered")
        } else {
            format!(
                "{} of {requested} destination(s) covered, missing: {}",
                matched.len(),
                missing
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        };
        CriterionScore::new(fraction, rationale)
    }
}

pub struct DateCriterion;

impl Criterion for DateCriterion {
    fn name(&self) -> &'static str {
        "dates"
    }

    fn base_weight(&self) -> f64 {
        25.0
    }

    fn evaluate(&self, requirement: &Requirement, package: &Package) -> CriterionScore {
        if package.valid_to < package.valid_from {
            return CriterionScore::new(0.0, "Package has an empty validity window");
        }
        let (Some(start), Some(end)) = (requirement.start_date, requirement.end_date) else {
            return CriterionScore::new(NEUTRAL, "No travel dates specified");
        };

        let Some(tolerance) = requirement.date_flexibility.tolerance_days() else {
            return CriterionScore::new(
                1.0,
                format!(
                    "Fully flexible dates, package valid {} to {}",
                    package.valid_from, package.valid_to
                ),
            );
        };

        let fraction = best_overlap(start, end, package.valid_from, package.valid_to, tolerance);
        let rationale = if (fraction - 1.0).abs() < f64::EPSILON {
            if tolerance == 0 || fits(start, end, package.valid_from, package.valid_to) {
                "Travel dates fall within package validity".to_string()
            } else {
                format!(
                    "Travel dates fit package validity when shifted within {}",
                    flexibility_label(requirement.date_flexibility)
                )
            }
        } else if fraction > 0.0 {
            format!(
                "{:.0}% of the travel window overlaps package validity ({} to {})",
                fraction * 100.0,
                package.valid_from,
                package.valid_to
            )
        } else {
            format!(
                "Travel dates outside package validity ({} to {})",
                package.valid_from, package.valid_to
            )
        };
        CriterionScore::new(fraction, rationale)
    }
}

fn flexibility_label(flexibility: DateFlexibility) -> &'static str {
    match flexibility {
        DateFlexibility::Exact => "exact dates",
        DateFlexibility::Week => "the week",
        DateFlexibility::Month => "the month",
        DateFlexibility::Any => "any dates",
    }
}

fn fits(start: NaiveDate, end: NaiveDate, from: NaiveDate, to: NaiveDate) -> bool {
    start >= from && end <= to
}

/// Largest fraction of trip days inside validity over every shift in `[-t, t]`
fn best_overlap(start: NaiveDate, end: NaiveDate, from: NaiveDate, to: NaiveDate, t: i64) -> f64 {
    let trip_days = (end - start).num_days() + 1;
    (-t..=t)
        .map(|shift| {
            let s = start + Duration::days(shift);
            let e = end + Duration::days(shift);
            let overlap = (e.min(to) - s.max(from)).num_days() + 1;
            #[allow(clippy::cast_precision_loss)]
            let fraction = overlap.max(0) as f64 / trip_days as f64;
            fraction
        })
        .fold(0.0, f64::max)
}

pub struct ActivityCriterion;

impl Criterion for ActivityCriterion {
    fn name(&self) -> &'static str {
        "activities"
    }

    fn base_weight(&self) -> f64 {
        20.0
    }

    fn applies(&self, requirement: &Requirement) -> bool {
        !requirement.desired_activities.is_empty()
    }

    fn evaluate(&self, requirement: &Requirement, package: &Package) -> CriterionScore {
        if requirement.desired_activities.is_empty() {
            return CriterionScore::new(NEUTRAL, "No activities requested");
        }
        let inclusions: Vec<String> = package
            .inclusions
            .iter()
            .map(|i| i.trim().to_lowercase())
            .collect();
        let (found, missing): (Vec<&String>, Vec<&String>) =
            requirement.desired_activities.iter().partition(|wanted| {
                inclusions
                    .iter()
                    .any(|inc| inc.contains(wanted.as_str()) || wanted.contains(inc.as_str()))
            });

        #[allow(clippy::cast_precision_loss)]
        let fraction = found.len() as f64 / requirement.desired_activities.len() as f64;
        let rationale = if missing.is_empty() {
            "All requested activities included".to_string()
        } else {
            format!(
                "{} of {} activities included, missing: {}",
                found.len(),
                requirement.desired_activities.len(),
                missing
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        };
        CriterionScore::new(fraction, rationale)
    }
}

pub struct GroupSizeCriterion {
    pub margin: u32,
}

impl Criterion for GroupSizeCriterion {
    fn name(&self) -> &'static str {
        "group_size"
    }

    fn base_weight(&self) -> f64 {
        15.0
    }

    fn evaluate(&self, requirement: &Requirement, package: &Package) -> CriterionScore {
        let pax = requirement.passenger_count;
        let min = package.min_group_size;
        let max = package.max_group_size.max(min);
        if (min..=max).contains(&pax) {
            return CriterionScore::new(1.0, format!("Group of {pax} within {min}-{max}"));
        }
        let distance = if pax < min { min - pax } else { pax - max };
        let fraction = 1.0 - f64::from(distance) / f64::from(self.margin.max(1));
        CriterionScore::new(
            fraction,
            format!("Group of {pax} is {distance} outside {min}-{max}"),
        )
    }
}

pub struct BudgetCriterion {
    pub decay_factor: f64,
}

impl Criterion for BudgetCriterion {
    fn name(&self) -> &'static str {
        "budget"
    }

    fn base_weight(&self) -> f64 {
        10.0
    }

    fn evaluate(&self, requirement: &Requirement, package: &Package) -> CriterionScore {
        let Some(budget) = requirement.budget else {
            return CriterionScore::new(NEUTRAL, "No budget specified");
        };
        let total = package.total_cost(requirement.passenger_count);
        if total <= budget {
            let remaining = budget - total;
            let rationale = if remaining.is_zero() {
                format!("Package total {total} {} matches budget", package.currency)
            } else {
                format!(
                    "Package total {total} {} is {remaining} under budget",
                    package.currency
                )
            };
            return CriterionScore::new(1.0, rationale);
        }

        let over = total - budget;
        let factor = Decimal::try_from(self.decay_factor - 1.0).unwrap_or(Decimal::ONE);
        let allowance = budget.checked_mul(factor).unwrap_or(Decimal::MAX);
        // A quotient too large for Decimal is far past the allowance
        let fraction = match over.checked_div(allowance) {
            Some(ratio) => 1.0 - ratio.to_f64().unwrap_or(1.0),
            None => 0.0,
        };
        CriterionScore::new(
            fraction,
            format!(
                "Package total {total} {} exceeds budget by {over}",
                package.currency
            ),
        )
    }
}
