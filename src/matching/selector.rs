//! Ranking of scored packages and preparation of alternatives

use std::cmp::Ordering;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::scorer::MatchResult;
use crate::config::ScoringConfig;
use crate::models::{Package, Requirement};
use crate::{Result, TripMatchError};

/// Criteria below this percentage are reported as gaps of an alternative
const GAP_THRESHOLD: f64 = 50.0;
/// Criteria below this percentage produce a score-based recommendation
const RECOMMENDATION_THRESHOLD: f64 = 30.0;
const MAX_RECOMMENDATIONS: usize = 5;

/// Runner-up package reported next to the best match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativePackage {
    pub package_id: String,
    pub package_name: String,
    pub match_score: f64,
    pub base_cost: Decimal,
    pub currency: String,
    pub main_gaps: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Selection {
    pub best: MatchResult,
    pub alternatives: Vec<AlternativePackage>,
}

pub struct MatchSelector {
    max_alternatives: usize,
}

impl MatchSelector {
    #[must_use]
    pub fn new(config: &ScoringConfig) -> Self {
        Self {
            max_alternatives: config.max_alternatives,
        }
    }

    /// Rank results and split them into the best match and its alternatives
    pub fn select(&self, mut scored: Vec<MatchResult>) -> Result<Selection> {
        scored.sort_by(rank);
        let mut ranked = scored.into_iter();
        let best = ranked
            .next()
            .ok_or_else(|| TripMatchError::no_suitable_match(Vec::new()))?;

        let alternatives = ranked
            .filter(|r| r.package.id != best.package.id)
            .take(self.max_alternatives)
            .map(|r| AlternativePackage {
                main_gaps: main_gaps(&r),
                package_id: r.package.id,
                package_name: r.package.name,
                match_score: r.total_score,
                base_cost: r.package.base_cost,
                currency: r.package.currency,
            })
            .collect();

        Ok(Selection { best, alternatives })
    }

    /// Advisory recommendations first, then requirement and score-based ones, deduplicated
    #[must_use]
    pub fn recommendations(
        &self,
        requirement: &Requirement,
        best: &MatchResult,
        advisory: &[String],
    ) -> Vec<String> {
        let mut recommendations: Vec<String> = Vec::new();
        let upgrade = star_shortfall(requirement, &best.package)
            .map(|(wanted, _)| format!("Upgrade hotels to {wanted}-star rating"));
        let score_based = best
            .breakdown
            .iter()
            .filter(|(_, entry)| entry.percentage < RECOMMENDATION_THRESHOLD)
            .filter_map(|(name, _)| score_recommendation(name))
            .map(str::to_string);

        for recommendation in advisory
            .iter()
            .map(|r| r.trim().to_string())
            .chain(upgrade)
            .chain(score_based)
        {
            if recommendation.is_empty() {
                continue;
            }
            if !recommendations.contains(&recommendation) {
                recommendations.push(recommendation);
            }
            if recommendations.len() == MAX_RECOMMENDATIONS {
                break;
            }
        }
        recommendations
    }
}

/// Shortfalls between the requirement and a package that no criterion scores
#[must_use]
pub fn requirement_gaps(requirement: &Requirement, package: &Package) -> Vec<String> {
    star_shortfall(requirement, package)
        .map(|(wanted, offered)| {
            format!("Customer prefers {wanted}-star hotels but package has {offered}-star")
        })
        .into_iter()
        .collect()
}

/// Preferred and offered stars when the package falls short
fn star_shortfall(requirement: &Requirement, package: &Package) -> Option<(u8, u8)> {
    let wanted = requirement.preferred_hotel_stars?;
    let offered = package.hotel_stars?;
    (wanted > offered).then_some((wanted, offered))
}

/// Score desc, then full destination coverage, then cheaper, then id
fn rank(a: &MatchResult, b: &MatchResult) -> Ordering {
    b.total_score
        .total_cmp(&a.total_score)
        .then_with(|| full_destination(b).cmp(&full_destination(a)))
        .then_with(|| a.package.base_cost.cmp(&b.package.base_cost))
        .then_with(|| a.package.id.cmp(&b.package.id))
}

fn full_destination(result: &MatchResult) -> bool {
    result
        .percentage("destination")
        .is_some_and(|pct| pct >= 100.0)
}

fn main_gaps(result: &MatchResult) -> Vec<String> {
    result
        .breakdown
        .iter()
        .filter(|(_, entry)| entry.percentage < GAP_THRESHOLD)
        .map(|(name, entry)| format!("{name}: {:.0}% match", entry.percentage))
        .collect()
}

fn score_recommendation(criterion: &str) -> Option<&'static str> {
    match criterion {
        "destination" => Some("Consider adding more destinations to match the trip requirements"),
        "dates" => {
            Some("Review date flexibility or consider alternative packages for the travel period")
        }
        "activities" => Some("Add custom activities to meet specific requirements"),
        "budget" => Some("Discuss budget adjustments or consider package modifications"),
        _ => None,
    }
}
