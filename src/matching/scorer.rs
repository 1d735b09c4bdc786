//! Weighted package scoring

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use super::criteria::{
    ActivityCriterion, BudgetCriterion, Criterion, DateCriterion, DestinationCriterion,
    GroupSizeCriterion,
};
use crate::config::ScoringConfig;
use crate::models::{Package, Requirement};
use crate::{Result, TripMatchError};

/// Score of one criterion after weighting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionBreakdown {
    pub raw_score: f64,
    pub max_score: f64,
    pub percentage: f64,
    pub rationale: String,
}

/// Per-criterion breakdown in evaluation order
///
/// Serializes as a JSON object keyed by criterion name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreBreakdown {
    entries: Vec<(String, CriterionBreakdown)>,
}

impl ScoreBreakdown {
    fn push(&mut self, name: &str, entry: CriterionBreakdown) {
        self.entries.push((name.to_string(), entry));
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CriterionBreakdown> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, entry)| entry)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CriterionBreakdown)> {
        self.entries.iter().map(|(key, entry)| (key.as_str(), entry))
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, e)| e.raw_score).sum()
    }
}

impl Serialize for ScoreBreakdown {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, entry) in &self.entries {
            map.serialize_entry(key, entry)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    pub package: Package,
    /// Weighted total in `[0, 100]`, two decimals
    pub total_score: f64,
    pub breakdown: ScoreBreakdown,
    /// None of the requested destinations is covered
    pub destination_mismatch: bool,
}

impl MatchResult {
    #[must_use]
    pub fn summary(&self) -> ScoreSummary {
        ScoreSummary {
            package_id: self.package.id.clone(),
            package_name: self.package.name.clone(),
            total_score: self.total_score,
        }
    }

    /// Percentage of the named criterion, `None` when it did not apply
    #[must_use]
    pub fn percentage(&self, criterion: &str) -> Option<f64> {
        self.breakdown.get(criterion).map(|e| e.percentage)
    }
}

/// Compact score row reported when nothing passes the floor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub package_id: String,
    pub package_name: String,
    pub total_score: f64,
}

pub struct PackageScorer {
    criteria: Vec<Box<dyn Criterion>>,
    min_score: f64,
}

impl PackageScorer {
    #[must_use]
    pub fn new(config: &ScoringConfig) -> Self {
        Self {
            criteria: vec![
                Box::new(DestinationCriterion),
                Box::new(DateCriterion),
                Box::new(ActivityCriterion),
                Box::new(GroupSizeCriterion {
                    margin: config.group_size_margin,
                }),
                Box::new(BudgetCriterion {
                    decay_factor: config.budget_decay_factor,
                }),
            ],
            min_score: config.min_score,
        }
    }

    /// Score one package; pure and deterministic
    #[must_use]
    pub fn score(&self, requirement: &Requirement, package: &Package) -> MatchResult {
        let applicable: Vec<&dyn Criterion> = self
            .criteria
            .iter()
            .map(|c| &**c)
            .filter(|c| c.applies(requirement))
            .collect();
        let weight_sum: f64 = applicable.iter().map(|c| c.base_weight()).sum();

        let mut breakdown = ScoreBreakdown::default();
        let mut destination_mismatch = false;
        for criterion in applicable {
            let weight = if weight_sum > 0.0 {
                criterion.base_weight() * 100.0 / weight_sum
            } else {
                0.0
            };
            let score = criterion.evaluate(requirement, package);
            if criterion.name() == "destination" && score.fraction == 0.0 {
                destination_mismatch = true;
            }
            breakdown.push(
                criterion.name(),
                CriterionBreakdown {
                    raw_score: round2(score.fraction * weight),
                    max_score: round2(weight),
                    percentage: round2(score.fraction * 100.0),
                    rationale: score.rationale,
                },
            );
        }

        MatchResult {
            package: package.clone(),
            total_score: round2(breakdown.total().clamp(0.0, 100.0)),
            breakdown,
            destination_mismatch,
        }
    }

    /// Score every package and keep those at or above the floor
    pub fn score_all(&self, requirement: &Requirement, packages: &[Package]) -> Result<Vec<MatchResult>> {
        let scored: Vec<MatchResult> = packages
            .iter()
            .map(|package| self.score(requirement, package))
            .collect();

        for result in &scored {
            tracing::debug!(
                package = %result.package.id,
                score = result.total_score,
                "Scored package"
            );
        }

        if scored.iter().all(|r| r.total_score < self.min_score) {
            let summaries = scored.iter().map(MatchResult::summary).collect();
            return Err(TripMatchError::no_suitable_match(summaries));
        }

        Ok(scored
            .into_iter()
            .filter(|r| r.total_score >= self.min_score)
            .collect())
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DateFlexibility, PackageStatus, Priority};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::collections::BTreeSet;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn requirement() -> Requirement {
        Requirement {
            trip_reference: "TRIP-1".to_string(),
            destinations: vec!["London".to_string()],
            start_date: Some(date(3, 15)),
            end_date: Some(date(3, 19)),
            date_flexibility: DateFlexibility::Exact,
            budget: Some(Decimal::from(5000)),
            passenger_count: 2,
            desired_activities: BTreeSet::from(["museum".to_string()]),
            priority: Priority::Medium,
            preferred_hotel_stars: None,
        }
    }

    fn package(id: &str, destination: &str) -> Package {
        Package {
            id: id.to_string(),
            name: format!("{destination} package"),
            code: None,
            destinations: vec![destination.to_string()],
            destination_nights: vec![],
            inclusions: vec!["Museum pass".to_string()],
            valid_from: date(1, 1),
            valid_to: date(12, 31),
            base_cost: Decimal::from(2000),
            currency: "GBP".to_string(),
            min_group_size: 1,
            max_group_size: 8,
            duration_days: 5,
            duration_nights: 4,
            hotel_stars: None,
            status: PackageStatus::Active,
        }
    }

    #[test]
    fn test_perfect_package_scores_100() {
        let scorer = PackageScorer::new(&ScoringConfig::default());
        let result = scorer.score(&requirement(), &package("P1", "London"));
        assert!((result.total_score - 100.0).abs() < 1e-9);
        assert!(!result.destination_mismatch);
        let names: Vec<&str> = result.breakdown.iter().map(|(k, _)| k).collect();
        assert_eq!(
            names,
            vec!["destination", "dates", "activities", "group_size", "budget"]
        );
    }

    #[test]
    fn test_destination_mismatch_flagged() {
        let scorer = PackageScorer::new(&ScoringConfig::default());
        let result = scorer.score(&requirement(), &package("P2", "Rome"));
        assert!(result.destination_mismatch);
        assert!((result.total_score - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_weights_redistributed_without_activities() {
        let mut requirement = requirement();
        requirement.desired_activities.clear();
        let scorer = PackageScorer::new(&ScoringConfig::default());
        let result = scorer.score(&requirement, &package("P1", "London"));
        assert!(result.breakdown.get("activities").is_none());
        assert!((result.total_score - 100.0).abs() < 1e-9);
        let destination = result.breakdown.get("destination").unwrap();
        assert!((destination.max_score - 37.5).abs() < 1e-9);
    }

    #[test]
    fn test_score_is_deterministic() {
        let scorer = PackageScorer::new(&ScoringConfig::default());
        let a = scorer.score(&requirement(), &package("P2", "Rome"));
        let b = scorer.score(&requirement(), &package("P2", "Rome"));
        assert_eq!(a.total_score, b.total_score);
        assert_eq!(a.breakdown, b.breakdown);
    }

    #[test]
    fn test_all_below_floor_is_no_suitable_match() {
        let config = ScoringConfig {
            min_score: 95.0,
            ..ScoringConfig::default()
        };
        let scorer = PackageScorer::new(&config);
        let err = scorer
            .score_all(&requirement(), &[package("P2", "Rome"), package("P3", "Oslo")])
            .unwrap_err();
        match err {
            TripMatchError::NoSuitableMatch { scores, .. } => {
                assert_eq!(scores.len(), 2);
                assert_eq!(scores[0].package_id, "P2");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_floor_filters_low_scores() {
        let config = ScoringConfig {
            min_score: 80.0,
            ..ScoringConfig::default()
        };
        let scorer = PackageScorer::new(&config);
        let kept = scorer
            .score_all(&requirement(), &[package("P1", "London"), package("P2", "Rome")])
            .unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].package.id, "P1");
    }

    #[test]
    fn test_breakdown_serializes_as_object() {
        let scorer = PackageScorer::new(&ScoringConfig::default());
        let result = scorer.score(&requirement(), &package("P1", "London"));
        let json = serde_json::to_value(&result.breakdown).unwrap();
        assert_eq!(json["budget"]["percentage"], 100.0);
    }
}
