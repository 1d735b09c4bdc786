//! Package matching: weighted multi-criteria scoring and ranking

pub mod criteria;
pub mod scorer;
pub mod selector;

pub use criteria::{Criterion, CriterionScore};
pub use scorer::{CriterionBreakdown, MatchResult, PackageScorer, ScoreBreakdown, ScoreSummary};
pub use selector::{AlternativePackage, MatchSelector, Selection, requirement_gaps};
