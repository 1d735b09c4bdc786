//! Advisory (external reasoning service) integration
//!
//! The advisory provider refines a selected package with strengths, gaps,
//! customization ideas and an optional pick of concrete services. Any
//! failure is reported as [`AdvisoryUnavailable`] and never fails a match.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{AdvisoryNotes, Package, Requirement, Service};

pub mod client;
pub mod prompt;

pub use client::HttpAdvisoryClient;

/// Structured recommendation returned by the advisory service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryResult {
    /// 0-100
    pub alignment_score: u8,
    pub strengths: Vec<String>,
    pub gaps: Vec<String>,
    pub customization_recommendations: Vec<String>,
    pub risk_factors: Vec<String>,
    /// Ids of candidate services the advisor would book
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_services: Option<Vec<String>>,
}

impl AdvisoryResult {
    #[must_use]
    pub fn selected_ids(&self) -> &[String] {
        self.selected_services.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub fn to_notes(&self) -> AdvisoryNotes {
        AdvisoryNotes {
            alignment_score: Some(self.alignment_score),
            strengths: self.strengths.clone(),
            gaps: self.gaps.clone(),
            customization_recommendations: self.customization_recommendations.clone(),
            risk_factors: self.risk_factors.clone(),
            advisory_error: None,
            deficiencies: Vec::new(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdvisoryUnavailable {
    #[error("Advisory service timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Advisory transport failure: {message}")]
    Transport { message: String },

    #[error("Malformed advisory response: {message}")]
    Malformed { message: String },
}

impl AdvisoryUnavailable {
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn malformed<S: Into<String>>(message: S) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait AdvisoryProvider: Send + Sync {
    /// Ask for an assessment of `package` against `requirement`
    ///
    /// `candidates` are the bookable services the advisor may pick from; it is
    /// empty when no itinerary will be built.
    async fn advise(
        &self,
        requirement: &Requirement,
        package: &Package,
        candidates: &[Service],
    ) -> Result<AdvisoryResult, AdvisoryUnavailable>;
}

/// Validate the advisory JSON payload against the expected schema
pub fn parse_advisory(content: &str) -> Result<AdvisoryResult, AdvisoryUnavailable> {
    let json = extract_json(content)
        .ok_or_else(|| AdvisoryUnavailable::malformed("response did not contain JSON"))?;
    let value: serde_json::Value = serde_json::from_str(&json)
        .map_err(|e| AdvisoryUnavailable::malformed(format!("invalid JSON: {e}")))?;

    let score = value
        .get("alignment_score")
        .and_then(serde_json::Value::as_f64)
        .ok_or_else(|| AdvisoryUnavailable::malformed("missing numeric alignment_score"))?;
    if !(0.0..=100.0).contains(&score) {
        return Err(AdvisoryUnavailable::malformed(format!(
            "alignment_score {score} outside 0-100"
        )));
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let alignment_score = score.round() as u8;

    Ok(AdvisoryResult {
        alignment_score,
        strengths: string_list(&value, "strengths")?,
        gaps: string_list(&value, "gaps")?,
        customization_recommendations: string_list(&value, "customization_recommendations")?,
        risk_factors: string_list(&value, "risk_factors")?,
        selected_services: match value.get("selected_services") {
            None | Some(serde_json::Value::Null) => None,
            Some(_) => Some(string_list(&value, "selected_services")?),
        },
    })
}

fn string_list(value: &serde_json::Value, field: &str) -> Result<Vec<String>, AdvisoryUnavailable> {
    let items = value
        .get(field)
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| AdvisoryUnavailable::malformed(format!("missing list field '{field}'")))?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| AdvisoryUnavailable::malformed(format!("'{field}' must hold strings")))
        })
        .collect()
}

/// Pull the first JSON object out of a model reply, tolerating code fences
#[must_use]
pub fn extract_json(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return Some(trimmed.to_string());
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    (end > start).then(|| trimmed[start..=end].to_string())
}
