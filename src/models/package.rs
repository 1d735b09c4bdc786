//! Standard travel package model

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageStatus {
    Draft,
    Active,
    Archived,
}

/// Nights the package spends in one destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationStay {
    pub destination: String,
    pub nights: u32,
}

/// Pre-built travel package from the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    pub destinations: Vec<String>,
    /// Ordered per-destination night allocation, when the package defines one
    #[serde(default)]
    pub destination_nights: Vec<DestinationStay>,
    /// Documented inclusions and offered activities
    #[serde(default)]
    pub inclusions: Vec<String>,
    pub valid_from: NaiveDate,
    pub valid_to: NaiveDate,
    /// Price per person
    pub base_cost: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_min_group")]
    pub min_group_size: u32,
    #[serde(default = "default_max_group")]
    pub max_group_size: u32,
    #[serde(default)]
    pub duration_days: u32,
    #[serde(default)]
    pub duration_nights: u32,
    #[serde(default)]
    pub hotel_stars: Option<u8>,
    pub status: PackageStatus,
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_min_group() -> u32 {
    1
}

fn default_max_group() -> u32 {
    20
}

impl Package {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == PackageStatus::Active
    }

    /// Case-insensitive check against both destination lists
    #[must_use]
    pub fn covers_destination(&self, destination: &str) -> bool {
        self.destinations
            .iter()
            .map(String::as_str)
            .chain(self.destination_nights.iter().map(|s| s.destination.as_str()))
            .any(|d| d.trim().eq_ignore_ascii_case(destination.trim()))
    }

    /// Whole-package price for a party of `passengers`, saturating at `Decimal::MAX`
    #[must_use]
    pub fn total_cost(&self, passengers: u32) -> Decimal {
        self.base_cost
            .checked_mul(Decimal::from(passengers))
            .unwrap_or(Decimal::MAX)
    }

    /// Sum of the per-destination allocation
    #[must_use]
    pub fn allocated_nights(&self) -> u32 {
        self.destination_nights.iter().map(|s| s.nights).sum()
    }
}
