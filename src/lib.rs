//! `TripMatch` - Trip-to-package matching and itinerary synthesis
//!
//! This library scores catalog packages against a customer trip, picks the
//! best match with ranked alternatives, optionally consults an advisory
//! service and assembles a day-by-day draft itinerary.

pub mod advisory;
pub mod api;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod itinerary;
pub mod matching;
pub mod models;
pub mod telemetry;
pub mod web;

// Re-export core types for public API
pub use advisory::{AdvisoryProvider, AdvisoryResult, AdvisoryUnavailable, HttpAdvisoryClient};
pub use catalog::{InMemoryCatalog, PackageCatalog, ServiceCatalog, TripSource};
pub use config::TripMatchConfig;
pub use engine::{Collaborators, MatchOptions, MatchResponse, TripMatchEngine};
pub use error::{ErrorKind, TripMatchError};
pub use itinerary::{FjallItineraryStore, ItineraryStore, MemoryItineraryStore};
pub use models::{Itinerary, Package, Requirement, Service, TripRecord};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, TripMatchError>;
