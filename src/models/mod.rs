//! Data models for the trip matching engine
//!
//! This module contains the core domain models organized by concern:
//! - Requirement: CRM trip records and the normalized matching input
//! - Package: Pre-built catalog packages
//! - Service: Bookable hotels, activities, meals and transport
//! - Itinerary: Day plans and persisted itinerary records

pub mod itinerary;
pub mod package;
pub mod requirement;
pub mod service;

// Re-export all public types for convenient access
pub use itinerary::{
    AdvisoryNotes, DayPlan, Itinerary, ItineraryStatus, ServiceAssignment, cost_by_category,
};
pub use package::{DestinationStay, Package, PackageStatus};
pub use requirement::{DateFlexibility, PassengerDetail, Priority, Requirement, TripRecord};
pub use service::{MealType, Service, ServiceCategory, ServiceDetails};
