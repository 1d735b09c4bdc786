//! Read-only collaborators: trip records, package catalog, service catalog

use async_trait::async_trait;

use crate::Result;
use crate::models::{Package, PackageStatus, Service, ServiceCategory, TripRecord};

pub mod memory;
pub mod resolver;

pub use memory::{CatalogSeed, InMemoryCatalog};
pub use resolver::{ResolvedServices, ServiceResolver};

#[async_trait]
pub trait TripSource: Send + Sync {
    /// `Ok(None)` when the reference is unknown
    async fn get_trip(&self, reference: &str) -> Result<Option<TripRecord>>;
}

#[async_trait]
pub trait PackageCatalog: Send + Sync {
    async fn packages_by_status(&self, status: PackageStatus) -> Result<Vec<Package>>;
}

#[async_trait]
pub trait ServiceCatalog: Send + Sync {
    /// Services at `destination` in `category`; destination compares case-insensitively
    async fn services(&self, destination: &str, category: ServiceCategory) -> Result<Vec<Service>>;
}
