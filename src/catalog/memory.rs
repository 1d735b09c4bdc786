use std::fs;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{PackageCatalog, ServiceCatalog, TripSource};
use crate::models::{Package, PackageStatus, Service, ServiceCategory, TripRecord};
use crate::{Result, TripMatchError};

/// Contents of a catalog seed file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub trips: Vec<TripRecord>,
    #[serde(default)]
    pub packages: Vec<Package>,
    #[serde(default)]
    pub services: Vec<Service>,
}

/// Catalog held in memory, loaded from a JSON seed or built in tests
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    seed: CatalogSeed,
}

impl InMemoryCatalog {
    #[must_use]
    pub fn new(seed: CatalogSeed) -> Self {
        Self { seed }
    }

    /// Load and parse a JSON seed file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading catalog seed from: {:?}", path);

        let content = fs::read_to_string(path).map_err(|e| {
            TripMatchError::catalog(format!(
                "Failed to read catalog seed {}: {e}",
                path.display()
            ))
        })?;

        Self::parse_json(&content)
    }

    pub fn parse_json(content: &str) -> Result<Self> {
        let seed: CatalogSeed = serde_json::from_str(content)
            .map_err(|e| TripMatchError::catalog(format!("Failed to parse catalog seed: {e}")))?;

        let duplicates = duplicate_ids(seed.packages.iter().map(|p| p.id.as_str()))
            .chain(duplicate_ids(seed.services.iter().map(|s| s.id.as_str())))
            .collect::<Vec<_>>();
        if !duplicates.is_empty() {
            warn!("Catalog seed contains duplicate ids: {}", duplicates.join(", "));
        }

        info!(
            "Loaded {} trips, {} packages and {} services",
            seed.trips.len(),
            seed.packages.len(),
            seed.services.len()
        );
        Ok(Self::new(seed))
    }
}

fn duplicate_ids<'a>(ids: impl Iterator<Item = &'a str>) -> impl Iterator<Item = String> {
    let mut seen = std::collections::HashSet::new();
    ids.filter(move |id| !seen.insert(*id))
        .map(str::to_string)
        .collect::<Vec<_>>()
        .into_iter()
}

#[async_trait]
impl TripSource for InMemoryCatalog {
    async fn get_trip(&self, reference: &str) -> Result<Option<TripRecord>> {
        Ok(self
            .seed
            .trips
            .iter()
            .find(|t| t.reference == reference)
            .cloned())
    }
}

#[async_trait]
impl PackageCatalog for InMemoryCatalog {
    async fn packages_by_status(&self, status: PackageStatus) -> Result<Vec<Package>> {
        Ok(self
            .seed
            .packages
            .iter()
            .filter(|p| p.status == status)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ServiceCatalog for InMemoryCatalog {
    async fn services(&self, destination: &str, category: ServiceCategory) -> Result<Vec<Service>> {
        let destination = destination.trim();
        Ok(self
            .seed
            .services
            .iter()
            .filter(|s| s.category() == category)
            .filter(|s| s.destination.trim().eq_ignore_ascii_case(destination))
            .cloned()
            .collect())
    }
}
