//! Service lookup for the destinations of a trip

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::try_join_all;
use tracing::debug;

use super::ServiceCatalog;
use crate::Result;
use crate::models::{Service, ServiceCategory};

/// Candidate services per category, cheapest first then by id
#[derive(Debug, Clone, Default)]
pub struct ResolvedServices {
    by_category: BTreeMap<ServiceCategory, Vec<Service>>,
}

impl ResolvedServices {
    /// Group already fetched services by category
    #[must_use]
    pub fn from_services(services: Vec<Service>) -> Self {
        let mut resolved = Self::default();
        for service in services {
            let category = service.category();
            resolved.insert(category, vec![service]);
        }
        resolved
    }

    /// Every candidate of `category`, across destinations
    #[must_use]
    pub fn get(&self, category: ServiceCategory) -> &[Service] {
        self.by_category
            .get(&category)
            .map_or(&[][..], Vec::as_slice)
    }

    /// Candidates of `category` at `destination`, preserving order
    ///
    /// The iterator borrows only `self`, so the destination may be a temporary.
    pub fn at<'a>(
        &'a self,
        destination: &str,
        category: ServiceCategory,
    ) -> impl Iterator<Item = &'a Service> + use<'a> {
        let destination = destination.trim().to_string();
        self.get(category)
            .iter()
            .filter(move |s| s.destination.trim().eq_ignore_ascii_case(&destination))
    }

    pub fn all(&self) -> impl Iterator<Item = &Service> {
        self.by_category.values().flatten()
    }

    /// Fold `other` into `self`, skipping ids already present
    pub fn merge(&mut self, other: ResolvedServices) {
        for (category, services) in other.by_category {
            let entry = self.by_category.entry(category).or_default();
            for service in services {
                if !entry.iter().any(|s| s.id == service.id) {
                    entry.push(service);
                }
            }
            sort_services(entry);
        }
    }

    fn insert(&mut self, category: ServiceCategory, services: Vec<Service>) {
        let entry = self.by_category.entry(category).or_default();
        entry.extend(services);
        sort_services(entry);
    }
}

fn sort_services(services: &mut [Service]) {
    services.sort_by(|a, b| a.cost.cmp(&b.cost).then_with(|| a.id.cmp(&b.id)));
}

pub struct ServiceResolver {
    catalog: Arc<dyn ServiceCatalog>,
}

impl ServiceResolver {
    pub fn new(catalog: Arc<dyn ServiceCatalog>) -> Self {
        Self { catalog }
    }

    /// Query every destination x category pair concurrently
    ///
    /// Gaps come back as empty lists, never as errors.
    #[tracing::instrument(name = "resolve_services", skip(self))]
    pub async fn resolve(
        &self,
        destinations: &[String],
        categories: &[ServiceCategory],
    ) -> Result<ResolvedServices> {
        let queries = destinations.iter().flat_map(|destination| {
            categories.iter().map(move |&category| async move {
                let services = self.catalog.services(destination, category).await?;
                Ok::<_, crate::TripMatchError>((category, services))
            })
        });

        let mut resolved = ResolvedServices::default();
        for (category, services) in try_join_all(queries).await? {
            resolved.insert(category, services);
        }
        for category in categories {
            resolved.by_category.entry(*category).or_default();
        }

        debug!(
            services = resolved.all().count(),
            "Resolved candidate services"
        );
        Ok(resolved)
    }
}
