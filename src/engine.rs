//! Match-and-build pipeline
//!
//! Normalizes the trip, scores and ranks active packages, asks the advisory
//! provider for a second opinion and, in build mode, assembles and persists
//! a draft itinerary.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::advisory::{AdvisoryProvider, AdvisoryResult, AdvisoryUnavailable};
use crate::catalog::{
    PackageCatalog, ResolvedServices, ServiceCatalog, ServiceResolver, TripSource,
};
use crate::config::TripMatchConfig;
use crate::error::ErrorKind;
use crate::itinerary::{ItineraryAssembler, ItineraryStore, ItineraryWriter, NameGenerator};
use crate::matching::{
    AlternativePackage, MatchSelector, PackageScorer, ScoreBreakdown, ScoreSummary,
    requirement_gaps,
};
use crate::models::{
    AdvisoryNotes, Itinerary, Package, PackageStatus, Requirement, Service, ServiceCategory,
};
use crate::{Result, TripMatchError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOptions {
    /// Assemble and persist an itinerary; `false` runs analysis only
    pub build_itinerary: bool,
    pub use_advisory: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            build_itinerary: true,
            use_advisory: true,
        }
    }
}

/// Outcome of [`TripMatchEngine::match_and_build`]
#[derive(Debug, Clone, Serialize)]
pub struct MatchResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    pub trip_reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_package: Option<Package>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_score_breakdown: Option<ScoreBreakdown>,
    pub destination_mismatch_warning: bool,
    pub advisory: Option<AdvisoryResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_error: Option<String>,
    pub recommendations: Vec<String>,
    /// Requirement shortfalls of the selected package that no criterion scores
    pub requirement_gaps: Vec<String>,
    pub alternative_packages: Vec<AlternativePackage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_scores: Option<Vec<ScoreSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub itinerary: Option<Itinerary>,
}

impl MatchResponse {
    fn failure(trip_reference: &str, error: TripMatchError) -> Self {
        let message = match &error {
            TripMatchError::NoActivePackages { message }
            | TripMatchError::NoSuitableMatch { message, .. } => message.clone(),
            other => other.user_message(),
        };
        let error_kind = error.kind();
        let all_scores = match error {
            TripMatchError::NoSuitableMatch { scores, .. } => Some(scores),
            _ => None,
        };
        Self {
            success: false,
            message,
            error_kind: Some(error_kind),
            trip_reference: trip_reference.to_string(),
            selected_package: None,
            match_score: None,
            match_score_breakdown: None,
            destination_mismatch_warning: false,
            advisory: None,
            ai_error: None,
            recommendations: Vec::new(),
            requirement_gaps: Vec::new(),
            alternative_packages: Vec::new(),
            all_scores,
            itinerary: None,
        }
    }
}

/// Read-only and persistence collaborators of the engine
pub struct Collaborators {
    pub trips: Arc<dyn TripSource>,
    pub packages: Arc<dyn PackageCatalog>,
    pub services: Arc<dyn ServiceCatalog>,
    pub store: Arc<dyn ItineraryStore>,
    pub advisory: Option<Arc<dyn AdvisoryProvider>>,
}

pub struct TripMatchEngine {
    trips: Arc<dyn TripSource>,
    packages: Arc<dyn PackageCatalog>,
    resolver: ServiceResolver,
    store: Arc<dyn ItineraryStore>,
    advisory: Option<Arc<dyn AdvisoryProvider>>,
    advisory_timeout: Duration,
    scorer: PackageScorer,
    selector: MatchSelector,
    assembler: ItineraryAssembler,
    writer: ItineraryWriter,
}

impl TripMatchEngine {
    pub fn new(config: &TripMatchConfig, collaborators: Collaborators) -> Self {
        let writer = ItineraryWriter::new(collaborators.store.clone(), &config.writer);
        Self::assemble_engine(config, collaborators, writer)
    }

    /// Same as [`TripMatchEngine::new`] with a custom itinerary naming scheme
    pub fn with_name_generator(
        config: &TripMatchConfig,
        collaborators: Collaborators,
        names: Arc<dyn NameGenerator>,
    ) -> Self {
        let writer = ItineraryWriter::with_names(collaborators.store.clone(), names, &config.writer);
        Self::assemble_engine(config, collaborators, writer)
    }

    fn assemble_engine(
        config: &TripMatchConfig,
        collaborators: Collaborators,
        writer: ItineraryWriter,
    ) -> Self {
        Self {
            trips: collaborators.trips,
            packages: collaborators.packages,
            resolver: ServiceResolver::new(collaborators.services),
            store: collaborators.store,
            advisory: collaborators.advisory,
            advisory_timeout: Duration::from_secs(u64::from(config.advisory.timeout_seconds)),
            scorer: PackageScorer::new(&config.scoring),
            selector: MatchSelector::new(&config.scoring),
            assembler: ItineraryAssembler::new(&config.assembly),
            writer,
        }
    }

    /// Override the bound placed on every advisory call
    #[must_use]
    pub fn with_advisory_timeout(mut self, timeout: Duration) -> Self {
        self.advisory_timeout = timeout;
        self
    }

    /// Itineraries already written for a trip, oldest first
    pub async fn itineraries(&self, trip_reference: &str) -> Result<Vec<Itinerary>> {
        let mut itineraries = self.store.list_for_trip(trip_reference).await?;
        itineraries.sort_by_key(|i| i.version);
        Ok(itineraries)
    }

    pub async fn itinerary(&self, id: &str) -> Result<Option<Itinerary>> {
        self.store.get(id).await
    }

    /// Run the pipeline; failures are reported in the response, never raised
    #[tracing::instrument(name = "match_and_build", skip(self))]
    pub async fn match_and_build(
        &self,
        trip_reference: &str,
        options: MatchOptions,
    ) -> MatchResponse {
        match self.run(trip_reference, options).await {
            Ok(response) => response,
            Err(error) => {
                warn!(
                    kind = ?error.kind(),
                    retryable = error.is_retryable(),
                    "Match failed: {error}"
                );
                MatchResponse::failure(trip_reference, error)
            }
        }
    }

    async fn run(&self, trip_reference: &str, options: MatchOptions) -> Result<MatchResponse> {
        let trip = self
            .trips
            .get_trip(trip_reference)
            .await?
            .ok_or_else(|| TripMatchError::trip_not_found(trip_reference))?;
        let requirement = Requirement::from_trip(&trip)?;
        debug!(requirement = %requirement.summary(), "Normalized trip requirement");

        // Services are only needed when building; prefetch them alongside the catalog read
        let (mut packages, mut resolved) = if options.build_itinerary {
            tokio::try_join!(
                self.packages.packages_by_status(PackageStatus::Active),
                self.resolver
                    .resolve(&requirement.destinations, &ServiceCategory::ALL)
            )?
        } else {
            (
                self.packages
                    .packages_by_status(PackageStatus::Active)
                    .await?,
                ResolvedServices::default(),
            )
        };

        let listed = packages.len();
        packages.retain(Package::is_active);
        if packages.len() < listed {
            warn!(
                dropped = listed - packages.len(),
                "Catalog returned inactive packages for an active listing"
            );
        }
        if packages.is_empty() {
            return Err(TripMatchError::no_active_packages());
        }

        let scored = self.scorer.score_all(&requirement, &packages)?;
        let selection = self.selector.select(scored)?;
        let best = selection.best;
        info!(
            package = %best.package.id,
            score = best.total_score,
            alternatives = selection.alternatives.len(),
            "Selected package"
        );

        if options.build_itinerary {
            let missing: Vec<String> = best
                .package
                .destination_nights
                .iter()
                .map(|s| s.destination.clone())
                .filter(|d| {
                    !requirement
                        .destinations
                        .iter()
                        .any(|r| r.eq_ignore_ascii_case(d))
                })
                .collect();
            if !missing.is_empty() {
                let extra = self.resolver.resolve(&missing, &ServiceCategory::ALL).await?;
                resolved.merge(extra);
            }
        }

        let (advisory, ai_error) = if options.use_advisory {
            let candidates: Vec<Service> = resolved.all().cloned().collect();
            match self.consult_advisory(&requirement, &best.package, &candidates).await {
                Some(Ok(result)) => (Some(result), None),
                Some(Err(unavailable)) => {
                    warn!("Continuing without advisory: {unavailable}");
                    (None, Some(unavailable.to_string()))
                }
                None => (None, None),
            }
        } else {
            (None, None)
        };

        let advisory_recommendations = advisory
            .as_ref()
            .map(|a| a.customization_recommendations.as_slice())
            .unwrap_or_default();
        let recommendations =
            self.selector
                .recommendations(&requirement, &best, advisory_recommendations);
        let gaps = requirement_gaps(&requirement, &best.package);

        let itinerary = if options.build_itinerary {
            let assembly =
                self.assembler
                    .assemble(&requirement, &best.package, &resolved, advisory.as_ref())?;
            let mut notes = advisory
                .as_ref()
                .map(AdvisoryResult::to_notes)
                .unwrap_or_else(AdvisoryNotes::default);
            notes.advisory_error.clone_from(&ai_error);
            Some(
                self.writer
                    .write(trip_reference, &best.package.id, assembly, notes)
                    .await?,
            )
        } else {
            None
        };

        let message = if itinerary.is_some() {
            "Itinerary created successfully"
        } else {
            "Trip analyzed successfully"
        };

        Ok(MatchResponse {
            success: true,
            message: message.to_string(),
            error_kind: None,
            trip_reference: trip_reference.to_string(),
            destination_mismatch_warning: best.destination_mismatch,
            match_score: Some(best.total_score),
            match_score_breakdown: Some(best.breakdown),
            selected_package: Some(best.package),
            advisory,
            ai_error,
            recommendations,
            requirement_gaps: gaps,
            alternative_packages: selection.alternatives,
            all_scores: None,
            itinerary,
        })
    }

    /// `None` when no provider is configured
    async fn consult_advisory(
        &self,
        requirement: &Requirement,
        package: &Package,
        candidates: &[Service],
    ) -> Option<std::result::Result<AdvisoryResult, AdvisoryUnavailable>> {
        let Some(provider) = &self.advisory else {
            debug!("No advisory provider configured");
            return None;
        };
        let call = provider.advise(requirement, package, candidates);
        Some(
            match tokio::time::timeout(self.advisory_timeout, call).await {
                Ok(result) => result,
                Err(_) => Err(AdvisoryUnavailable::Timeout {
                    seconds: self.advisory_timeout.as_secs(),
                }),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::itinerary::MemoryItineraryStore;

    const SEED: &str = r#"{
        "trips": [
            {"reference": "TRIP-1", "destinations": ["Paris"], "start_date": "2025-05-01",
             "end_date": "2025-05-03", "pax": 2, "budget": 3000},
            {"reference": "TRIP-EMPTY", "destinations": ["  "], "pax": 2}
        ],
        "packages": [
            {"id": "PAR-3", "name": "Paris Short Break", "destinations": ["Paris"],
             "valid_from": "2025-01-01", "valid_to": "2025-12-31", "base_cost": 600,
             "currency": "EUR", "duration_days": 3, "duration_nights": 2, "status": "active"},
            {"id": "OLD", "name": "Archived", "destinations": ["Paris"],
             "valid_from": "2020-01-01", "valid_to": "2020-12-31", "base_cost": 100,
             "status": "archived"}
        ],
        "services": [
            {"id": "H-PAR", "name": "Hotel Lumiere", "destination": "Paris", "cost": 120,
             "currency": "EUR", "category": "hotel", "included_meals": ["breakfast"]}
        ]
    }"#;

    fn engine() -> TripMatchEngine {
        let catalog = Arc::new(InMemoryCatalog::parse_json(SEED).unwrap());
        TripMatchEngine::new(
            &TripMatchConfig::default(),
            Collaborators {
                trips: catalog.clone(),
                packages: catalog.clone(),
                services: catalog,
                store: Arc::new(MemoryItineraryStore::new()),
                advisory: None,
            },
        )
    }

    #[tokio::test]
    async fn test_unknown_trip_is_reported() {
        let response = engine()
            .match_and_build("TRIP-404", MatchOptions::default())
            .await;
        assert!(!response.success);
        assert_eq!(response.error_kind, Some(ErrorKind::TripNotFound));
        assert!(response.itinerary.is_none());
    }

    #[tokio::test]
    async fn test_invalid_requirement_is_reported() {
        let response = engine()
            .match_and_build("TRIP-EMPTY", MatchOptions::default())
            .await;
        assert!(!response.success);
        assert_eq!(response.error_kind, Some(ErrorKind::ValidationError));
    }

    #[tokio::test]
    async fn test_analysis_mode_writes_nothing() {
        let engine = engine();
        let response = engine
            .match_and_build(
                "TRIP-1",
                MatchOptions {
                    build_itinerary: false,
                    use_advisory: true,
                },
            )
            .await;

        assert!(response.success);
        assert_eq!(response.message, "Trip analyzed successfully");
        assert_eq!(response.selected_package.unwrap().id, "PAR-3");
        assert!(response.itinerary.is_none());
        assert!(response.ai_error.is_none());
        assert!(engine.itineraries("TRIP-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_build_mode_persists_draft() {
        let engine = engine();
        let response = engine
            .match_and_build("TRIP-1", MatchOptions::default())
            .await;

        assert!(response.success, "{}", response.message);
        let itinerary = response.itinerary.unwrap();
        assert_eq!(itinerary.id, "TRIP-1-ITN-001");
        assert_eq!(itinerary.day_plans.len(), 3);
        assert_eq!(itinerary.total_cost, itinerary.assignments_total());
        assert_eq!(
            engine.itinerary(&itinerary.id).await.unwrap().unwrap().id,
            itinerary.id
        );
    }
}
