//! Collision-free creation of draft itineraries

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use super::assembler::Assembly;
use super::store::{InsertOutcome, ItineraryStore};
use crate::config::WriterConfig;
use crate::models::{AdvisoryNotes, Itinerary, ItineraryStatus};
use crate::{Result, TripMatchError};

/// Produces the candidate id for the n-th itinerary of a trip
pub trait NameGenerator: Send + Sync {
    fn candidate(&self, trip_reference: &str, sequence: u32) -> String;
}

/// `{trip}-ITN-{n:03}`
#[derive(Debug, Clone, Copy, Default)]
pub struct SuffixNameGenerator;

impl NameGenerator for SuffixNameGenerator {
    fn candidate(&self, trip_reference: &str, sequence: u32) -> String {
        format!("{trip_reference}-ITN-{sequence:03}")
    }
}

pub struct ItineraryWriter {
    store: Arc<dyn ItineraryStore>,
    names: Arc<dyn NameGenerator>,
    max_attempts: u32,
}

impl ItineraryWriter {
    pub fn new(store: Arc<dyn ItineraryStore>, config: &WriterConfig) -> Self {
        Self::with_names(store, Arc::new(SuffixNameGenerator), config)
    }

    pub fn with_names(
        store: Arc<dyn ItineraryStore>,
        names: Arc<dyn NameGenerator>,
        config: &WriterConfig,
    ) -> Self {
        Self {
            store,
            names,
            max_attempts: config.max_attempts.max(1),
        }
    }

    /// Persist a new draft, moving to the next suffix whenever a name is taken
    #[tracing::instrument(name = "write_itinerary", skip(self, package_id, assembly, notes))]
    pub async fn write(
        &self,
        trip_reference: &str,
        package_id: &str,
        assembly: Assembly,
        mut notes: AdvisoryNotes,
    ) -> Result<Itinerary> {
        notes.deficiencies.extend(assembly.deficiencies);
        let existing = self.store.count_for_trip(trip_reference).await?;

        let mut itinerary = Itinerary {
            id: String::new(),
            trip_reference: trip_reference.to_string(),
            package_id: package_id.to_string(),
            version: 0,
            status: ItineraryStatus::Draft,
            total_cost: assembly.total_cost,
            currency: assembly.currency,
            cost_breakdown: assembly.cost_breakdown,
            day_plans: assembly.day_plans,
            advisory_notes: notes,
            created_at: Utc::now(),
        };

        for attempt in 0..self.max_attempts {
            let sequence = existing + 1 + attempt;
            itinerary.id = self.names.candidate(trip_reference, sequence);
            itinerary.version = sequence;

            match self.store.insert_new(&itinerary).await? {
                InsertOutcome::Created => {
                    info!(id = %itinerary.id, total = %itinerary.total_cost, "Itinerary created");
                    return Ok(itinerary);
                }
                InsertOutcome::NameTaken => {
                    debug!(id = %itinerary.id, attempt, "Itinerary name taken, trying next suffix");
                }
            }
        }

        Err(TripMatchError::persistence_conflict(format!(
            "no free itinerary name for trip {trip_reference} after {} attempts",
            self.max_attempts
        )))
    }
}
