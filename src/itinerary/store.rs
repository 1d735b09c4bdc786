//! Itinerary persistence with create-with-unique-name semantics

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use fjall::Keyspace;
use tokio::sync::Mutex;
use tokio::task;

use crate::models::Itinerary;
use crate::{Result, TripMatchError};

/// Outcome of a create-only insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Created,
    /// A record with the same id already exists; nothing was written
    NameTaken,
}

#[async_trait]
pub trait ItineraryStore: Send + Sync {
    /// Number of itineraries recorded for the trip
    async fn count_for_trip(&self, trip_reference: &str) -> Result<u32>;

    /// Create the record unless its id is taken; never overwrites
    async fn insert_new(&self, itinerary: &Itinerary) -> Result<InsertOutcome>;

    async fn get(&self, id: &str) -> Result<Option<Itinerary>>;

    async fn list_for_trip(&self, trip_reference: &str) -> Result<Vec<Itinerary>>;
}

/// Process-local store for tests and demos
#[derive(Default)]
pub struct MemoryItineraryStore {
    records: Mutex<BTreeMap<String, Itinerary>>,
}

impl MemoryItineraryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ItineraryStore for MemoryItineraryStore {
    async fn count_for_trip(&self, trip_reference: &str) -> Result<u32> {
        let records = self.records.lock().await;
        let count = records
            .values()
            .filter(|i| i.trip_reference == trip_reference)
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn insert_new(&self, itinerary: &Itinerary) -> Result<InsertOutcome> {
        let mut records = self.records.lock().await;
        if records.contains_key(&itinerary.id) {
            return Ok(InsertOutcome::NameTaken);
        }
        records.insert(itinerary.id.clone(), itinerary.clone());
        Ok(InsertOutcome::Created)
    }

    async fn get(&self, id: &str) -> Result<Option<Itinerary>> {
        Ok(self.records.lock().await.get(id).cloned())
    }

    async fn list_for_trip(&self, trip_reference: &str) -> Result<Vec<Itinerary>> {
        Ok(self
            .records
            .lock()
            .await
            .values()
            .filter(|i| i.trip_reference == trip_reference)
            .cloned()
            .collect())
    }
}

/// Persistent store on a fjall keyspace
///
/// Records live under `itinerary:{id}` as JSON; `trip:{reference}` holds the
/// ids written for a trip. Inserts are serialized by an async mutex so the
/// exists-check and the write cannot interleave.
pub struct FjallItineraryStore {
    store: Keyspace,
    write_lock: Mutex<()>,
}

fn record_key(id: &str) -> Vec<u8> {
    format!("itinerary:{id}").into_bytes()
}

fn trip_key(trip_reference: &str) -> Vec<u8> {
    format!("trip:{trip_reference}").into_bytes()
}

fn storage_error(e: impl std::fmt::Display) -> TripMatchError {
    TripMatchError::storage(e.to_string())
}

fn get_from_store(store: &Keyspace, key: &[u8]) -> Result<Option<Vec<u8>>> {
    Ok(store.get(key).map_err(storage_error)?.map(|v| v.to_vec()))
}

fn read_trip_index(store: &Keyspace, trip_reference: &str) -> Result<Vec<String>> {
    match get_from_store(store, &trip_key(trip_reference))? {
        Some(bytes) => serde_json::from_slice(&bytes).map_err(storage_error),
        None => Ok(Vec::new()),
    }
}

fn read_record(store: &Keyspace, id: &str) -> Result<Option<Itinerary>> {
    get_from_store(store, &record_key(id))?
        .map(|bytes| serde_json::from_slice(&bytes).map_err(storage_error))
        .transpose()
}

impl FjallItineraryStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let db = fjall::Database::builder(path).open().map_err(|e| {
            TripMatchError::storage(format!(
                "Failed to open itinerary store at {}: {e}",
                path.display()
            ))
        })?;
        let store = db
            .keyspace("itineraries", fjall::KeyspaceCreateOptions::default)
            .map_err(storage_error)?;
        Ok(Self {
            store,
            write_lock: Mutex::new(()),
        })
    }
}

#[async_trait]
impl ItineraryStore for FjallItineraryStore {
    async fn count_for_trip(&self, trip_reference: &str) -> Result<u32> {
        let store = self.store.clone();
        let trip_reference = trip_reference.to_string();
        let ids = task::spawn_blocking(move || read_trip_index(&store, &trip_reference))
            .await
            .map_err(storage_error)??;
        Ok(u32::try_from(ids.len()).unwrap_or(u32::MAX))
    }

    #[tracing::instrument(name = "insert_itinerary", level = "debug", skip_all, fields(id = %itinerary.id))]
    async fn insert_new(&self, itinerary: &Itinerary) -> Result<InsertOutcome> {
        let _guard = self.write_lock.lock().await;

        let store = self.store.clone();
        let id = itinerary.id.clone();
        let trip_reference = itinerary.trip_reference.clone();
        let bytes = serde_json::to_vec(itinerary).map_err(storage_error)?;

        task::spawn_blocking(move || -> Result<InsertOutcome> {
            if get_from_store(&store, &record_key(&id))?.is_some() {
                tracing::debug!("Itinerary id already taken");
                return Ok(InsertOutcome::NameTaken);
            }
            let mut ids = read_trip_index(&store, &trip_reference)?;
            store.insert(record_key(&id), bytes).map_err(storage_error)?;
            ids.push(id);
            let index = serde_json::to_vec(&ids).map_err(storage_error)?;
            store
                .insert(trip_key(&trip_reference), index)
                .map_err(storage_error)?;
            Ok(InsertOutcome::Created)
        })
        .await
        .map_err(storage_error)?
    }

    async fn get(&self, id: &str) -> Result<Option<Itinerary>> {
        let store = self.store.clone();
        let id = id.to_string();
        task::spawn_blocking(move || read_record(&store, &id))
            .await
            .map_err(storage_error)?
    }

    async fn list_for_trip(&self, trip_reference: &str) -> Result<Vec<Itinerary>> {
        let store = self.store.clone();
        let trip_reference = trip_reference.to_string();
        task::spawn_blocking(move || -> Result<Vec<Itinerary>> {
            let mut records = Vec::new();
            for id in read_trip_index(&store, &trip_reference)? {
                if let Some(record) = read_record(&store, &id)? {
                    records.push(record);
                }
            }
            Ok(records)
        })
        .await
        .map_err(storage_error)?
    }
}
