use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::engine::{MatchOptions, MatchResponse, TripMatchEngine};
use crate::error::ErrorKind;
use crate::models::Itinerary;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<TripMatchEngine>,
}

#[derive(Debug, Deserialize)]
pub struct MatchQuery {
    #[serde(default = "default_true")]
    pub build_itinerary: bool,
    #[serde(default = "default_true")]
    pub use_advisory: bool,
}

fn default_true() -> bool {
    true
}

impl From<MatchQuery> for MatchOptions {
    fn from(query: MatchQuery) -> Self {
        Self {
            build_itinerary: query.build_itinerary,
            use_advisory: query.use_advisory,
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct ApiHealth {
    pub status: String,
    pub version: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/trips/{trip}/match", post(match_trip))
        .route("/trips/{trip}/itineraries", get(list_itineraries))
        .route("/itineraries/{id}", get(get_itinerary))
        .with_state(state)
}

async fn health() -> Json<ApiHealth> {
    Json(ApiHealth {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
    })
}

async fn match_trip(
    State(state): State<AppState>,
    Path(trip): Path<String>,
    Query(query): Query<MatchQuery>,
) -> (StatusCode, Json<MatchResponse>) {
    let response = state.engine.match_and_build(&trip, query.into()).await;
    let status = response.error_kind.map_or(StatusCode::OK, status_for);
    (status, Json(response))
}

async fn list_itineraries(
    State(state): State<AppState>,
    Path(trip): Path<String>,
) -> Result<Json<Vec<Itinerary>>, StatusCode> {
    let itineraries = state.engine.itineraries(&trip).await.map_err(|e| {
        tracing::error!("Failed to list itineraries for {trip}: {e}");
        status_for(e.kind())
    })?;
    Ok(Json(itineraries))
}

async fn get_itinerary(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Itinerary>, StatusCode> {
    state
        .engine
        .itinerary(&id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to read itinerary {id}: {e}");
            status_for(e.kind())
        })?
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::ValidationError => StatusCode::BAD_REQUEST,
        ErrorKind::TripNotFound => StatusCode::NOT_FOUND,
        ErrorKind::NoActivePackages
        | ErrorKind::NoSuitableMatch
        | ErrorKind::InsufficientInventory => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::PersistenceConflict => StatusCode::CONFLICT,
        ErrorKind::CatalogError
        | ErrorKind::StorageError
        | ErrorKind::ConfigError
        | ErrorKind::IoError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
