//! Error types and handling for the trip matching engine

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::matching::ScoreSummary;

/// Main error type for the trip matching engine
#[derive(Error, Debug)]
pub enum TripMatchError {
    /// Missing or invalid requirement fields
    #[error("Invalid requirement: {message}")]
    Validation { message: String },

    /// The trip reference does not resolve to a trip record
    #[error("Trip not found: {reference}")]
    TripNotFound { reference: String },

    /// The package catalog has no active packages
    #[error("{message}")]
    NoActivePackages { message: String },

    /// Every package scored below the minimum floor
    #[error("{message}")]
    NoSuitableMatch {
        message: String,
        scores: Vec<ScoreSummary>,
    },

    /// A night of the trip has no lodging available
    #[error("Insufficient inventory: {message}")]
    InsufficientInventory { message: String },

    /// Itinerary naming collisions exhausted the retry budget
    #[error("Persistence conflict: {message}")]
    PersistenceConflict { message: String },

    /// Catalog read failures
    #[error("Catalog error: {message}")]
    Catalog { message: String },

    /// Itinerary store failures
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

/// Serialized error tag reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    ValidationError,
    TripNotFound,
    NoActivePackages,
    NoSuitableMatch,
    InsufficientInventory,
    PersistenceConflict,
    CatalogError,
    StorageError,
    ConfigError,
    IoError,
}

impl TripMatchError {
    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new trip-not-found error
    pub fn trip_not_found<S: Into<String>>(reference: S) -> Self {
        Self::TripNotFound {
            reference: reference.into(),
        }
    }

    /// Create the error returned when the catalog holds no active packages
    #[must_use]
    pub fn no_active_packages() -> Self {
        Self::NoActivePackages {
            message: "No active standard packages found".to_string(),
        }
    }

    /// Create a no-suitable-match error carrying the full score table
    #[must_use]
    pub fn no_suitable_match(scores: Vec<ScoreSummary>) -> Self {
        Self::NoSuitableMatch {
            message: "No suitable package found for the trip requirements".to_string(),
            scores,
        }
    }

    /// Create a new insufficient inventory error
    pub fn insufficient_inventory<S: Into<String>>(message: S) -> Self {
        Self::InsufficientInventory {
            message: message.into(),
        }
    }

    /// Create a new persistence conflict error
    pub fn persistence_conflict<S: Into<String>>(message: S) -> Self {
        Self::PersistenceConflict {
            message: message.into(),
        }
    }

    /// Create a new catalog error
    pub fn catalog<S: Into<String>>(message: S) -> Self {
        Self::Catalog {
            message: message.into(),
        }
    }

    /// Create a new storage error
    pub fn storage<S: Into<String>>(message: S) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::ValidationError,
            Self::TripNotFound { .. } => ErrorKind::TripNotFound,
            Self::NoActivePackages { .. } => ErrorKind::NoActivePackages,
            Self::NoSuitableMatch { .. } => ErrorKind::NoSuitableMatch,
            Self::InsufficientInventory { .. } => ErrorKind::InsufficientInventory,
            Self::PersistenceConflict { .. } => ErrorKind::PersistenceConflict,
            Self::Catalog { .. } => ErrorKind::CatalogError,
            Self::Storage { .. } => ErrorKind::StorageError,
            Self::Config { .. } => ErrorKind::ConfigError,
            Self::Io { .. } => ErrorKind::IoError,
        }
    }

    /// Whether the caller can safely rerun the whole operation
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::PersistenceConflict { .. } | Self::Catalog { .. } | Self::Storage { .. }
        )
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            TripMatchError::Validation { message } => format!("Invalid trip requirement: {message}"),
            TripMatchError::TripNotFound { reference } => {
                format!("Trip '{reference}' does not exist.")
            }
            TripMatchError::NoActivePackages { message } => message.clone(),
            TripMatchError::NoSuitableMatch { message, .. } => message.clone(),
            TripMatchError::InsufficientInventory { message } => {
                format!("Not enough inventory to build the itinerary: {message}")
            }
            TripMatchError::PersistenceConflict { .. } => {
                "The itinerary could not be saved because of concurrent updates. Please retry."
                    .to_string()
            }
            TripMatchError::Catalog { .. } => {
                "Unable to read the package or service catalog.".to_string()
            }
            TripMatchError::Storage { .. } => "Unable to save the itinerary.".to_string(),
            TripMatchError::Config { .. } => {
                "Configuration error. Please check your config file and API keys.".to_string()
            }
            TripMatchError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }
}
