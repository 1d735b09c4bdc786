//! Configuration management for the trip matching engine
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::TripMatchError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TripMatchConfig {
    /// Advisory (LLM) service settings
    #[serde(default)]
    pub advisory: AdvisoryConfig,
    /// Package scoring settings
    #[serde(default)]
    pub scoring: ScoringConfig,
    /// Day-wise assembly settings
    #[serde(default)]
    pub assembly: AssemblyConfig,
    /// Itinerary writer settings
    #[serde(default)]
    pub writer: WriterConfig,
    /// Itinerary store settings
    #[serde(default)]
    pub store: StoreConfig,
    /// Catalog seed settings
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
}

/// Advisory service configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisoryConfig {
    /// Whether the HTTP advisory client is built at startup
    #[serde(default)]
    pub enabled: bool,
    /// Base URL of an OpenAI-compatible API
    #[serde(default = "default_advisory_base_url")]
    pub base_url: String,
    /// Bearer token for the advisory API
    pub api_key: Option<String>,
    #[serde(default = "default_advisory_model")]
    pub model: String,
    /// Request timeout in seconds
    #[serde(default = "default_advisory_timeout")]
    pub timeout_seconds: u32,
    /// Immediate retries on transient transport failure (0 or 1)
    #[serde(default = "default_advisory_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_advisory_temperature")]
    pub temperature: f32,
}

/// Package scoring configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Packages scoring below this total are discarded
    #[serde(default = "default_min_score")]
    pub min_score: f64,
    /// Passengers outside the group range at which the group score reaches 0
    #[serde(default = "default_group_size_margin")]
    pub group_size_margin: u32,
    /// Multiple of the budget at which the budget score reaches 0
    #[serde(default = "default_budget_decay_factor")]
    pub budget_decay_factor: f64,
    #[serde(default = "default_max_alternatives")]
    pub max_alternatives: usize,
}

/// Day-wise assembly configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyConfig {
    #[serde(default = "default_activities_per_day")]
    pub activities_per_day: usize,
    #[serde(default = "default_meals_per_day")]
    pub meals_per_day: usize,
}

/// Itinerary writer configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriterConfig {
    /// Naming attempts before giving up with a persistence conflict
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

/// Itinerary store configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory of the itinerary keyspace
    #[serde(default = "default_store_location")]
    pub location: String,
}

/// Catalog seed configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// JSON file with trips, packages and services
    #[serde(default = "default_seed_path")]
    pub seed_path: String,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// OTLP/HTTP collector endpoint; spans are only exported when set
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

// Default value functions
fn default_advisory_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_advisory_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_advisory_timeout() -> u32 {
    30
}

fn default_advisory_max_retries() -> u32 {
    1
}

fn default_advisory_temperature() -> f32 {
    0.2
}

fn default_min_score() -> f64 {
    10.0
}

fn default_group_size_margin() -> u32 {
    5
}

fn default_budget_decay_factor() -> f64 {
    2.0
}

fn default_max_alternatives() -> usize {
    3
}

fn default_activities_per_day() -> usize {
    2
}

fn default_meals_per_day() -> usize {
    2
}

fn default_max_attempts() -> u32 {
    5
}

fn default_store_location() -> String {
    "~/.local/share/tripmatch/itineraries".to_string()
}

fn default_seed_path() -> String {
    "data/catalog.json".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for AdvisoryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_advisory_base_url(),
            api_key: None,
            model: default_advisory_model(),
            timeout_seconds: default_advisory_timeout(),
            max_retries: default_advisory_max_retries(),
            temperature: default_advisory_temperature(),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            min_score: default_min_score(),
            group_size_margin: default_group_size_margin(),
            budget_decay_factor: default_budget_decay_factor(),
            max_alternatives: default_max_alternatives(),
        }
    }
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            activities_per_day: default_activities_per_day(),
            meals_per_day: default_meals_per_day(),
        }
    }
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            location: default_store_location(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            seed_path: default_seed_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            otlp_endpoint: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

impl TripMatchConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // TRIPMATCH__SCORING__MIN_SCORE=20 overrides scoring.min_score
        builder = builder.add_source(
            Environment::with_prefix("TRIPMATCH")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: TripMatchConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tripmatch").join("config.toml"))
    }

    /// Store directory with a leading `~` expanded
    #[must_use]
    pub fn store_path(&self) -> PathBuf {
        expand_home(&self.store.location)
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.advisory.base_url.is_empty() {
            self.advisory.base_url = default_advisory_base_url();
        }
        if self.advisory.model.is_empty() {
            self.advisory.model = default_advisory_model();
        }
        if self.advisory.timeout_seconds == 0 {
            self.advisory.timeout_seconds = default_advisory_timeout();
        }
        if self.scoring.group_size_margin == 0 {
            self.scoring.group_size_margin = default_group_size_margin();
        }
        if self.writer.max_attempts == 0 {
            self.writer.max_attempts = default_max_attempts();
        }
        if self.store.location.is_empty() {
            self.store.location = default_store_location();
        }
        if self.catalog.seed_path.is_empty() {
            self.catalog.seed_path = default_seed_path();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_api_keys()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate API keys and credentials
    pub fn validate_api_keys(&self) -> Result<()> {
        if let Some(api_key) = &self.advisory.api_key {
            if api_key.trim().is_empty() {
                return Err(TripMatchError::config(
                    "Advisory API key cannot be empty if provided. Either remove it or provide a valid key.",
                )
                .into());
            }

            if api_key.len() > 200 {
                return Err(TripMatchError::config(
                    "Advisory API key appears to be invalid (too long). Please check your API key.",
                )
                .into());
            }
        }

        Ok(())
    }

    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.advisory.timeout_seconds > 300 {
            return Err(
                TripMatchError::config("Advisory timeout cannot exceed 300 seconds").into(),
            );
        }

        if self.advisory.max_retries > 1 {
            return Err(TripMatchError::config(
                "Advisory max retries cannot exceed 1 (one immediate retry)",
            )
            .into());
        }

        if !(0.0..=2.0).contains(&self.advisory.temperature) {
            return Err(
                TripMatchError::config("Advisory temperature must be between 0 and 2").into(),
            );
        }

        if !(0.0..=100.0).contains(&self.scoring.min_score) {
            return Err(
                TripMatchError::config("Minimum score must be between 0 and 100").into(),
            );
        }

        if self.scoring.budget_decay_factor <= 1.0 {
            return Err(
                TripMatchError::config("Budget decay factor must be greater than 1").into(),
            );
        }

        if self.scoring.max_alternatives > 10 {
            return Err(TripMatchError::config("Maximum alternatives cannot exceed 10").into());
        }

        if self.assembly.activities_per_day > 6 || self.assembly.meals_per_day > 3 {
            return Err(TripMatchError::config(
                "At most 6 activities and 3 meals can be scheduled per day",
            )
            .into());
        }

        if self.writer.max_attempts > 100 {
            return Err(TripMatchError::config("Writer max attempts cannot exceed 100").into());
        }

        Ok(())
    }

    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(TripMatchError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(TripMatchError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        if !self.advisory.base_url.starts_with("http://")
            && !self.advisory.base_url.starts_with("https://")
        {
            return Err(TripMatchError::config(
                "Advisory base URL must be a valid HTTP or HTTPS URL",
            )
            .into());
        }

        Ok(())
    }
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir().map_or_else(|| PathBuf::from(path), |home| home.join(rest)),
        None => PathBuf::from(path),
    }
}
