use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use tripmatch::api::AppState;
use tripmatch::{
    AdvisoryProvider, Collaborators, FjallItineraryStore, HttpAdvisoryClient, InMemoryCatalog,
    TripMatchConfig, TripMatchEngine, telemetry, web,
};

#[tokio::main]
async fn main() -> Result<()> {
    // TRIPMATCH_CONFIG, then the first argument, then the user config dir
    let config_path = std::env::var_os("TRIPMATCH_CONFIG")
        .map(PathBuf::from)
        .or_else(|| std::env::args_os().nth(1).map(PathBuf::from));
    let config = TripMatchConfig::load_from_path(config_path)?;

    let tracer_provider = telemetry::init(&config.logging)?;
    info!("Starting tripmatch {}", tripmatch::VERSION);

    let catalog = Arc::new(InMemoryCatalog::load(&config.catalog.seed_path)?);

    let store_path = config.store_path();
    std::fs::create_dir_all(&store_path)
        .with_context(|| format!("Failed to create store directory {}", store_path.display()))?;
    let store = Arc::new(FjallItineraryStore::open(&store_path)?);

    let advisory: Option<Arc<dyn AdvisoryProvider>> = if config.advisory.enabled {
        info!(model = %config.advisory.model, "Advisory service enabled");
        Some(Arc::new(HttpAdvisoryClient::new(&config.advisory)?))
    } else {
        None
    };

    let engine = TripMatchEngine::new(
        &config,
        Collaborators {
            trips: catalog.clone(),
            packages: catalog.clone(),
            services: catalog,
            store,
            advisory,
        },
    );

    let served = web::run(
        AppState {
            engine: Arc::new(engine),
        },
        config.server.port,
    )
    .await;

    if let Some(provider) = tracer_provider {
        if let Err(e) = provider.shutdown() {
            eprintln!("Failed to flush spans: {e}");
        }
    }
    served
}
