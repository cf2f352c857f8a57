use anyhow::Result;
use log::info;
use std::path::PathBuf;
use std::sync::Arc;
use transit_watch::api::rest::{AppState, RestApi};
use transit_watch::config;
use transit_watch::db::store::PgDocumentStore;
use transit_watch::db::DatabaseService;
use transit_watch::ingest::{DuplicateSuppressor, EventNormalizer};
use transit_watch::security::auth::AuthService;
use transit_watch::services::{CleanupService, IngestService};

async fn run_app() -> Result<()> {
    // Initialize logging
    env_logger::init();
    info!("Starting Transit Watch detection backend");

    // Optional config file as the first argument
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = config::load_config(config_path.as_deref())?;
    info!("Configuration loaded");

    // Database connection, migrations run per config
    let db = Arc::new(DatabaseService::new(&config.database).await?);

    let store = Arc::new(PgDocumentStore::new(db.pool.clone()));

    // Ingestion pipeline: one process-wide fingerprint table
    let dedup = Arc::new(DuplicateSuppressor::new(&config.ingest));
    let normalizer = EventNormalizer::new(dedup, &config.ingest);
    let ingest = Arc::new(IngestService::new(normalizer, store.clone()));

    let cleanup = Arc::new(CleanupService::new(store.clone()));

    let auth_service = Arc::new(AuthService::new(db.pool.clone(), &config.security));

    let state = AppState {
        db,
        store,
        ingest,
        cleanup,
        auth_service,
    };

    let http_server = RestApi::new(&config.api, state)?;

    tokio::select! {
        result = http_server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down...");
        }
    }

    Ok(())
}

fn main() {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to build tokio runtime");

    if let Err(e) = runtime.block_on(run_app()) {
        eprintln!("Application error: {}", e);
        std::process::exit(1);
    }
}
