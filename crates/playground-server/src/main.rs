mod config;

use std::sync::Arc;

use anyhow::Context;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use playground_api::{AppState, AppStateInner, SessionKeys};
use playground_db::{Database, JsonStore, PlaygroundStore, seed};
use playground_geo::ApiAdresse;

use crate::config::{Config, StoreKind};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "playground=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    let store = open_store(&config)?;
    if let Some(path) = &config.seed_file {
        let fixtures = seed::load_fixture(path)?;
        let inserted = store.seed(fixtures).context("Seeding failed")?;
        if inserted == 0 {
            info!("Store already holds records, {} not loaded", path.display());
        }
    }

    let geocoder = ApiAdresse::new(config.geocoder_url.clone(), config.geocoder_timeout)?;
    if config.dev_login {
        warn!("Dev login is enabled: anyone can sign in as anyone");
    }

    let state: AppState = Arc::new(AppStateInner {
        store,
        geocoder: Arc::new(geocoder),
        sessions: SessionKeys::new(&config.jwt_secret),
        dev_login: config.dev_login,
    });

    let app = playground_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    info!("Playground server listening on {}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn open_store(config: &Config) -> anyhow::Result<Arc<dyn PlaygroundStore>> {
    let store: Arc<dyn PlaygroundStore> = match config.store {
        StoreKind::Sqlite => Arc::new(Database::open(&config.db_path)?),
        StoreKind::Json => Arc::new(JsonStore::open(&config.json_path)?),
        StoreKind::Memory => {
            info!("Using the in-memory store, nothing will be persisted");
            Arc::new(JsonStore::in_memory())
        }
    };
    Ok(store)
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => tokio::select! {
                _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
            },
            Err(e) => {
                warn!("Couldn't install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
