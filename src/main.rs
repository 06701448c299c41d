//! Quiz Board Back binary entrypoint wiring REST, SSE, and the buzzer store layers.

use std::{env, net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod dao;
mod dto;
mod error;
mod routes;
mod services;
mod state;

use config::AppConfig;
use dao::slots::FileSlotStore;
use state::{AppState, SharedState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let slots = FileSlotStore::open(&config.data_dir).context("opening data directory")?;
    let watchdog_tick = Duration::from_millis(config.watchdog_tick_ms);
    let room = config.room.clone();

    let app_state = AppState::new(config, Arc::new(slots));

    spawn_buzzer_supervisor(app_state.clone(), room);
    services::sse_events::spawn_forwarder(app_state.clone());
    // The handle lives for the whole process; the watchdog dies with it.
    let _watchdog = services::buzzer_service::spawn_watchdog(app_state.clone(), watchdog_tick);

    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Start the supervisor that connects to CouchDB and keeps the buzzer store
/// healthy. Without configuration the backend stays in degraded mode: the
/// scoreboard works, buzzer operations fail fast.
#[cfg(feature = "couch-store")]
fn spawn_buzzer_supervisor(state: SharedState, room: String) {
    use dao::buzzer_store::{
        BuzzerStore,
        couchdb::{CouchBuzzerStore, CouchConfig},
    };

    match CouchConfig::from_env() {
        Ok(couch) => {
            tokio::spawn(services::storage_supervisor::run(state, move || {
                let couch = couch.clone();
                let room = room.clone();
                async move {
                    let store = CouchBuzzerStore::connect(couch, &room).await?;
                    Ok(Arc::new(store) as Arc<dyn BuzzerStore>)
                }
            }));
        }
        Err(err) => {
            warn!(error = %err, "buzzer store not configured; staying in degraded mode");
        }
    }
}

#[cfg(not(feature = "couch-store"))]
fn spawn_buzzer_supervisor(_state: SharedState, _room: String) {
    warn!("built without a buzzer store backend; staying in degraded mode");
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
