//! Badminton board binary entrypoint wiring REST, SSE and the board store.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use badminton_board::{
    config::AppConfig,
    dao::{
        board_store::{BoardStore, memory::MemoryBoardStore},
        storage::StorageError,
    },
    routes,
    services::{clock_service, command_processor, storage_supervisor},
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let app_state = AppState::new(config);

    command_processor::spawn(app_state.clone())
        .await
        .context("starting command processor")?;
    clock_service::spawn_ticker(app_state.clone());
    clock_service::spawn_status_relay(app_state.clone());
    spawn_storage_supervisor(app_state.clone());

    // Build the HTTP router once the shared state is ready.
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

/// Pick the board store backend and supervise it in the background.
fn spawn_storage_supervisor(state: SharedState) {
    #[cfg(feature = "couch-store")]
    {
        use badminton_board::dao::board_store::couchdb::{CouchBoardStore, CouchConfig};

        match CouchConfig::from_env() {
            Ok(couch) => {
                info!("using CouchDB board store");
                tokio::spawn(storage_supervisor::run(state, move || {
                    let couch = couch.clone();
                    async move {
                        let store = CouchBoardStore::connect(couch).await?;
                        Ok::<_, StorageError>(Arc::new(store) as Arc<dyn BoardStore>)
                    }
                }));
                return;
            }
            Err(err) => warn!(error = %err, "CouchDB not configured; falling back to the in-memory store"),
        }
    }

    info!("using in-memory board store; the board is lost on restart");
    let store = MemoryBoardStore::new();
    tokio::spawn(storage_supervisor::run(state, move || {
        let store: Arc<dyn BoardStore> = Arc::new(store.clone());
        async move { Ok::<_, StorageError>(store) }
    }));
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
