//! Quiz buzzer backend entrypoint wiring REST, SSE and the snapshot-backed store.

use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;
use axum::Router;
use futures::future::BoxFuture;
use quiz_buzzer_back::{
    AppConfig,
    dao::{
        storage::StorageError,
        store::{BuzzerStore, MemoryStore, SnapshotFile},
    },
    routes,
    services::{notification_service, storage_supervisor},
    state::{AppState, SharedState},
};
use tokio::{net::TcpListener, time::interval};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const INTERACTION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

type ConnectFuture = BoxFuture<'static, Result<Arc<dyn BuzzerStore>, StorageError>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    if config.admin_ids().is_empty() {
        warn!("no admin ids configured; admin endpoints will refuse every caller");
    }

    let app_state = AppState::new(
        Arc::new(config.admin_authority()),
        config.registration_ttl(),
    );

    tokio::spawn(storage_supervisor::run(
        app_state.clone(),
        store_connector(config.data_path().cloned()),
    ));
    tokio::spawn(notification_service::forward_degraded_changes(
        app_state.clone(),
    ));
    tokio::spawn(sweep_expired_interactions(app_state.clone()));

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port()));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Build the closure the storage supervisor calls to (re)open the store.
///
/// Without a data path a single volatile store is shared across reconnects.
fn store_connector(data_path: Option<PathBuf>) -> impl FnMut() -> ConnectFuture + Send + 'static {
    let volatile: Arc<dyn BuzzerStore> = Arc::new(MemoryStore::in_memory());
    if data_path.is_none() {
        warn!("no data path configured; state is kept in memory only");
    }

    move || {
        let data_path = data_path.clone();
        let volatile = volatile.clone();
        let connect: ConnectFuture = Box::pin(async move {
            match data_path {
                Some(path) => {
                    let store = MemoryStore::open(SnapshotFile::new(path)).await?;
                    Ok(Arc::new(store) as Arc<dyn BuzzerStore>)
                }
                None => Ok(volatile),
            }
        });
        connect
    }
}

/// Periodically drop registration intents whose deadline has passed.
async fn sweep_expired_interactions(state: SharedState) {
    let mut ticker = interval(INTERACTION_SWEEP_INTERVAL);
    loop {
        ticker.tick().await;
        let purged = state.interactions().purge_expired();
        if purged > 0 {
            debug!(purged, "dropped expired registration intents");
        }
    }
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

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
