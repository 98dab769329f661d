use std::{env, future, sync::Arc};

use anyhow::Context;
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storytime_server::{
    cli::{self, Command, ServeArgs},
    ingest, router,
    store::load_locations,
    AppState, EventStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storytime=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli::parse(env::args().collect()) {
        Command::Serve(args) => serve(args).await,
        Command::Normalize(args) => ingest::run(&args).await.map(|_| ()),
    }
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let events = EventStore::open(&args.events)
        .await
        .with_context(|| format!("Failed to load combined store {}", args.events.display()))?;

    let snapshot = events.snapshot().await;
    info!(
        events = snapshot.events.len(),
        dropped = snapshot.dropped,
        "loaded combined store"
    );

    let locations = load_locations(&args.locations).await;

    let state = Arc::new(AppState { events, locations });

    let listener = TcpListener::bind(args.address)
        .await
        .with_context(|| format!("Failed to bind to {}", args.address))?;
    info!("Listening at http://{}", args.address);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {err}");
            future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {err}");
                future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
