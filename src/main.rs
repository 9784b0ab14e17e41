use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use gh_event_log::{AppState, Config, EventStore, router};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("gh_event_log=debug,tower_http=info")),
        )
        .init();

    let config = Config::parse();

    let store = EventStore::connect(&config.database_url)
        .await
        .with_context(|| format!("failed to open event store at {}", config.database_url))?;

    let state = Arc::new(AppState {
        store: store.clone(),
        webhook_secret: config.secret.clone(),
    });

    let app = router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("GitHub event log starting on {}", addr);
    if config.secret.is_some() {
        info!("Webhook signature verification enabled");
    } else {
        warn!("No webhook secret configured - signatures will not be verified");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    store.close().await;
    info!("Event store closed");
    Ok(())
}
