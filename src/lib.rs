pub mod adapters;
pub mod app;
pub mod config;
pub mod error;
pub mod ports;
pub mod reminders;
pub mod state;
pub mod store;
pub mod types;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};
use tracing::{error, info};

use crate::error::ServeError;

pub use reminders::generate_vapid_credentials;

/// Opens the database, starts the reminder scheduler and serves the API until
/// Ctrl+C or SIGTERM. Armed reminder timers are cancelled before returning.
pub async fn serve(addr: SocketAddr, config: config::AppConfig) -> Result<(), ServeError> {
    let store = Arc::new(store::SqliteStore::open(&config.database_path)?);
    info!(path = %config.database_path.display(), "database ready");

    let mut reminders = reminders::start(&config, Arc::clone(&store));
    let state = state::AppState {
        config,
        store,
        reminders: reminders.trigger(),
        schedule: reminders.table(),
    };

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "listening");

    let served = axum::serve(listener, app::app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await;
    reminders.shutdown().await;
    served?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = ctrl_c().await {
            error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
                info!("received terminate signal, shutting down");
            }
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
