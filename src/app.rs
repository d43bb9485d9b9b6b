use std::{error::Error, net::SocketAddr, sync::Arc};

use tokio::net::TcpListener;

use crate::{
    api::{self, ApiState},
    config::{Config, StoreLocation},
    domain::{PackOptimizer, SizeRegistry},
    infra::{JsonFileStore, KeyValueStore, MemoryStore},
    util::version::{version_label, APP_NAME},
};

/// Open the configured store and build the optimizer on top of it. A store
/// that cannot be opened or seeded is returned to the caller.
pub fn build_optimizer(config: &Config) -> Result<PackOptimizer, Box<dyn Error>> {
    let store: Arc<dyn KeyValueStore> = match &config.store {
        StoreLocation::Memory => {
            tracing::warn!("DB_PATH=:memory:, pack sizes will not survive a restart");
            Arc::new(MemoryStore::new())
        }
        StoreLocation::File(path) => Arc::new(JsonFileStore::open(path)?),
    };

    let registry = SizeRegistry::open(store)?;
    Ok(PackOptimizer::new(registry))
}

pub async fn run(config: Config) -> Result<(), Box<dyn Error>> {
    let optimizer = build_optimizer(&config)?;
    let state = ApiState {
        optimizer: Arc::new(optimizer),
        backend_url: Arc::from(config.backend_url.as_str()),
    };

    let addr = SocketAddr::new(config.host, config.port);
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, version = %version_label(), env = %config.env, "{APP_NAME} listening");

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::warn!("server gracefully stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::warn!(signal = "SIGINT", "received shutdown signal"),
        _ = terminate => tracing::warn!(signal = "SIGTERM", "received shutdown signal"),
    }
}
