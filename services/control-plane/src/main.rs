//! Fleet control plane
//!
//! Serves the worker fleet API for the clusters listed in the inventory and
//! converges each cluster's access grants at startup.

use std::sync::Arc;

use anyhow::Result;
use fleet_control_plane::{
    api, config,
    inventory::Inventory,
    provider::{ClusterProvider, DefaultMachineTemplater, InMemoryClusterProvider},
    rbac::bootstrap::ensure_access_grants,
    state::AppState,
};
use fleet_reconcile::RetryPolicy;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::Config::from_env()?;

    // Initialize tracing (prefer RUST_LOG, fallback to FLEET_LOG_LEVEL)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting fleet control plane");
    info!(listen_addr = %config.listen_addr, "Configuration loaded");

    let provider = match &config.inventory {
        Some(path) => {
            let inventory = Inventory::load(path).inspect_err(|e| {
                error!(error = %e, path = %path.display(), "Failed to load inventory");
            })?;
            InMemoryClusterProvider::from_inventory(inventory)?
        }
        None => {
            warn!("FLEET_INVENTORY not set, serving no clusters");
            InMemoryClusterProvider::new()
        }
    };
    info!(clusters = provider.len(), "Inventory loaded");

    // A cluster whose grants cannot be converged is still served.
    let policy = RetryPolicy::with_max_retries(config.reconcile_max_attempts.saturating_sub(1));
    for cluster in provider.clusters().await {
        if let Err(e) = ensure_access_grants(
            &cluster.cluster.id,
            cluster.roles.as_ref(),
            cluster.role_bindings.as_ref(),
            &policy,
        )
        .await
        {
            warn!(cluster_id = %cluster.cluster.id, error = %e, "Failed to converge access grants");
        }
    }

    let state = AppState::new(
        Arc::new(provider),
        Arc::new(DefaultMachineTemplater),
        config.request_timeout,
    );
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(addr = %config.listen_addr, "Listening for connections");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Received shutdown signal");
        })
        .await?;

    info!("Control plane shutdown complete");
    Ok(())
}
