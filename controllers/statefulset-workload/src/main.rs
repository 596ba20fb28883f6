//! StatefulSetWorkload Controller
//!
//! Reconciles StatefulSetWorkload CRDs (`core.oam.dev/v1alpha2`) into
//! native `apps/v1` StatefulSets:
//! - renders each workload into a StatefulSet labeled with the workload uid
//! - applies it with server-side apply
//! - deletes StatefulSets left over from an earlier identity
//! - records the outcome as `Synced` conditions on the workload status

mod applier;
mod collector;
mod config;
mod controller;
mod error;
mod metrics;
mod reconciler;
#[cfg(test)]
mod reconciler_test;
mod server;
mod status;
#[cfg(test)]
mod test_utils;
mod translator;
mod watcher;

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use controller::Controller;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if rustls::crypto::ring::default_provider().install_default().is_err() {
        warn!("A rustls crypto provider was already installed");
    }

    info!("Starting StatefulSetWorkload Controller");

    // Load configuration from environment variables
    let config = ControllerConfig::from_env()?;

    info!("Configuration:");
    info!("  Namespace: {}", config.watch_namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Label key: {}", config.label_key);
    info!("  Default namespace: {}", config.default_namespace);
    info!("  Retry delay: {:?}", config.retry_delay);
    info!("  Resync interval: {:?}", config.resync_interval);
    info!("  Probe address: {}", config.probe_addr);

    // Initialize and run controller
    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
