//! Main controller implementation.
//!
//! This module contains the `Controller` struct that wires the store client,
//! reconciler, watcher and probe server together.

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::metrics::Metrics;
use crate::reconciler::Reconciler;
use crate::server::{self, ProbeState};
use crate::watcher::watch_workloads;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use store_client::StoreClient;
use tokio::task::JoinHandle;
use tracing::info;

/// Main controller for StatefulSetWorkload resources.
pub struct Controller {
    workload_watcher: JoinHandle<Result<(), ControllerError>>,
    probe_server: JoinHandle<Result<(), ControllerError>>,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller").finish_non_exhaustive()
    }
}

impl Controller {
    /// Creates a new controller instance and starts its background tasks.
    pub async fn new(config: ControllerConfig) -> Result<Self, ControllerError> {
        info!("Initializing StatefulSetWorkload Controller");

        let store = StoreClient::try_default().await?;
        let kube_client = store.kube_client();
        let metrics = Metrics::new()?;
        let ready = Arc::new(AtomicBool::new(false));

        let probe_state = ProbeState {
            ready: ready.clone(),
            metrics: metrics.clone(),
        };
        let probe_addr = config.probe_addr;
        let probe_server = tokio::spawn(async move {
            server::serve(probe_addr, probe_state).await
        });

        let reconciler = Arc::new(Reconciler::new(Box::new(store), config, metrics));
        let workload_watcher = tokio::spawn(async move {
            watch_workloads(kube_client, reconciler, ready).await
        });

        Ok(Self {
            workload_watcher,
            probe_server,
        })
    }

    /// Runs the controller until the watcher stops or a task fails.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("StatefulSetWorkload Controller running");

        tokio::select! {
            result = &mut self.workload_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("StatefulSetWorkload watcher panicked: {}", e)))?
                    .map_err(|e| ControllerError::Watch(format!("StatefulSetWorkload watcher error: {}", e)))?;
            }
            result = &mut self.probe_server => {
                result.map_err(|e| ControllerError::Watch(format!("Probe server panicked: {}", e)))??;
            }
        }

        self.probe_server.abort();
        Ok(())
    }
}
