//! Kubernetes resource watcher.
//!
//! Drives the reconciler from a kube_runtime::Controller watching
//! StatefulSetWorkloads and the StatefulSets they own. Owned-object changes
//! map back to the owning workload, so drift on a child triggers a reconcile.
//! Workload events only trigger when `metadata.generation` moves, so the
//! controller's own status writes do not re-enter the loop.

use crate::config::ControllerConfig;
use crate::error::{ControllerError, ReconcileError};
use crate::reconciler::{ReconcileOutcome, Reconciler, WorkloadKey};
use crds::StatefulSetWorkload;
use futures::{Stream, StreamExt};
use k8s_openapi::api::apps::v1::StatefulSet;
use kube::{Api, Client};
use kube_runtime::{
    controller::{Action, Config as RuntimeConfig},
    predicates, reflector, watcher, Controller, Predicate, WatchStreamExt,
};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Next action after a reconcile that did not fail.
pub fn action_for(outcome: &ReconcileOutcome, config: &ControllerConfig) -> Action {
    match outcome {
        ReconcileOutcome::Synced { .. } => Action::requeue(config.resync_interval),
        ReconcileOutcome::Deleted => Action::await_change(),
    }
}

async fn reconcile(workload: Arc<StatefulSetWorkload>, reconciler: Arc<Reconciler>) -> Result<Action, ReconcileError> {
    let Some(key) = WorkloadKey::from_workload(&workload, &reconciler.config().default_namespace) else {
        warn!("Skipping StatefulSetWorkload without a name");
        return Ok(Action::await_change());
    };
    let outcome = reconciler.reconcile(&key).await?;
    Ok(action_for(&outcome, reconciler.config()))
}

/// Failed reconciles are retried after a fixed delay.
pub fn error_policy(workload: Arc<StatefulSetWorkload>, error: &ReconcileError, reconciler: Arc<Reconciler>) -> Action {
    let delay = reconciler.config().retry_delay;
    warn!(
        "Retrying StatefulSetWorkload {}/{} in {:?} after {} failure: {}",
        workload.metadata.namespace.as_deref().unwrap_or_default(),
        workload.metadata.name.as_deref().unwrap_or_default(),
        delay,
        error.step(),
        error
    );
    Action::requeue(delay)
}

/// Hash of the object uid. The filter cache is keyed by namespace/name only,
/// so without it a recreated workload at generation 1 would be dropped.
fn instance_uid(workload: &StatefulSetWorkload) -> Option<u64> {
    let mut hasher = DefaultHasher::new();
    workload.metadata.uid.as_deref()?.hash(&mut hasher);
    Some(hasher.finish())
}

/// Passes a workload event only when its generation (or uid) differs from the last one seen.
///
/// The API server bumps `metadata.generation` on spec changes only, so
/// status and metadata-only updates are dropped here.
pub fn spec_changes<S>(workloads: S) -> impl Stream<Item = Result<StatefulSetWorkload, watcher::Error>> + Send + 'static
where
    S: Stream<Item = Result<StatefulSetWorkload, watcher::Error>> + Send + 'static,
{
    workloads.predicate_filter(predicates::generation.combine(instance_uid))
}

/// Watches StatefulSetWorkloads and their StatefulSets until shutdown.
///
/// `ready` is set once the controller stream is running.
pub async fn watch_workloads(
    client: Client,
    reconciler: Arc<Reconciler>,
    ready: Arc<AtomicBool>,
) -> Result<(), ControllerError> {
    let config = reconciler.config().clone();

    let (workloads, statefulsets): (Api<StatefulSetWorkload>, Api<StatefulSet>) = match config.watch_namespace.as_deref() {
        Some(ns) => (Api::namespaced(client.clone(), ns), Api::namespaced(client, ns)),
        None => (Api::all(client.clone()), Api::all(client)),
    };

    info!(
        "Starting StatefulSetWorkload watcher (namespace: {})",
        config.watch_namespace.as_deref().unwrap_or("all namespaces")
    );

    // Debounce batches bursts of child events
    let runtime_config = RuntimeConfig::default()
        .debounce(config.debounce)
        .concurrency(config.concurrency);

    let (reader, writer) = reflector::store();
    let trigger = watcher(workloads, watcher::Config::default())
        .default_backoff()
        .reflect(writer)
        .applied_objects();

    let controller = Controller::for_stream(spec_changes(trigger), reader)
        .owns(statefulsets, watcher::Config::default())
        .with_config(runtime_config)
        .shutdown_on_signal();

    ready.store(true, Ordering::SeqCst);

    controller
        .run(reconcile, error_policy, reconciler)
        .for_each(|res| async move {
            match res {
                Ok((obj, _)) => debug!("Reconciled {}", obj),
                Err(e) => error!("Controller error: {}", e),
            }
        })
        .await;

    ready.store(false, Ordering::SeqCst);
    info!("StatefulSetWorkload watcher stopped");
    Ok(())
}
