//! Reconciliation logic for StatefulSetWorkload CRDs.
//!
//! A reconcile runs these steps in order, stopping at the first failure:
//! 1. Fetch the workload (a missing workload ends the reconcile quietly)
//! 2. Translate it into the desired StatefulSets
//! 3. Apply each child
//! 4. Record the applied children in `status.resources`
//! 5. Collect stale children left from earlier identities
//! 6. Record a `ReconcileSuccess` condition
//!
//! Any failure in steps 2-5 is recorded as a `ReconcileError` condition and
//! returned so the caller can requeue.

use crate::applier::apply;
use crate::collector::collect;
use crate::config::ControllerConfig;
use crate::error::ReconcileError;
use crate::metrics::Metrics;
use crate::status::{self, Outcome};
use crate::translator::{child_namespace, translate, STATEFULSET_API_VERSION, STATEFULSET_KIND};
use crds::{StatefulSetWorkload, TypedReference};
use k8s_openapi::api::apps::v1::StatefulSet;
use std::fmt;
use std::time::Instant;
use store_client::StoreClientTrait;
use tracing::{debug, error, info, warn};

/// Namespace and name of a workload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkloadKey {
    /// Namespace of the workload
    pub namespace: String,
    /// Name of the workload
    pub name: String,
}

impl WorkloadKey {
    /// Key for the workload `namespace/name`
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of a watched workload, with `default_namespace` for objects that carry none
    pub fn from_workload(workload: &StatefulSetWorkload, default_namespace: &str) -> Option<Self> {
        let name = workload.metadata.name.clone()?;
        let namespace = workload.metadata.namespace.clone()
            .unwrap_or_else(|| default_namespace.to_string());
        Some(Self { namespace, name })
    }
}

impl fmt::Display for WorkloadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Result of a reconcile that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// The workload no longer exists; nothing was written
    Deleted,
    /// Children applied, stale children collected and status recorded
    Synced {
        /// The managed children, as recorded in `status.resources`
        resources: Vec<TypedReference>,
        /// Number of stale children deleted
        collected: usize,
    },
}

/// Reconciles StatefulSetWorkload resources.
pub struct Reconciler {
    pub(crate) store: Box<dyn StoreClientTrait + Send + Sync>,
    pub(crate) config: ControllerConfig,
    pub(crate) metrics: Metrics,
}

impl fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn typed_reference(applied: &StatefulSet) -> TypedReference {
    TypedReference {
        api_version: STATEFULSET_API_VERSION.to_string(),
        kind: STATEFULSET_KIND.to_string(),
        name: applied.metadata.name.clone().unwrap_or_default(),
        uid: applied.metadata.uid.clone().unwrap_or_default(),
    }
}

impl Reconciler {
    /// Creates a new reconciler instance.
    pub fn new(store: Box<dyn StoreClientTrait + Send + Sync>, config: ControllerConfig, metrics: Metrics) -> Self {
        Self { store, config, metrics }
    }

    /// Configuration the reconciler runs with
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Reconciles the workload identified by `key`.
    pub async fn reconcile(&self, key: &WorkloadKey) -> Result<ReconcileOutcome, ReconcileError> {
        let started = Instant::now();
        self.metrics.reconcile_started();

        let result = self.reconcile_workload(key).await;

        self.metrics.observe_duration(started.elapsed());
        match &result {
            Ok(ReconcileOutcome::Synced { collected, .. }) => self.metrics.stale_children_deleted(*collected),
            Ok(ReconcileOutcome::Deleted) => {}
            Err(e) => self.metrics.reconcile_failed(e.step()),
        }
        result
    }

    async fn reconcile_workload(&self, key: &WorkloadKey) -> Result<ReconcileOutcome, ReconcileError> {
        info!("Reconciling StatefulSetWorkload {}", key);

        let mut workload = match self.store.get_workload(&key.namespace, &key.name).await {
            Ok(Some(workload)) => workload,
            Ok(None) => {
                debug!("StatefulSetWorkload {} not found, nothing to do", key);
                return Ok(ReconcileOutcome::Deleted);
            }
            Err(e) => {
                error!("Failed to get StatefulSetWorkload {}: {}", key, e);
                return Err(ReconcileError::Fetch(e));
            }
        };
        workload.metadata.namespace.get_or_insert_with(|| key.namespace.clone());

        match self.sync_children(&workload).await {
            Ok((resources, collected)) => {
                let outcome = Outcome::Success { resources: resources.clone() };
                status::record(self.store.as_ref(), &workload, &outcome, self.config.max_conditions)
                    .await
                    .map_err(|e| {
                        error!("Failed to record success on StatefulSetWorkload {}: {}", key, e);
                        ReconcileError::StatusPersist(e)
                    })?;

                info!(
                    "✅ Reconciled StatefulSetWorkload {} ({} children, {} stale deleted)",
                    key, resources.len(), collected
                );
                Ok(ReconcileOutcome::Synced { resources, collected })
            }
            Err(err) => {
                error!("Reconciliation of StatefulSetWorkload {} failed at {}: {}", key, err.step(), err);
                let outcome = Outcome::Failure { message: err.to_string() };
                if let Err(status_err) = status::record(self.store.as_ref(), &workload, &outcome, self.config.max_conditions).await {
                    warn!("cannot apply status on StatefulSetWorkload {}: {}", key, status_err);
                }
                Err(err)
            }
        }
    }

    /// Translate, apply, record children and collect. Returns the applied
    /// children and the number of stale children deleted.
    async fn sync_children(&self, workload: &StatefulSetWorkload) -> Result<(Vec<TypedReference>, usize), ReconcileError> {
        let desired = translate(workload, &self.config)?;
        let namespace = child_namespace(workload, &self.config);
        let field_owner = workload.metadata.name.clone().unwrap_or_default();

        let mut resources = Vec::with_capacity(desired.len());
        for child in &desired {
            let applied = apply(self.store.as_ref(), child, &field_owner).await?;
            resources.push(typed_reference(&applied));
        }

        status::record_resources(self.store.as_ref(), workload, &resources)
            .await
            .map_err(ReconcileError::RecordChildren)?;

        let current_uids: Vec<String> = resources.iter().map(|r| r.uid.clone()).collect();
        let collected = collect(self.store.as_ref(), workload, &namespace, &current_uids, &self.config.label_key).await?;

        Ok((resources, collected))
    }
}
