//! Records reconcile outcomes on the workload status.
//!
//! Every call appends exactly one `Synced` condition. A successful outcome
//! also replaces `status.resources` as a whole; it is never appended to.

use chrono::Utc;
use crds::{Condition, StatefulSetWorkload, TypedReference};
use serde_json::json;
use store_client::{StoreClientTrait, StoreError};
use tracing::debug;

/// Result of a reconcile, as recorded on the workload.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Reconcile completed; `resources` is the full set of managed children
    Success { resources: Vec<TypedReference> },
    /// Reconcile failed with `message`
    Failure { message: String },
}

fn workload_key(workload: &StatefulSetWorkload) -> Result<(String, String), StoreError> {
    let name = workload.metadata.name.clone()
        .ok_or_else(|| StoreError::InvalidRequest("workload missing name".to_string()))?;
    let namespace = workload.metadata.namespace.clone()
        .ok_or_else(|| StoreError::InvalidRequest(format!("workload {} missing namespace", name)))?;
    Ok((namespace, name))
}

/// Appends `condition` to `existing`, dropping the oldest entries beyond `max_conditions`.
pub fn append_condition(existing: &[Condition], condition: Condition, max_conditions: usize) -> Vec<Condition> {
    let mut conditions = existing.to_vec();
    conditions.push(condition);
    let excess = conditions.len().saturating_sub(max_conditions.max(1));
    conditions.drain(..excess);
    conditions
}

/// Records `outcome` on `workload` and persists the status subresource.
///
/// `workload` is the copy fetched at the start of the reconcile; its
/// conditions are the base the new condition is appended to.
pub async fn record(
    store: &dyn StoreClientTrait,
    workload: &StatefulSetWorkload,
    outcome: &Outcome,
    max_conditions: usize,
) -> Result<(), StoreError> {
    let (namespace, name) = workload_key(workload)?;
    let now = Utc::now();

    let condition = match outcome {
        Outcome::Success { .. } => Condition::reconcile_success(now),
        Outcome::Failure { message } => Condition::reconcile_error(message.clone(), now),
    };
    let existing = workload.status.as_ref()
        .map(|s| s.conditions.as_slice())
        .unwrap_or_default();
    let conditions = append_condition(existing, condition, max_conditions);

    let patch = match outcome {
        Outcome::Success { resources } => json!({
            "status": { "conditions": conditions, "resources": sorted(resources) }
        }),
        Outcome::Failure { .. } => json!({
            "status": { "conditions": conditions }
        }),
    };

    debug!("Recording {:?} on StatefulSetWorkload {}/{}", outcome, namespace, name);
    store.patch_workload_status(&namespace, &name, &patch).await
}

/// Replaces `status.resources` without touching conditions.
///
/// Skips the write when the recorded set already matches.
pub async fn record_resources(
    store: &dyn StoreClientTrait,
    workload: &StatefulSetWorkload,
    resources: &[TypedReference],
) -> Result<(), StoreError> {
    let (namespace, name) = workload_key(workload)?;
    let resources = sorted(resources);
    let recorded = workload.status.as_ref()
        .map(|s| sorted(&s.resources))
        .unwrap_or_default();
    if recorded == resources {
        debug!("Resources of StatefulSetWorkload {}/{} unchanged", namespace, name);
        return Ok(());
    }

    let patch = json!({ "status": { "resources": resources } });
    store.patch_workload_status(&namespace, &name, &patch).await
}

fn sorted(resources: &[TypedReference]) -> Vec<TypedReference> {
    let mut resources = resources.to_vec();
    resources.sort();
    resources.dedup();
    resources
}
