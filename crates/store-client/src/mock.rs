//! Mock StoreClient for unit testing
//!
//! This module provides an in-memory implementation of `StoreClientTrait` that
//! behaves like the API server for the calls the controller makes:
//! - server-side apply is a no-op when the applied fields are unchanged
//! - StatefulSet `serviceName` and `selector` are immutable
//! - StatefulSets without containers are rejected
//! - status patches use JSON merge-patch semantics
//!
//! Failures can be injected per call to exercise error paths.

use crate::error::StoreError;
use crate::store_trait::StoreClientTrait;
use crds::StatefulSetWorkload;
use k8s_openapi::api::apps::v1::StatefulSet;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

type ObjectKey = (String, String);

/// Number of write calls seen by the mock
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteCounters {
    /// Apply calls, including no-ops and failures
    pub applies: usize,
    /// Apply calls that created or changed an object
    pub apply_mutations: usize,
    /// Status patch calls
    pub status_patches: usize,
    /// Delete calls
    pub deletes: usize,
}

impl WriteCounters {
    /// All write calls of any kind
    pub fn total_writes(&self) -> usize {
        self.applies + self.status_patches + self.deletes
    }
}

/// Mock StoreClient for testing
///
/// Cloning shares the underlying storage, so a test can keep a handle while
/// the reconciler owns another.
#[derive(Debug, Clone, Default)]
pub struct MockStoreClient {
    pub(crate) workloads: Arc<Mutex<HashMap<ObjectKey, StatefulSetWorkload>>>,
    pub(crate) statefulsets: Arc<Mutex<BTreeMap<ObjectKey, StatefulSet>>>,
    pub(crate) field_owners: Arc<Mutex<HashMap<ObjectKey, String>>>,
    pub(crate) apply_failures: Arc<Mutex<VecDeque<StoreError>>>,
    pub(crate) status_patch_failures: Arc<Mutex<VecDeque<StoreError>>>,
    pub(crate) delete_failures: Arc<Mutex<HashSet<String>>>,
    pub(crate) counters: Arc<Mutex<WriteCounters>>,
}

fn key_of(namespace: &str, name: &str) -> ObjectKey {
    (namespace.to_string(), name.to_string())
}

fn object_key(meta: &k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta) -> Result<ObjectKey, StoreError> {
    let name = meta.name.as_deref()
        .ok_or_else(|| StoreError::InvalidRequest("object missing name".to_string()))?;
    let namespace = meta.namespace.as_deref()
        .ok_or_else(|| StoreError::InvalidRequest("object missing namespace".to_string()))?;
    Ok(key_of(namespace, name))
}

/// Parses an equality-based label selector (`a=b,c=d`)
fn parse_selector(selector: &str) -> Vec<(String, String)> {
    selector
        .split(',')
        .filter_map(|term| term.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect()
}

/// RFC 7386 JSON merge patch
fn merge_patch(target: &mut serde_json::Value, patch: &serde_json::Value) {
    let serde_json::Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = serde_json::Value::Object(serde_json::Map::new());
    }
    if let serde_json::Value::Object(target_map) = target {
        for (k, v) in patch_map {
            if v.is_null() {
                target_map.remove(k);
            } else {
                merge_patch(target_map.entry(k.clone()).or_insert(serde_json::Value::Null), v);
            }
        }
    }
}

fn applied_fields_match(existing: &StatefulSet, desired: &StatefulSet) -> bool {
    existing.metadata.labels == desired.metadata.labels
        && existing.metadata.owner_references == desired.metadata.owner_references
        && existing.spec == desired.spec
}

fn validate_statefulset(name: &str, statefulset: &StatefulSet) -> Result<(), StoreError> {
    let containers = statefulset.spec.as_ref()
        .and_then(|s| s.template.spec.as_ref())
        .map(|p| p.containers.as_slice())
        .unwrap_or_default();

    if containers.is_empty() {
        return Err(StoreError::Rejected(format!(
            "StatefulSet.apps \"{}\" is invalid: spec.template.spec.containers: Required value", name
        )));
    }

    let mut seen = HashSet::new();
    for container in containers {
        if !seen.insert(container.name.as_str()) {
            return Err(StoreError::Rejected(format!(
                "StatefulSet.apps \"{}\" is invalid: spec.template.spec.containers[].name: Duplicate value: \"{}\"",
                name, container.name
            )));
        }

        let mut ports = HashSet::new();
        for port_name in container.ports.iter().flatten().filter_map(|p| p.name.as_deref()) {
            if !ports.insert(port_name) {
                return Err(StoreError::Rejected(format!(
                    "StatefulSet.apps \"{}\" is invalid: spec.template.spec.containers[{}].ports[].name: Duplicate value: \"{}\"",
                    name, container.name, port_name
                )));
            }
        }
    }
    Ok(())
}

impl MockStoreClient {
    /// Create an empty mock store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a workload to the mock store (for test setup)
    ///
    /// A uid is generated when the workload has none.
    pub fn add_workload(&self, mut workload: StatefulSetWorkload) {
        if workload.metadata.uid.is_none() {
            workload.metadata.uid = Some(uuid::Uuid::new_v4().to_string());
        }
        let key = object_key(&workload.metadata).unwrap();
        self.workloads.lock().unwrap().insert(key, workload);
    }

    /// Replace a stored workload's spec, keeping its metadata and status
    pub fn update_workload_spec(&self, namespace: &str, name: &str, spec: crds::StatefulSetWorkloadSpec) {
        if let Some(workload) = self.workloads.lock().unwrap().get_mut(&key_of(namespace, name)) {
            workload.spec = spec;
        }
    }

    /// Remove a workload from the mock store
    pub fn remove_workload(&self, namespace: &str, name: &str) {
        self.workloads.lock().unwrap().remove(&key_of(namespace, name));
    }

    /// Current copy of a stored workload
    pub fn workload(&self, namespace: &str, name: &str) -> Option<StatefulSetWorkload> {
        self.workloads.lock().unwrap().get(&key_of(namespace, name)).cloned()
    }

    /// Add a StatefulSet directly (for test setup), generating a uid when missing
    pub fn add_statefulset(&self, mut statefulset: StatefulSet) -> StatefulSet {
        if statefulset.metadata.uid.is_none() {
            statefulset.metadata.uid = Some(uuid::Uuid::new_v4().to_string());
        }
        let key = object_key(&statefulset.metadata).unwrap();
        self.statefulsets.lock().unwrap().insert(key, statefulset.clone());
        statefulset
    }

    /// Current copy of a stored StatefulSet
    pub fn statefulset(&self, namespace: &str, name: &str) -> Option<StatefulSet> {
        self.statefulsets.lock().unwrap().get(&key_of(namespace, name)).cloned()
    }

    /// All StatefulSets in a namespace, ordered by name
    pub fn statefulsets_in(&self, namespace: &str) -> Vec<StatefulSet> {
        self.statefulsets.lock().unwrap()
            .iter()
            .filter(|((ns, _), _)| ns == namespace)
            .map(|(_, s)| s.clone())
            .collect()
    }

    /// Field manager of the last apply that touched a StatefulSet
    pub fn field_owner(&self, namespace: &str, name: &str) -> Option<String> {
        self.field_owners.lock().unwrap().get(&key_of(namespace, name)).cloned()
    }

    /// Make the next apply call fail with `error`
    pub fn fail_next_apply(&self, error: StoreError) {
        self.apply_failures.lock().unwrap().push_back(error);
    }

    /// Make the next status patch fail with `error`
    pub fn fail_next_status_patch(&self, error: StoreError) {
        self.status_patch_failures.lock().unwrap().push_back(error);
    }

    /// Make every delete of the named StatefulSet fail
    pub fn fail_deletes_of(&self, name: &str) {
        self.delete_failures.lock().unwrap().insert(name.to_string());
    }

    /// Snapshot of the write counters
    pub fn counters(&self) -> WriteCounters {
        *self.counters.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl StoreClientTrait for MockStoreClient {
    async fn get_workload(&self, namespace: &str, name: &str) -> Result<Option<StatefulSetWorkload>, StoreError> {
        Ok(self.workload(namespace, name))
    }

    async fn patch_workload_status(&self, namespace: &str, name: &str, patch: &serde_json::Value) -> Result<(), StoreError> {
        self.counters.lock().unwrap().status_patches += 1;
        if let Some(err) = self.status_patch_failures.lock().unwrap().pop_front() {
            return Err(err);
        }

        let mut workloads = self.workloads.lock().unwrap();
        let workload = workloads.get_mut(&key_of(namespace, name))
            .ok_or_else(|| StoreError::NotFound(format!("statefulsetworkloads.core.oam.dev \"{}\" not found", name)))?;

        let mut status = serde_json::to_value(workload.status.clone().unwrap_or_default())?;
        if let Some(status_patch) = patch.get("status") {
            merge_patch(&mut status, status_patch);
        }
        workload.status = Some(serde_json::from_value(status)?);
        Ok(())
    }

    async fn apply_statefulset(&self, statefulset: &StatefulSet, field_owner: &str) -> Result<StatefulSet, StoreError> {
        self.counters.lock().unwrap().applies += 1;
        if let Some(err) = self.apply_failures.lock().unwrap().pop_front() {
            return Err(err);
        }

        let key = object_key(&statefulset.metadata)?;
        validate_statefulset(&key.1, statefulset)?;

        let mut sets = self.statefulsets.lock().unwrap();
        let applied = match sets.get_mut(&key) {
            Some(existing) if applied_fields_match(existing, statefulset) => {
                return Ok(existing.clone());
            }
            Some(existing) => {
                let old_spec = existing.spec.clone().unwrap_or_default();
                let new_spec = statefulset.spec.clone().unwrap_or_default();
                if old_spec.service_name != new_spec.service_name || old_spec.selector != new_spec.selector {
                    return Err(StoreError::Rejected(format!(
                        "StatefulSet.apps \"{}\" is invalid: spec: Forbidden: updates to statefulset spec for fields other than 'replicas', 'ordinals', 'template', 'updateStrategy', 'persistentVolumeClaimRetentionPolicy' and 'minReadySeconds' are forbidden",
                        key.1
                    )));
                }
                let version = existing.metadata.resource_version.as_deref()
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(0);
                existing.metadata.labels = statefulset.metadata.labels.clone();
                existing.metadata.owner_references = statefulset.metadata.owner_references.clone();
                existing.metadata.resource_version = Some((version + 1).to_string());
                existing.metadata.generation = existing.metadata.generation.map(|g| g + 1);
                existing.spec = statefulset.spec.clone();
                existing.clone()
            }
            None => {
                let mut created = statefulset.clone();
                created.metadata.uid = Some(uuid::Uuid::new_v4().to_string());
                created.metadata.resource_version = Some("1".to_string());
                created.metadata.generation = Some(1);
                sets.insert(key.clone(), created.clone());
                created
            }
        };
        drop(sets);

        self.field_owners.lock().unwrap().insert(key, field_owner.to_string());
        self.counters.lock().unwrap().apply_mutations += 1;
        Ok(applied)
    }

    async fn list_statefulsets(&self, namespace: &str, label_selector: &str) -> Result<Vec<StatefulSet>, StoreError> {
        let selector = parse_selector(label_selector);
        Ok(self.statefulsets_in(namespace)
            .into_iter()
            .filter(|s| {
                let labels = s.metadata.labels.clone().unwrap_or_default();
                selector.iter().all(|(k, v)| labels.get(k) == Some(v))
            })
            .collect())
    }

    async fn delete_statefulset(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        self.counters.lock().unwrap().deletes += 1;
        if self.delete_failures.lock().unwrap().contains(name) {
            return Err(StoreError::Api {
                code: 500,
                message: format!("injected delete failure for {}", name),
            });
        }
        self.statefulsets.lock().unwrap()
            .remove(&key_of(namespace, name))
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("statefulsets.apps \"{}\" not found", name)))
    }
}
