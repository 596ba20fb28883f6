//! StoreClient trait for mocking
//!
//! This trait abstracts the Kubernetes API server calls the controller makes,
//! so reconcile logic can be unit tested against an in-memory store.

use crate::error::StoreError;
use crds::StatefulSetWorkload;
use k8s_openapi::api::apps::v1::StatefulSet;

/// Object store operations used by the StatefulSetWorkload controller.
///
/// Each method is a single request/response against the store. Implementations
/// must not cache objects between calls.
#[async_trait::async_trait]
pub trait StoreClientTrait: Send + Sync {
    /// Fetch a workload. `Ok(None)` when it does not exist.
    async fn get_workload(&self, namespace: &str, name: &str) -> Result<Option<StatefulSetWorkload>, StoreError>;

    /// Merge-patch the status subresource of a workload.
    ///
    /// `patch` is the full patch body, e.g. `{"status": {...}}`.
    async fn patch_workload_status(&self, namespace: &str, name: &str, patch: &serde_json::Value) -> Result<(), StoreError>;

    /// Server-side apply a StatefulSet, forcing ownership of the fields it sets.
    ///
    /// Namespace and name are taken from the object metadata.
    async fn apply_statefulset(&self, statefulset: &StatefulSet, field_owner: &str) -> Result<StatefulSet, StoreError>;

    /// List StatefulSets in a namespace matching a label selector (`k=v[,k=v]`).
    async fn list_statefulsets(&self, namespace: &str, label_selector: &str) -> Result<Vec<StatefulSet>, StoreError>;

    /// Delete a StatefulSet by name.
    async fn delete_statefulset(&self, namespace: &str, name: &str) -> Result<(), StoreError>;
}
