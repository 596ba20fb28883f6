//! Kubernetes-backed store client

use crate::error::StoreError;
use crate::store_trait::StoreClientTrait;
use crds::StatefulSetWorkload;
use k8s_openapi::api::apps::v1::StatefulSet;
use kube::api::{Api, DeleteParams, ListParams, Patch, PatchParams};
use kube::Client;
use tracing::debug;

/// Store client talking to the Kubernetes API server.
///
/// Holds only the shared `kube::Client`; an `Api` handle is built per call
/// for the namespace being addressed.
#[derive(Clone)]
pub struct StoreClient {
    client: Client,
}

impl std::fmt::Debug for StoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreClient").finish_non_exhaustive()
    }
}

impl StoreClient {
    /// Create a store client from an existing kube client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Create a store client from the in-cluster or kubeconfig environment
    pub async fn try_default() -> Result<Self, StoreError> {
        let client = Client::try_default().await?;
        Ok(Self::new(client))
    }

    /// The underlying kube client
    pub fn kube_client(&self) -> Client {
        self.client.clone()
    }

    fn workloads(&self, namespace: &str) -> Api<StatefulSetWorkload> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn statefulsets(&self, namespace: &str) -> Api<StatefulSet> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait::async_trait]
impl StoreClientTrait for StoreClient {
    async fn get_workload(&self, namespace: &str, name: &str) -> Result<Option<StatefulSetWorkload>, StoreError> {
        Ok(self.workloads(namespace).get_opt(name).await?)
    }

    async fn patch_workload_status(&self, namespace: &str, name: &str, patch: &serde_json::Value) -> Result<(), StoreError> {
        self.workloads(namespace)
            .patch_status(name, &PatchParams::default(), &Patch::Merge(patch))
            .await?;
        Ok(())
    }

    async fn apply_statefulset(&self, statefulset: &StatefulSet, field_owner: &str) -> Result<StatefulSet, StoreError> {
        let name = statefulset.metadata.name.as_deref()
            .ok_or_else(|| StoreError::InvalidRequest("StatefulSet missing name".to_string()))?;
        let namespace = statefulset.metadata.namespace.as_deref()
            .ok_or_else(|| StoreError::InvalidRequest("StatefulSet missing namespace".to_string()))?;

        debug!("Applying StatefulSet {}/{} as {}", namespace, name, field_owner);

        // Server-side apply: only the fields we set are touched
        let pp = PatchParams::apply(field_owner).force();
        Ok(self.statefulsets(namespace)
            .patch(name, &pp, &Patch::Apply(statefulset))
            .await?)
    }

    async fn list_statefulsets(&self, namespace: &str, label_selector: &str) -> Result<Vec<StatefulSet>, StoreError> {
        let lp = ListParams::default().labels(label_selector);
        Ok(self.statefulsets(namespace).list(&lp).await?.items)
    }

    async fn delete_statefulset(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        self.statefulsets(namespace)
            .delete(name, &DeleteParams::background())
            .await?;
        Ok(())
    }
}
