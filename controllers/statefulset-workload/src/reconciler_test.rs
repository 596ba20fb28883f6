//! Unit tests for the StatefulSetWorkload reconciler
//!
//! Each test drives `Reconciler::reconcile` against the in-memory store.

#[cfg(test)]
mod tests {
    use crate::config::{ControllerConfig, DEFAULT_LABEL_KEY};
    use crate::error::{ReconcileError, ReconcileStep};
    use crate::applier::ApplyError;
    use crate::reconciler::{ReconcileOutcome, WorkloadKey};
    use crate::test_utils::*;
    use crate::watcher::error_policy;
    use crds::{ConditionReason, ContainerEnvVar, ContainerPort, StatefulSetWorkloadSpec};
    use kube_runtime::controller::Action;
    use std::sync::Arc;
    use std::time::Duration;
    use store_client::{MockStoreClient, StoreError};

    fn seeded(workload: &crds::StatefulSetWorkload) -> (MockStoreClient, WorkloadKey) {
        let store = MockStoreClient::new();
        store.add_workload(workload.clone());
        let key = WorkloadKey::new(
            workload.metadata.namespace.clone().unwrap(),
            workload.metadata.name.clone().unwrap(),
        );
        (store, key)
    }

    #[tokio::test]
    async fn test_nginx_workload_synced() {
        let workload = create_test_workload("web", "apps", vec![nginx_container()]);
        let (store, key) = seeded(&workload);
        let reconciler = create_test_reconciler(&store);

        let outcome = reconciler.reconcile(&key).await.unwrap();

        let child = store.statefulset("apps", "web").expect("child created");
        let child_uid = child.metadata.uid.clone().unwrap();
        assert_eq!(
            child.metadata.labels.as_ref().and_then(|l| l.get(DEFAULT_LABEL_KEY)),
            workload.metadata.uid.as_ref()
        );
        let containers = child.spec.unwrap().template.spec.unwrap().containers;
        let port = containers[0].ports.clone().unwrap().remove(0);
        assert_eq!((port.name.as_deref(), port.container_port, port.protocol.as_deref()), (Some("http"), 80, Some("TCP")));

        let ReconcileOutcome::Synced { resources, collected } = outcome else {
            panic!("expected Synced");
        };
        assert_eq!(collected, 0);
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].uid, child_uid);

        let status = store.workload("apps", "web").unwrap().status.unwrap();
        assert_eq!(status.resources, resources);
        let latest = status.latest_condition().unwrap();
        assert_eq!(latest.reason, ConditionReason::ReconcileSuccess);
        assert_eq!(store.field_owner("apps", "web").as_deref(), Some("web"));
    }

    #[tokio::test]
    async fn test_second_reconcile_does_not_mutate_child() {
        let workload = create_test_workload("web", "apps", vec![nginx_container()]);
        let (store, key) = seeded(&workload);
        let reconciler = create_test_reconciler(&store);

        reconciler.reconcile(&key).await.unwrap();
        let before = store.statefulset("apps", "web").unwrap();
        reconciler.reconcile(&key).await.unwrap();
        let after = store.statefulset("apps", "web").unwrap();

        assert_eq!(store.counters().apply_mutations, 1);
        assert_eq!(before.metadata.resource_version, after.metadata.resource_version);

        let status = store.workload("apps", "web").unwrap().status.unwrap();
        assert_eq!(status.conditions.len(), 2);
        assert_eq!(status.resources.len(), 1);
    }

    #[tokio::test]
    async fn test_secret_env_var_rendered() {
        let mut container = nginx_container();
        container.environment = vec![ContainerEnvVar::from_secret("DB_PASS", "db-creds", "password")];
        let workload = create_test_workload("db", "apps", vec![container]);
        let (store, key) = seeded(&workload);

        create_test_reconciler(&store).reconcile(&key).await.unwrap();

        let child = store.statefulset("apps", "db").unwrap();
        let env = child.spec.unwrap().template.spec.unwrap().containers[0].env.clone().unwrap();
        assert_eq!(env[0].name, "DB_PASS");
        assert_eq!(env[0].value, None);
        let value = serde_json::to_value(&env[0]).unwrap();
        assert_eq!(value["valueFrom"]["secretKeyRef"]["name"], "db-creds");
        assert_eq!(value["valueFrom"]["secretKeyRef"]["key"], "password");
    }

    #[tokio::test]
    async fn test_apply_conflict_recorded_and_retried() {
        let workload = create_test_workload("web", "apps", vec![nginx_container()]);
        let (store, key) = seeded(&workload);
        let reconciler = Arc::new(create_test_reconciler(&store));
        store.fail_next_apply(StoreError::Conflict("field manager conflict".to_string()));

        let err = reconciler.reconcile(&key).await.unwrap_err();

        assert!(matches!(err, ReconcileError::Apply(ApplyError::Conflict(_))));
        assert!(store.statefulsets_in("apps").is_empty());

        let status = store.workload("apps", "web").unwrap().status.unwrap();
        assert!(status.resources.is_empty());
        let latest = status.latest_condition().unwrap();
        assert_eq!(latest.reason, ConditionReason::ReconcileError);
        assert!(latest.message.as_deref().unwrap().starts_with("cannot apply the statefulset"));

        let action = error_policy(Arc::new(workload), &err, reconciler.clone());
        assert_eq!(action, Action::requeue(Duration::from_secs(30)));
        assert_eq!(reconciler.metrics.failures(ReconcileStep::Apply), 1);
    }

    #[tokio::test]
    async fn test_service_rename_collects_old_child() {
        let mut workload = create_test_workload("web", "apps", vec![nginx_container()]);
        workload.spec.service_name = Some("a".to_string());
        let (store, key) = seeded(&workload);
        let reconciler = create_test_reconciler(&store);

        reconciler.reconcile(&key).await.unwrap();
        assert!(store.statefulset("apps", "a").is_some());

        store.update_workload_spec("apps", "web", StatefulSetWorkloadSpec {
            containers: vec![nginx_container()],
            service_name: Some("b".to_string()),
        });
        let outcome = reconciler.reconcile(&key).await.unwrap();

        let ReconcileOutcome::Synced { resources, collected } = outcome else {
            panic!("expected Synced");
        };
        assert_eq!(collected, 1);
        assert!(store.statefulset("apps", "a").is_none());
        let child = store.statefulset("apps", "b").unwrap();
        assert_eq!(service_name_of(&child).as_deref(), Some("b"));

        let status = store.workload("apps", "web").unwrap().status.unwrap();
        assert_eq!(status.resources, resources);
        assert_eq!(status.resources.len(), 1);
        assert_eq!(status.resources[0].name, "b");
    }

    #[tokio::test]
    async fn test_missing_workload_writes_nothing() {
        let store = MockStoreClient::new();
        let reconciler = create_test_reconciler(&store);

        let outcome = reconciler.reconcile(&WorkloadKey::new("apps", "ghost")).await.unwrap();

        assert_eq!(outcome, ReconcileOutcome::Deleted);
        assert_eq!(store.counters().total_writes(), 0);
    }

    #[tokio::test]
    async fn test_translation_error_recorded_without_apply() {
        let mut container = nginx_container();
        container.environment = vec![ContainerEnvVar {
            name: "BROKEN".to_string(),
            value: None,
            from_secret: None,
        }];
        let workload = create_test_workload("web", "apps", vec![container]);
        let (store, key) = seeded(&workload);

        let err = create_test_reconciler(&store).reconcile(&key).await.unwrap_err();

        assert_eq!(err.step(), ReconcileStep::Translate);
        assert_eq!(store.counters().applies, 0);
        let latest = store.workload("apps", "web").unwrap().status.unwrap().conditions.pop().unwrap();
        assert!(latest.message.unwrap().starts_with("cannot render workload"));
    }

    #[tokio::test]
    async fn test_zero_containers_rejected_by_store() {
        let workload = create_test_workload("empty", "apps", vec![]);
        let (store, key) = seeded(&workload);

        let err = create_test_reconciler(&store).reconcile(&key).await.unwrap_err();

        assert!(matches!(err, ReconcileError::Apply(ApplyError::Rejected(_))));
        let status = store.workload("apps", "empty").unwrap().status.unwrap();
        assert_eq!(status.latest_condition().unwrap().reason, ConditionReason::ReconcileError);
    }

    #[tokio::test]
    async fn test_duplicate_port_names_rejected_by_store() {
        let mut container = nginx_container();
        container.ports.push(ContainerPort {
            name: "http".to_string(),
            port: 8080,
            protocol: None,
        });
        let workload = create_test_workload("web", "apps", vec![container]);
        let (store, key) = seeded(&workload);

        let err = create_test_reconciler(&store).reconcile(&key).await.unwrap_err();

        assert_eq!(err.step(), ReconcileStep::Apply);
        assert!(matches!(err, ReconcileError::Apply(ApplyError::Rejected(_))));
        assert!(store.statefulset("apps", "web").is_none());
        let latest = store.workload("apps", "web").unwrap().status.unwrap().conditions.pop().unwrap();
        assert_eq!(latest.reason, ConditionReason::ReconcileError);
        assert!(latest.message.unwrap().contains("Duplicate value: \"http\""));
    }

    #[tokio::test]
    async fn test_collect_failure_reported_after_children_recorded() {
        let workload = create_test_workload("web", "apps", vec![nginx_container()]);
        let (store, key) = seeded(&workload);
        let uid = workload.metadata.uid.clone().unwrap();
        store.add_statefulset(labeled_statefulset("web-old", "apps", &uid));
        store.fail_deletes_of("web-old");

        let err = create_test_reconciler(&store).reconcile(&key).await.unwrap_err();

        assert_eq!(err.step(), ReconcileStep::Collect);
        let status = store.workload("apps", "web").unwrap().status.unwrap();
        assert_eq!(status.resources.len(), 1);
        assert_eq!(status.resources[0].name, "web");
        let message = status.latest_condition().unwrap().message.clone().unwrap();
        assert!(message.starts_with("cannot clean up stale statefulsets"));
        assert!(message.contains("web-old"));
    }

    #[tokio::test]
    async fn test_failed_failure_record_returns_original_error() {
        let workload = create_test_workload("web", "apps", vec![nginx_container()]);
        let (store, key) = seeded(&workload);
        store.fail_next_apply(StoreError::Conflict("contended".to_string()));
        store.fail_next_status_patch(StoreError::Api { code: 500, message: "etcd down".to_string() });

        let err = create_test_reconciler(&store).reconcile(&key).await.unwrap_err();

        assert_eq!(err.step(), ReconcileStep::Apply);
        assert!(store.workload("apps", "web").unwrap().status.is_none());
    }

    #[tokio::test]
    async fn test_success_record_failure_is_status_persist() {
        let workload = create_test_workload("web", "apps", vec![nginx_container()]);
        let (store, key) = seeded(&workload);
        let reconciler = create_test_reconciler(&store);
        reconciler.reconcile(&key).await.unwrap();

        store.fail_next_status_patch(StoreError::Api { code: 500, message: "etcd down".to_string() });
        let err = reconciler.reconcile(&key).await.unwrap_err();

        assert!(matches!(err, ReconcileError::StatusPersist(_)));
        assert_eq!(err.step(), ReconcileStep::RecordSuccess);
    }

    #[tokio::test]
    async fn test_fetch_error_writes_nothing() {
        struct FailingGet;

        #[async_trait::async_trait]
        impl store_client::StoreClientTrait for FailingGet {
            async fn get_workload(&self, _: &str, _: &str) -> Result<Option<crds::StatefulSetWorkload>, StoreError> {
                Err(StoreError::Api { code: 503, message: "unavailable".to_string() })
            }
            async fn patch_workload_status(&self, _: &str, _: &str, _: &serde_json::Value) -> Result<(), StoreError> {
                panic!("no status write expected")
            }
            async fn apply_statefulset(
                &self,
                _: &k8s_openapi::api::apps::v1::StatefulSet,
                _: &str,
            ) -> Result<k8s_openapi::api::apps::v1::StatefulSet, StoreError> {
                panic!("no apply expected")
            }
            async fn list_statefulsets(&self, _: &str, _: &str) -> Result<Vec<k8s_openapi::api::apps::v1::StatefulSet>, StoreError> {
                panic!("no list expected")
            }
            async fn delete_statefulset(&self, _: &str, _: &str) -> Result<(), StoreError> {
                panic!("no delete expected")
            }
        }

        let reconciler = crate::reconciler::Reconciler::new(
            Box::new(FailingGet),
            ControllerConfig::default(),
            crate::metrics::Metrics::new().unwrap(),
        );
        let err = reconciler.reconcile(&WorkloadKey::new("apps", "web")).await.unwrap_err();
        assert_eq!(err.step(), ReconcileStep::Fetch);
    }

    #[tokio::test]
    async fn test_condition_history_is_bounded() {
        let workload = create_test_workload("web", "apps", vec![nginx_container()]);
        let (store, key) = seeded(&workload);
        let config = ControllerConfig {
            max_conditions: 2,
            ..Default::default()
        };
        let reconciler = create_test_reconciler_with(&store, config);

        for _ in 0..4 {
            reconciler.reconcile(&key).await.unwrap();
        }

        let status = store.workload("apps", "web").unwrap().status.unwrap();
        assert_eq!(status.conditions.len(), 2);
    }
}
