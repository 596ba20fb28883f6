//! Test utilities for unit testing the reconcile steps
//!
//! This module provides helpers for creating test data and setting up test scenarios.

use crate::config::{ControllerConfig, DEFAULT_LABEL_KEY};
use crate::metrics::Metrics;
use crate::reconciler::Reconciler;
use crds::{Container, ContainerPort, StatefulSetWorkload, StatefulSetWorkloadSpec};
use k8s_openapi::api::apps::v1::{StatefulSet, StatefulSetSpec};
use k8s_openapi::api::core::v1::{Container as PodContainer, PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use std::collections::BTreeMap;
use store_client::MockStoreClient;

/// Helper to create a test StatefulSetWorkload with a fresh uid
pub fn create_test_workload(name: &str, namespace: &str, containers: Vec<Container>) -> StatefulSetWorkload {
    StatefulSetWorkload {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            uid: Some(uuid::Uuid::new_v4().to_string()),
            ..Default::default()
        },
        spec: StatefulSetWorkloadSpec {
            containers,
            service_name: None,
        },
        status: None,
    }
}

/// Helper to create a container serving http on port 80
pub fn nginx_container() -> Container {
    Container {
        name: "nginx".to_string(),
        image: "nginx:1.21".to_string(),
        ports: vec![ContainerPort {
            name: "http".to_string(),
            port: 80,
            protocol: None,
        }],
        ..Default::default()
    }
}

/// Helper to create a StatefulSet labeled as a child of the workload with `workload_uid`
pub fn labeled_statefulset(name: &str, namespace: &str, workload_uid: &str) -> StatefulSet {
    let labels = BTreeMap::from([(DEFAULT_LABEL_KEY.to_string(), workload_uid.to_string())]);
    StatefulSet {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(StatefulSetSpec {
            service_name: name.to_string().into(),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![PodContainer {
                        name: "main".to_string(),
                        image: Some("busybox".to_string()),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        status: None,
    }
}

/// Helper to create a reconciler backed by `store` with the default config
pub fn create_test_reconciler(store: &MockStoreClient) -> Reconciler {
    create_test_reconciler_with(store, ControllerConfig::default())
}

/// Helper to create a reconciler backed by `store` with `config`
pub fn create_test_reconciler_with(store: &MockStoreClient, config: ControllerConfig) -> Reconciler {
    Reconciler::new(Box::new(store.clone()), config, Metrics::new().unwrap())
}

/// The `serviceName` of a StatefulSet, read through its JSON form
pub fn service_name_of(statefulset: &StatefulSet) -> Option<String> {
    let value = serde_json::to_value(statefulset).unwrap();
    value["spec"]["serviceName"].as_str().map(str::to_string)
}
