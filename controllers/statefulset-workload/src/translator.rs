//! Renders a StatefulSetWorkload into the StatefulSet it manages.
//!
//! Translation is pure: the same workload and config always produce the same
//! objects, field for field. Labels use `BTreeMap` and container, env and
//! port lists keep declaration order.

use crate::config::ControllerConfig;
use crds::{Container as WorkloadContainer, ContainerEnvVar, ContainerPort as WorkloadPort, StatefulSetWorkload, ValueSource};
use k8s_openapi::api::apps::v1::{StatefulSet, StatefulSetSpec};
use k8s_openapi::api::core::v1::{Container, ContainerPort, EnvVar, EnvVarSource, PodSpec, PodTemplateSpec, SecretKeySelector};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::Resource;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::warn;

/// API version of rendered children
pub const STATEFULSET_API_VERSION: &str = "apps/v1";

/// Kind of rendered children
pub const STATEFULSET_KIND: &str = "StatefulSet";

#[allow(clippy::expect_used, reason = "pattern is a compile-time constant")]
static ENV_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-_a-zA-Z0-9]+$").expect("hardcoded regex pattern is valid"));

/// A workload that cannot be rendered into a StatefulSet.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TranslationError {
    #[error("workload has no name")]
    MissingName,

    #[error("workload {0} has no uid")]
    MissingUid(String),

    #[error("container {container}: environment variable {name} must set exactly one of value and fromSecret")]
    AmbiguousEnvSource { container: String, name: String },

    #[error("container {container}: invalid environment variable name {name:?}")]
    InvalidEnvName { container: String, name: String },

    #[error("container {container}: config file {path} must set exactly one of value and fromSecret")]
    AmbiguousConfigSource { container: String, path: String },

    #[error("container {container}: duplicate config file path {path}")]
    DuplicateConfigPath { container: String, path: String },
}

/// Namespace a workload's children live in.
pub fn child_namespace(workload: &StatefulSetWorkload, config: &ControllerConfig) -> String {
    workload.metadata.namespace.clone()
        .filter(|ns| !ns.is_empty())
        .unwrap_or_else(|| config.default_namespace.clone())
}

/// `spec.serviceName` when set, otherwise the workload name.
pub fn service_name(workload: &StatefulSetWorkload) -> Option<String> {
    workload.spec.service_name.clone()
        .filter(|s| !s.is_empty())
        .or_else(|| workload.metadata.name.clone())
}

/// Translates a workload into its managed StatefulSets.
///
/// Currently always yields exactly one child, named after the resolved
/// service name and labeled with the workload uid.
pub fn translate(workload: &StatefulSetWorkload, config: &ControllerConfig) -> Result<Vec<StatefulSet>, TranslationError> {
    let name = workload.metadata.name.as_deref()
        .filter(|n| !n.is_empty())
        .ok_or(TranslationError::MissingName)?;
    let uid = workload.metadata.uid.as_deref()
        .filter(|u| !u.is_empty())
        .ok_or_else(|| TranslationError::MissingUid(name.to_string()))?;

    let containers = workload.spec.containers.iter()
        .map(translate_container)
        .collect::<Result<Vec<_>, _>>()?;

    if workload.spec.containers.iter().any(|c| !c.config_files.is_empty()) {
        warn!("Workload {} declares config files; they are validated but not written to containers", name);
    }

    let service = service_name(workload).unwrap_or_else(|| name.to_string());
    let labels = BTreeMap::from([(config.label_key.clone(), uid.to_string())]);

    let statefulset = StatefulSet {
        metadata: ObjectMeta {
            name: Some(service.clone()),
            namespace: Some(child_namespace(workload, config)),
            labels: Some(labels.clone()),
            owner_references: workload.controller_owner_ref(&()).map(|owner| vec![owner]),
            ..Default::default()
        },
        spec: Some(StatefulSetSpec {
            service_name: service.into(),
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
                    containers,
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        status: None,
    };

    Ok(vec![statefulset])
}

fn translate_container(container: &WorkloadContainer) -> Result<Container, TranslationError> {
    let env = container.environment.iter()
        .map(|var| translate_env_var(&container.name, var))
        .collect::<Result<Vec<_>, _>>()?;

    let mut paths = HashSet::new();
    for file in &container.config_files {
        if file.source().is_none() {
            return Err(TranslationError::AmbiguousConfigSource {
                container: container.name.clone(),
                path: file.path.clone(),
            });
        }
        if !paths.insert(file.path.as_str()) {
            return Err(TranslationError::DuplicateConfigPath {
                container: container.name.clone(),
                path: file.path.clone(),
            });
        }
    }

    Ok(Container {
        name: container.name.clone(),
        image: Some(container.image.clone()),
        command: container.command.clone(),
        args: container.arguments.clone(),
        env: (!env.is_empty()).then_some(env),
        ports: (!container.ports.is_empty()).then(|| container.ports.iter().map(translate_port).collect()),
        ..Default::default()
    })
}

fn translate_env_var(container: &str, var: &ContainerEnvVar) -> Result<EnvVar, TranslationError> {
    if !ENV_NAME.is_match(&var.name) {
        return Err(TranslationError::InvalidEnvName {
            container: container.to_string(),
            name: var.name.clone(),
        });
    }

    match var.source() {
        Some(ValueSource::Literal(value)) => Ok(EnvVar {
            name: var.name.clone(),
            value: Some(value.to_string()),
            value_from: None,
        }),
        Some(ValueSource::Secret(secret)) => Ok(EnvVar {
            name: var.name.clone(),
            value: None,
            value_from: Some(EnvVarSource {
                secret_key_ref: Some(SecretKeySelector {
                    name: secret.name.clone().into(),
                    key: secret.key.clone(),
                    optional: None,
                }),
                ..Default::default()
            }),
        }),
        None => Err(TranslationError::AmbiguousEnvSource {
            container: container.to_string(),
            name: var.name.clone(),
        }),
    }
}

fn translate_port(port: &WorkloadPort) -> ContainerPort {
    ContainerPort {
        name: Some(port.name.clone()),
        container_port: port.port,
        protocol: Some(port.protocol.unwrap_or_default().as_str().to_string()),
        ..Default::default()
    }
}
