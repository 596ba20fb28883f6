//! StatefulSetWorkload CRD
//!
//! Declares an OAM-style workload made of OCI containers that the controller
//! renders into a native `apps/v1` StatefulSet.

use crate::status::{Condition, TypedReference};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// API group of the StatefulSetWorkload CRD
pub const API_GROUP: &str = "core.oam.dev";

/// API version of the StatefulSetWorkload CRD
pub const API_VERSION: &str = "v1alpha2";

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[kube(
    group = "core.oam.dev",
    version = "v1alpha2",
    kind = "StatefulSetWorkload",
    namespaced,
    status = "StatefulSetWorkloadStatus",
    category = "crossplane",
    category = "oam",
    shortname = "ssw"
)]
#[serde(rename_all = "camelCase")]
pub struct StatefulSetWorkloadSpec {
    /// Containers of which this workload consists
    pub containers: Vec<Container>,

    /// Governing service name of the rendered StatefulSet (defaults to the workload name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
}

/// An Open Containers Initiative (OCI) container.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    /// Name of this container. Must be unique within its workload.
    pub name: String,

    /// Image this container should run. Must be a path-like or URI-like
    /// representation of an OCI image, optionally prefixed with a registry
    /// address and suffixed with a tag.
    pub image: String,

    /// Command to be run by this container
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,

    /// Arguments to be passed to the command run by this container
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Vec<String>>,

    /// Environment variables that should be set within this container
    #[serde(rename = "env", default, skip_serializing_if = "Vec::is_empty")]
    pub environment: Vec<ContainerEnvVar>,

    /// Configuration files that should be written within this container
    #[serde(rename = "config", default, skip_serializing_if = "Vec::is_empty")]
    pub config_files: Vec<ContainerConfigFile>,

    /// Ports exposed by this container
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<ContainerPort>,
}

/// Reference to a key of a Secret in the workload's namespace.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SecretKeySelector {
    /// Name of the secret
    pub name: String,

    /// Key to select
    pub key: String,
}

/// Environment variable set within a container.
///
/// Exactly one of `value` and `fromSecret` must be set.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerEnvVar {
    /// Name of the environment variable
    #[schemars(regex(pattern = r"^[-_a-zA-Z0-9]+$"))]
    pub name: String,

    /// Literal value of the environment variable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Secret key whose content becomes the value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_secret: Option<SecretKeySelector>,
}

impl ContainerEnvVar {
    /// Environment variable with a literal value
    pub fn literal(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
            from_secret: None,
        }
    }

    /// Environment variable sourced from a secret key
    pub fn from_secret(name: impl Into<String>, secret: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            from_secret: Some(SecretKeySelector {
                name: secret.into(),
                key: key.into(),
            }),
        }
    }

    /// Resolves the single populated value source
    pub fn source(&self) -> Option<ValueSource<'_>> {
        ValueSource::resolve(self.value.as_deref(), self.from_secret.as_ref())
    }
}

/// Configuration file written within a container.
///
/// Exactly one of `value` and `fromSecret` must be set.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerConfigFile {
    /// Path within the container at which the file is written
    pub path: String,

    /// Literal file content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Secret key whose content is written to the file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_secret: Option<SecretKeySelector>,
}

impl ContainerConfigFile {
    /// Resolves the single populated value source
    pub fn source(&self) -> Option<ValueSource<'_>> {
        ValueSource::resolve(self.value.as_deref(), self.from_secret.as_ref())
    }
}

/// The value source of an environment variable or config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource<'a> {
    /// Literal string
    Literal(&'a str),
    /// Secret key reference
    Secret(&'a SecretKeySelector),
}

impl<'a> ValueSource<'a> {
    /// Returns `None` unless exactly one of the two sources is populated
    fn resolve(value: Option<&'a str>, secret: Option<&'a SecretKeySelector>) -> Option<Self> {
        match (value, secret) {
            (Some(v), None) => Some(Self::Literal(v)),
            (None, Some(s)) => Some(Self::Secret(s)),
            _ => None,
        }
    }
}

/// Transport layer protocol of a container port
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransportProtocol {
    /// TCP
    #[default]
    Tcp,
    /// UDP
    Udp,
}

impl TransportProtocol {
    /// Protocol name as used by the core/v1 ContainerPort API
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportProtocol::Tcp => "TCP",
            TransportProtocol::Udp => "UDP",
        }
    }
}

/// Port exposed by a container.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerPort {
    /// Name of this port. Must be unique within its container.
    #[schemars(regex(pattern = r"^[a-z]+$"))]
    pub name: String,

    /// Port number. Must be unique within its container.
    #[serde(rename = "containerPort")]
    pub port: i32,

    /// Protocol used by the server listening on this port (TCP when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<TransportProtocol>,
}

/// Observed state of a StatefulSetWorkload
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct StatefulSetWorkloadStatus {
    /// Reconcile outcomes, oldest first. The last entry reflects the latest reconcile.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    /// Resources currently managed by this workload
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<TypedReference>,
}

impl StatefulSetWorkloadStatus {
    /// Most recent condition, if any
    pub fn latest_condition(&self) -> Option<&Condition> {
        self.conditions.last()
    }
}
