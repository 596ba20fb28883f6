//! Status types shared by workload CRDs
//!
//! Conditions follow the Crossplane `Synced` condition layout so existing
//! tooling can read them: a `ReconcileSuccess` or `ReconcileError` reason, a
//! True/False status, a message, and a transition time.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Condition type. Reconcile outcomes are always reported as `Synced`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
pub enum ConditionType {
    /// The resource has (or has not) been synced with its managed resources
    #[default]
    Synced,
}

/// Condition status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum ConditionStatus {
    /// Condition holds
    True,
    /// Condition does not hold
    False,
}

/// Outcome kind of a reconcile
///
/// Serializes as PascalCase ("ReconcileSuccess", "ReconcileError").
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum ConditionReason {
    /// Reconcile completed
    ReconcileSuccess,
    /// Reconcile failed at some step
    ReconcileError,
}

/// A single reconcile outcome recorded on the status
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Condition type
    #[serde(rename = "type")]
    pub type_: ConditionType,

    /// Whether the condition holds
    pub status: ConditionStatus,

    /// Outcome kind
    pub reason: ConditionReason,

    /// Human-readable detail, the error chain for failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// When the condition was recorded
    pub last_transition_time: DateTime<Utc>,
}

impl Condition {
    /// Successful reconcile
    pub fn reconcile_success(at: DateTime<Utc>) -> Self {
        Self {
            type_: ConditionType::Synced,
            status: ConditionStatus::True,
            reason: ConditionReason::ReconcileSuccess,
            message: None,
            last_transition_time: at,
        }
    }

    /// Failed reconcile with the error message
    pub fn reconcile_error(message: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            type_: ConditionType::Synced,
            status: ConditionStatus::False,
            reason: ConditionReason::ReconcileError,
            message: Some(message.into()),
            last_transition_time: at,
        }
    }

    /// True for `ReconcileSuccess` conditions
    pub fn is_success(&self) -> bool {
        self.reason == ConditionReason::ReconcileSuccess
    }
}

/// Pointer to a managed Kubernetes object
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub struct TypedReference {
    /// API version of the referenced object (e.g., "apps/v1")
    pub api_version: String,

    /// Kind of the referenced object (e.g., "StatefulSet")
    pub kind: String,

    /// Name of the referenced object
    pub name: String,

    /// UID of the referenced object
    pub uid: String,
}
