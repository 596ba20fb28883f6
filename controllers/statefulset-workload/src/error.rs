//! Controller-specific error types.
//!
//! `ControllerError` covers startup and runtime failures of the process.
//! `ReconcileError` is the result of a single reconcile and always names the
//! step that failed.

use crate::applier::ApplyError;
use crate::collector::CollectError;
use crate::translator::TranslationError;
use std::fmt;
use store_client::StoreError;
use thiserror::Error;

/// Errors that can occur in the StatefulSetWorkload Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Store(#[from] StoreError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Probe server I/O error
    #[error("Probe server error: {0}")]
    Server(#[from] std::io::Error),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}

/// Reconcile step names, used in logs and metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReconcileStep {
    /// Reading the workload
    Fetch,
    /// Rendering the child StatefulSet
    Translate,
    /// Server-side apply of the child
    Apply,
    /// Writing `status.resources`
    RecordChildren,
    /// Deleting stale children
    Collect,
    /// Writing the success condition
    RecordSuccess,
}

impl ReconcileStep {
    /// Stable name used in logs and metric labels
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileStep::Fetch => "fetch",
            ReconcileStep::Translate => "translate",
            ReconcileStep::Apply => "apply",
            ReconcileStep::RecordChildren => "record_children",
            ReconcileStep::Collect => "collect",
            ReconcileStep::RecordSuccess => "record_success",
        }
    }
}

impl fmt::Display for ReconcileStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a single reconcile, tagged with the failing step.
///
/// The display string is what ends up in the workload's error condition.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The workload could not be read
    #[error("cannot get workload: {0}")]
    Fetch(#[source] StoreError),

    /// The workload spec could not be rendered
    #[error("cannot render workload: {0}")]
    Translate(#[from] TranslationError),

    /// The child was not applied
    #[error("cannot apply the statefulset: {0}")]
    Apply(#[from] ApplyError),

    /// `status.resources` could not be written
    #[error("cannot record owned resources: {0}")]
    RecordChildren(#[source] StoreError),

    /// One or more stale children were not deleted
    #[error("cannot clean up stale statefulsets: {0}")]
    Collect(#[from] CollectError),

    /// The success condition could not be written
    #[error("cannot apply status: {0}")]
    StatusPersist(#[source] StoreError),
}

impl ReconcileError {
    /// The step this error was raised in
    pub fn step(&self) -> ReconcileStep {
        match self {
            ReconcileError::Fetch(_) => ReconcileStep::Fetch,
            ReconcileError::Translate(_) => ReconcileStep::Translate,
            ReconcileError::Apply(_) => ReconcileStep::Apply,
            ReconcileError::RecordChildren(_) => ReconcileStep::RecordChildren,
            ReconcileError::Collect(_) => ReconcileStep::Collect,
            ReconcileError::StatusPersist(_) => ReconcileStep::RecordSuccess,
        }
    }
}
