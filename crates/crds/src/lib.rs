//! Workload CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the StatefulSetWorkload controller.

pub mod statefulset_workload;
pub mod status;

pub use statefulset_workload::*;
pub use status::*;
