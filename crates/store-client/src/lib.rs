//! Kubernetes Object Store Client
//!
//! The narrow slice of the Kubernetes API the StatefulSetWorkload controller
//! needs: reading workloads, patching their status, and applying, listing
//! and deleting StatefulSets.
//!
//! # Example
//!
//! ```no_run
//! use store_client::{StoreClient, StoreClientTrait};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = StoreClient::try_default().await?;
//!
//! // Fetch a workload
//! if let Some(workload) = client.get_workload("default", "web").await? {
//!     println!("{} containers", workload.spec.containers.len());
//! }
//!
//! // List the StatefulSets a workload owns
//! let children = client
//!     .list_statefulsets("default", "statefulsetworkload.oam.crossplane.io=web")
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **test-util**: exposes `MockStoreClient`, an in-memory store for tests

pub mod client;
pub mod error;
#[path = "trait.rs"]
pub mod store_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::StoreClient;
pub use error::StoreError;
pub use store_trait::StoreClientTrait;
#[cfg(feature = "test-util")]
pub use mock::{MockStoreClient, WriteCounters};
