//! Server-side apply of rendered children.

use k8s_openapi::api::apps::v1::StatefulSet;
use store_client::{StoreClientTrait, StoreError};
use thiserror::Error;
use tracing::debug;

/// Failure to apply a child StatefulSet.
#[derive(Debug, Error)]
pub enum ApplyError {
    /// Another field manager owns the fields, or the object changed underneath us
    #[error("conflict: {0}")]
    Conflict(String),

    /// Rejected by validation, admission or an immutable-field check
    #[error("rejected: {0}")]
    Rejected(String),

    /// Any other store failure
    #[error(transparent)]
    Store(StoreError),

    /// The store returned the applied object without a uid
    #[error("applied statefulset {0} has no uid")]
    MissingUid(String),
}

impl From<StoreError> for ApplyError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => ApplyError::Conflict(msg),
            StoreError::Rejected(msg) => ApplyError::Rejected(msg),
            other => ApplyError::Store(other),
        }
    }
}

/// Applies `child` with `field_owner` as field manager and returns the stored object.
///
/// Applying an unchanged object is a no-op at the store. The returned object
/// is guaranteed to carry a uid.
pub async fn apply(
    store: &dyn StoreClientTrait,
    child: &StatefulSet,
    field_owner: &str,
) -> Result<StatefulSet, ApplyError> {
    let applied = store.apply_statefulset(child, field_owner).await?;

    let name = applied.metadata.name.clone().unwrap_or_default();
    if applied.metadata.uid.as_deref().is_none_or(str::is_empty) {
        return Err(ApplyError::MissingUid(name));
    }

    debug!(
        "Applied StatefulSet {}/{} (resourceVersion {})",
        applied.metadata.namespace.as_deref().unwrap_or_default(),
        name,
        applied.metadata.resource_version.as_deref().unwrap_or("unknown")
    );
    Ok(applied)
}
