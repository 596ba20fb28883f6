//! Garbage collection of stale children.
//!
//! A workload's children are found by label (`<label_key>=<workload uid>`).
//! Anything labeled for the workload that is not the child just applied is a
//! leftover from an earlier identity (e.g., a renamed service) and is deleted.

use crds::StatefulSetWorkload;
use store_client::{StoreClientTrait, StoreError};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Failure to collect stale children.
#[derive(Debug, Error)]
pub enum CollectError {
    /// Listing candidate children failed; nothing was deleted
    #[error("cannot list statefulsets: {0}")]
    List(#[source] StoreError),

    /// Some deletions failed; the others went through
    #[error("cannot delete {}", describe_failures(.failed))]
    PartialFailure {
        /// Names of children that could not be deleted, with the cause
        failed: Vec<(String, StoreError)>,
    },
}

fn describe_failures(failed: &[(String, StoreError)]) -> String {
    failed.iter()
        .map(|(name, err)| format!("{}: {}", name, err))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Deletes every child labeled for `workload` whose uid is not in `current_uids`.
///
/// Returns the number of children deleted. A child that disappears before we
/// delete it counts as collected.
pub async fn collect(
    store: &dyn StoreClientTrait,
    workload: &StatefulSetWorkload,
    namespace: &str,
    current_uids: &[String],
    label_key: &str,
) -> Result<usize, CollectError> {
    let workload_uid = workload.metadata.uid.as_deref().unwrap_or_default();
    let selector = format!("{}={}", label_key, workload_uid);

    let candidates = store.list_statefulsets(namespace, &selector).await
        .map_err(CollectError::List)?;

    let mut deleted = 0;
    let mut failed = Vec::new();

    for child in candidates {
        if child.metadata.uid.as_ref().is_some_and(|uid| current_uids.contains(uid)) {
            continue;
        }
        let Some(name) = child.metadata.name else {
            continue;
        };

        match store.delete_statefulset(namespace, &name).await {
            Ok(()) => {
                info!("Deleted stale StatefulSet {}/{}", namespace, name);
                deleted += 1;
            }
            Err(err) if err.is_not_found() => {
                debug!("Stale StatefulSet {}/{} already gone", namespace, name);
                deleted += 1;
            }
            Err(err) => {
                warn!("Failed to delete stale StatefulSet {}/{}: {}", namespace, name, err);
                failed.push((name, err));
            }
        }
    }

    if failed.is_empty() {
        Ok(deleted)
    } else {
        Err(CollectError::PartialFailure { failed })
    }
}
