//! # Status Updates
//!
//! Writes the `{phase, message, ready}` status sub-record back onto a record.

use crate::cluster::RecordStore;
use crate::controller::reconciler::Result;
use crate::crd::ResourceStatus;
use kube::ResourceExt;
use tracing::debug;

/// Patch the status of `record` unless it already holds `status`
///
/// Skipping identical writes keeps the cycle from triggering itself through
/// its own watch events.
pub async fn update_status<K>(
    store: &dyn RecordStore<K>,
    record: &K,
    current: Option<&ResourceStatus>,
    status: ResourceStatus,
) -> Result<()>
where
    K: ResourceExt,
{
    if current == Some(&status) {
        debug!(
            "Skipping status update for {} - phase={:?} ready={} unchanged",
            record.name_any(),
            status.phase,
            status.ready
        );
        return Ok(());
    }
    store.patch_status(record, &status).await?;
    Ok(())
}
