//! Cluster status sources
//!
//! A source enumerates the clusters visible in its scope and looks up the
//! status of each one. [`collect_snapshot`] turns those two calls into one
//! [`Snapshot`], downgrading every failure to a logged warning.

#[cfg(feature = "aws")]
pub mod ecs;
pub mod file;

use async_trait::async_trait;
use clusterwatch_common::{ClusterId, ClusterStatus, Result, Snapshot};
use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

#[cfg(feature = "aws")]
pub use ecs::EcsSource;
pub use file::FileSource;

/// Read access to cluster statuses
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Every cluster identifier currently visible in the configured scope
    async fn list_clusters(&self) -> Result<Vec<ClusterId>>;

    /// Current status of one cluster
    async fn get_status(&self, id: &ClusterId) -> Result<ClusterStatus>;
}

/// Build one cycle's snapshot, looking up at most `concurrency` clusters at a time
pub async fn collect_snapshot(source: &dyn StatusSource, concurrency: usize) -> Snapshot {
    let clusters = match source.list_clusters().await {
        Ok(clusters) => clusters,
        Err(e) => {
            warn!(source = source.name(), "Skipping cycle deletions: {}", e);
            return Snapshot::enumeration_failed();
        }
    };

    debug!(source = source.name(), count = clusters.len(), "Enumerated clusters");

    let lookups: Vec<(ClusterId, Result<ClusterStatus>)> = stream::iter(clusters)
        .map(|id| async move {
            let status = source.get_status(&id).await;
            (id, status)
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut snapshot = Snapshot::new();
    for (id, status) in lookups {
        match status {
            Ok(status) => snapshot.record(id, status),
            Err(e) => {
                warn!(source = source.name(), cluster = %id, "Cluster unobservable this cycle: {}", e);
                snapshot.mark_unobservable(id);
            }
        }
    }

    snapshot
}
