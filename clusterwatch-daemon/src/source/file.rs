//! File-backed status source for dry runs without cloud access
//!
//! The file holds a JSON object mapping cluster ids to statuses and is re-read
//! on every enumeration, so editing it drives the monitor by hand.

use async_trait::async_trait;
use clusterwatch_common::{ClusterId, ClusterStatus, Error, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

pub struct FileSource {
    path: PathBuf,
    last_read: RwLock<BTreeMap<ClusterId, ClusterStatus>>,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_read: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl super::StatusSource for FileSource {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn list_clusters(&self) -> Result<Vec<ClusterId>> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| Error::Enumeration(format!("{}: {}", self.path.display(), e)))?;

        let statuses: BTreeMap<ClusterId, ClusterStatus> = serde_json::from_str(&content)
            .map_err(|e| Error::Enumeration(format!("{}: {}", self.path.display(), e)))?;

        let ids = statuses.keys().cloned().collect();
        *self.last_read.write().await = statuses;
        Ok(ids)
    }

    async fn get_status(&self, id: &ClusterId) -> Result<ClusterStatus> {
        self.last_read
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| Error::lookup(id, "not present in status file"))
    }
}
