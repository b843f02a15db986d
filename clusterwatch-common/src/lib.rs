//! Common types shared between the clusterwatch daemon and its adapters

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Cluster identifier (an ARN for ECS clusters)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterId(String);

impl ClusterId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short cluster name: the part after `cluster/` in an ARN, or the whole id
    pub fn name(&self) -> &str {
        match self.0.rsplit_once(":cluster/") {
            Some((_, name)) if !name.is_empty() => name,
            _ => &self.0,
        }
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClusterId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ClusterId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Cluster lifecycle status as reported by the orchestration service
///
/// Values other than the known ones are kept verbatim and compared as plain strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ClusterStatus {
    Active,
    Provisioning,
    Deprovisioning,
    Failed,
    Inactive,
    Other(String),
}

impl ClusterStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "ACTIVE",
            Self::Provisioning => "PROVISIONING",
            Self::Deprovisioning => "DEPROVISIONING",
            Self::Failed => "FAILED",
            Self::Inactive => "INACTIVE",
            Self::Other(s) => s,
        }
    }

    pub fn is_inactive(&self) -> bool {
        matches!(self, Self::Inactive)
    }
}

impl fmt::Display for ClusterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ClusterStatus {
    fn from(s: &str) -> Self {
        match s {
            "ACTIVE" => Self::Active,
            "PROVISIONING" => Self::Provisioning,
            "DEPROVISIONING" => Self::Deprovisioning,
            "FAILED" => Self::Failed,
            "INACTIVE" => Self::Inactive,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for ClusterStatus {
    fn from(s: String) -> Self {
        match Self::from(s.as_str()) {
            Self::Other(_) => Self::Other(s),
            known => known,
        }
    }
}

impl From<ClusterStatus> for String {
    fn from(status: ClusterStatus) -> Self {
        match status {
            ClusterStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

/// One poll cycle's view of cluster statuses
///
/// Holds statuses only for clusters that were both enumerated and looked up.
/// Enumerated clusters whose lookup failed are tracked separately so they are
/// never mistaken for deleted ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    statuses: BTreeMap<ClusterId, ClusterStatus>,
    unobservable: BTreeSet<ClusterId>,
    authoritative: bool,
}

impl Snapshot {
    /// Empty snapshot from a successful enumeration
    pub fn new() -> Self {
        Self {
            statuses: BTreeMap::new(),
            unobservable: BTreeSet::new(),
            authoritative: true,
        }
    }

    /// Snapshot for a cycle whose enumeration failed
    pub fn enumeration_failed() -> Self {
        Self {
            authoritative: false,
            ..Self::new()
        }
    }

    pub fn record(&mut self, id: ClusterId, status: ClusterStatus) {
        self.unobservable.remove(&id);
        self.statuses.insert(id, status);
    }

    /// Mark an enumerated cluster whose status could not be fetched
    pub fn mark_unobservable(&mut self, id: ClusterId) {
        if !self.statuses.contains_key(&id) {
            self.unobservable.insert(id);
        }
    }

    /// Whether enumeration succeeded, making absence a deletion signal
    pub fn is_authoritative(&self) -> bool {
        self.authoritative
    }

    pub fn statuses(&self) -> &BTreeMap<ClusterId, ClusterStatus> {
        &self.statuses
    }

    pub fn unobservable(&self) -> &BTreeSet<ClusterId> {
        &self.unobservable
    }

    pub fn get(&self, id: &ClusterId) -> Option<&ClusterStatus> {
        self.statuses.get(id)
    }

    /// Whether the cluster was enumerated this cycle (observed or not)
    pub fn was_enumerated(&self, id: &ClusterId) -> bool {
        self.statuses.contains_key(id) || self.unobservable.contains(id)
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl<I, S> FromIterator<(I, S)> for Snapshot
where
    I: Into<ClusterId>,
    S: Into<ClusterStatus>,
{
    fn from_iter<T: IntoIterator<Item = (I, S)>>(iter: T) -> Self {
        let mut snapshot = Self::new();
        for (id, status) in iter {
            snapshot.record(id.into(), status.into());
        }
        snapshot
    }
}

/// Classified status change for one cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum Transition {
    Created {
        cluster: ClusterId,
        status: ClusterStatus,
    },
    Changed {
        cluster: ClusterId,
        from: ClusterStatus,
        to: ClusterStatus,
    },
    Deleted {
        cluster: ClusterId,
        last_status: ClusterStatus,
    },
}

impl Transition {
    pub fn cluster(&self) -> &ClusterId {
        match self {
            Self::Created { cluster, .. }
            | Self::Changed { cluster, .. }
            | Self::Deleted { cluster, .. } => cluster,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
            Self::Changed { .. } => "changed",
            Self::Deleted { .. } => "deleted",
        }
    }
}

/// Monitor error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Cluster enumeration failed: {0}")]
    Enumeration(String),

    #[error("Status lookup failed for {cluster}: {reason}")]
    Lookup { cluster: ClusterId, reason: String },

    #[error("Notification delivery via {channel} failed: {reason}")]
    Delivery { channel: String, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    pub fn lookup(cluster: &ClusterId, reason: impl Into<String>) -> Self {
        Self::Lookup {
            cluster: cluster.clone(),
            reason: reason.into(),
        }
    }

    pub fn delivery(channel: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Delivery {
            channel: channel.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
