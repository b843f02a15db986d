//! Cluster status change detection
//!
//! The detector remembers the last status it reported for every cluster and
//! diffs each new [`Snapshot`] against that memory. Every transition is
//! reported exactly once: a cluster is `Created` the first time it is seen,
//! `Changed` whenever its status differs from the remembered one, and
//! `Deleted` once it disappears from a successful enumeration.

use clusterwatch_common::{ClusterId, ClusterStatus, Snapshot, Transition};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Classification of a cluster that is still listed but reports INACTIVE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InactivePolicy {
    /// Report a plain status change; deletion means disappearing from the listing
    #[default]
    Changed,
    /// Treat INACTIVE as deletion even while the cluster is still listed
    Deleted,
}

/// Tunables for the detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DetectorPolicy {
    pub inactive: InactivePolicy,
    /// Consecutive failed lookups after which a known cluster is dropped as deleted
    pub lookup_failure_limit: Option<u32>,
}

/// Change detector holding the last notified status per cluster
#[derive(Debug, Default)]
pub struct ChangeDetector {
    memory: BTreeMap<ClusterId, ClusterStatus>,
    lookup_failures: HashMap<ClusterId, u32>,
    policy: DetectorPolicy,
}

impl ChangeDetector {
    pub fn new(policy: DetectorPolicy) -> Self {
        Self {
            memory: BTreeMap::new(),
            lookup_failures: HashMap::new(),
            policy,
        }
    }

    pub fn policy(&self) -> DetectorPolicy {
        self.policy
    }

    /// Last notified status per cluster
    pub fn memory(&self) -> &BTreeMap<ClusterId, ClusterStatus> {
        &self.memory
    }

    pub fn status_of(&self, id: &ClusterId) -> Option<&ClusterStatus> {
        self.memory.get(id)
    }

    pub fn len(&self) -> usize {
        self.memory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    /// Diff a snapshot against memory, updating memory and returning transitions
    ///
    /// Creations and changes come first, in snapshot order, followed by
    /// deletions. Deletions are only derived from authoritative snapshots.
    pub fn reconcile(&mut self, snapshot: &Snapshot) -> Vec<Transition> {
        let mut transitions = Vec::new();

        for (id, status) in snapshot.statuses() {
            self.lookup_failures.remove(id);

            if status.is_inactive() && self.policy.inactive == InactivePolicy::Deleted {
                if let Some(last_status) = self.memory.remove(id) {
                    transitions.push(Transition::Deleted {
                        cluster: id.clone(),
                        last_status,
                    });
                }
                continue;
            }

            match self.memory.get_mut(id) {
                None => {
                    self.memory.insert(id.clone(), status.clone());
                    transitions.push(Transition::Created {
                        cluster: id.clone(),
                        status: status.clone(),
                    });
                }
                Some(previous) if previous != status => {
                    let from = std::mem::replace(previous, status.clone());
                    transitions.push(Transition::Changed {
                        cluster: id.clone(),
                        from,
                        to: status.clone(),
                    });
                }
                Some(_) => {}
            }
        }

        if !snapshot.is_authoritative() {
            return transitions;
        }

        let stale = self.count_lookup_failures(snapshot);

        let gone: Vec<ClusterId> = self
            .memory
            .keys()
            .filter(|id| !snapshot.was_enumerated(id) || stale.contains(id))
            .cloned()
            .collect();

        for id in gone {
            self.lookup_failures.remove(&id);
            if let Some(last_status) = self.memory.remove(&id) {
                transitions.push(Transition::Deleted {
                    cluster: id,
                    last_status,
                });
            }
        }

        transitions
    }

    /// Track consecutive lookup failures of known clusters, returning those over the limit
    fn count_lookup_failures(&mut self, snapshot: &Snapshot) -> Vec<ClusterId> {
        let memory = &self.memory;
        self.lookup_failures.retain(|id, _| memory.contains_key(id));

        let mut stale = Vec::new();
        for id in snapshot.unobservable() {
            if !self.memory.contains_key(id) {
                continue;
            }

            let failures = self.lookup_failures.entry(id.clone()).or_insert(0);
            *failures += 1;

            if let Some(limit) = self.policy.lookup_failure_limit {
                if *failures >= limit {
                    tracing::warn!(
                        cluster = %id,
                        failures = *failures,
                        "Status lookups keep failing, treating cluster as deleted"
                    );
                    stale.push(id.clone());
                }
            }
        }

        stale
    }
}
