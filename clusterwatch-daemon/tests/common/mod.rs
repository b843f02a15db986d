//! Common test doubles for poll loop tests

#![allow(dead_code)]

use async_trait::async_trait;
use clusterwatch_common::{ClusterId, ClusterStatus, Error, Result};
use clusterwatch_daemon::notifier::{Notification, Notifier};
use clusterwatch_daemon::poller::Clock;
use clusterwatch_daemon::source::StatusSource;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::watch;

/// One scripted poll cycle
#[derive(Debug, Clone)]
pub enum Cycle {
    /// Enumeration fails outright
    Unavailable,
    /// Listed clusters with their statuses; `None` means the lookup fails
    Listed(Vec<(&'static str, Option<&'static str>)>),
}

pub fn listed(entries: &[(&'static str, &'static str)]) -> Cycle {
    Cycle::Listed(entries.iter().map(|(id, s)| (*id, Some(*s))).collect())
}

/// Source that replays one scripted cycle per enumeration, repeating the last
pub struct ScriptedSource {
    script: Mutex<VecDeque<Cycle>>,
    current: Mutex<BTreeMap<ClusterId, Option<ClusterStatus>>>,
    pub enumerations: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(script: Vec<Cycle>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            current: Mutex::new(BTreeMap::new()),
            enumerations: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl StatusSource for ScriptedSource {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn list_clusters(&self) -> Result<Vec<ClusterId>> {
        self.enumerations.fetch_add(1, Ordering::SeqCst);

        let cycle = {
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.pop_front()
            } else {
                script.front().cloned()
            }
        };

        match cycle {
            None | Some(Cycle::Unavailable) => {
                Err(Error::Enumeration("ListClusters throttled".to_string()))
            }
            Some(Cycle::Listed(entries)) => {
                let current: BTreeMap<ClusterId, Option<ClusterStatus>> = entries
                    .into_iter()
                    .map(|(id, status)| (ClusterId::from(id), status.map(ClusterStatus::from)))
                    .collect();
                let ids = current.keys().cloned().collect();
                *self.current.lock().unwrap() = current;
                Ok(ids)
            }
        }
    }

    async fn get_status(&self, id: &ClusterId) -> Result<ClusterStatus> {
        self.current
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .flatten()
            .ok_or_else(|| Error::lookup(id, "DescribeClusters throttled"))
    }
}

/// Notifier recording every attempt, optionally failing all of them
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
    pub failing: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Default::default()
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|n| n.message.clone()).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn channel(&self) -> &'static str {
        "recording"
    }

    async fn notify(&self, notification: &Notification) -> Result<()> {
        self.sent.lock().unwrap().push(notification.clone());
        if self.failing {
            return Err(Error::delivery(self.channel(), "topic unreachable"));
        }
        Ok(())
    }
}

/// Clock that returns immediately and requests shutdown after a number of sleeps
pub struct StepClock {
    pub sleeps: Mutex<Vec<Duration>>,
    stop_after: usize,
    shutdown: watch::Sender<bool>,
}

impl StepClock {
    pub fn new(stop_after: usize, shutdown: watch::Sender<bool>) -> Self {
        Self {
            sleeps: Mutex::new(Vec::new()),
            stop_after,
            shutdown,
        }
    }
}

#[async_trait]
impl Clock for StepClock {
    async fn sleep(&self, duration: Duration) {
        let count = {
            let mut sleeps = self.sleeps.lock().unwrap();
            sleeps.push(duration);
            sleeps.len()
        };

        if count >= self.stop_after {
            let _ = self.shutdown.send(true);
        }
        tokio::task::yield_now().await;
    }
}
