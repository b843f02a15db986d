//! Poll loop driving source, detector and notifier
//!
//! Each cycle runs to completion before the next starts: enumerate, look up
//! every cluster, reconcile, then notify every transition in order. Failures
//! at any step are logged and the loop keeps its fixed cadence.

use async_trait::async_trait;
use clusterwatch_common::Transition;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::detector::ChangeDetector;
use crate::message::MessageStyle;
use crate::notifier::{Notification, Notifier};
use crate::source::{collect_snapshot, StatusSource};

/// Sleep provider for the poll loop
#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real-time clock backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Outcome of one poll cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub enumeration_failed: bool,
    pub observed: usize,
    pub lookup_failures: usize,
    pub created: usize,
    pub changed: usize,
    pub deleted: usize,
    pub delivery_failures: usize,
}

impl CycleReport {
    pub fn transitions(&self) -> usize {
        self.created + self.changed + self.deleted
    }
}

/// Poller settings
#[derive(Debug, Clone)]
pub struct PollerSettings {
    pub interval: Duration,
    pub lookup_concurrency: usize,
    pub subject: String,
    pub style: MessageStyle,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            lookup_concurrency: 8,
            subject: "ECS Cluster Status Change Notification".to_string(),
            style: MessageStyle::default(),
        }
    }
}

/// Drives the monitor loop
pub struct Poller {
    source: Arc<dyn StatusSource>,
    notifier: Arc<dyn Notifier>,
    detector: ChangeDetector,
    clock: Arc<dyn Clock>,
    settings: PollerSettings,
    shutdown: watch::Receiver<bool>,
    cycles: u64,
}

impl Poller {
    pub fn new(
        source: Arc<dyn StatusSource>,
        notifier: Arc<dyn Notifier>,
        detector: ChangeDetector,
        settings: PollerSettings,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            source,
            notifier,
            detector,
            clock: Arc::new(TokioClock),
            settings,
            shutdown,
            cycles: 0,
        }
    }

    /// Replace the sleep provider
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn detector(&self) -> &ChangeDetector {
        &self.detector
    }

    /// Number of completed cycles
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    fn shutdown_requested(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Run one full cycle: snapshot, reconcile, notify
    pub async fn run_cycle(&mut self) -> CycleReport {
        let started = Instant::now();
        let snapshot =
            collect_snapshot(self.source.as_ref(), self.settings.lookup_concurrency).await;

        let mut report = CycleReport {
            enumeration_failed: !snapshot.is_authoritative(),
            observed: snapshot.len(),
            lookup_failures: snapshot.unobservable().len(),
            ..Default::default()
        };

        let transitions = self.detector.reconcile(&snapshot);

        for transition in transitions {
            match transition {
                Transition::Created { .. } => report.created += 1,
                Transition::Changed { .. } => report.changed += 1,
                Transition::Deleted { .. } => report.deleted += 1,
            }
            crate::log_transition!(transition);

            let notification =
                Notification::new(transition, self.settings.subject.as_str(), self.settings.style);

            // Memory is already committed; a failed delivery is not retried
            if let Err(e) = self.notifier.notify(&notification).await {
                report.delivery_failures += 1;
                warn!(
                    channel = self.notifier.channel(),
                    cluster = %notification.transition.cluster(),
                    "Notification not delivered: {}",
                    e
                );
            }
        }

        self.cycles += 1;
        debug!(
            cycle = self.cycles,
            observed = report.observed,
            transitions = report.transitions(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Poll cycle complete"
        );

        report
    }

    /// Poll until shutdown is requested
    pub async fn run(mut self) {
        info!(
            source = self.source.name(),
            channel = self.notifier.channel(),
            interval_secs = self.settings.interval.as_secs(),
            "Starting cluster status monitor"
        );

        loop {
            if self.shutdown_requested() {
                break;
            }

            self.run_cycle().await;

            if self.shutdown_requested() {
                break;
            }

            let clock = self.clock.clone();
            tokio::select! {
                _ = clock.sleep(self.settings.interval) => {}
                changed = self.shutdown.changed() => {
                    if changed.is_err() {
                        debug!("Shutdown channel closed");
                        break;
                    }
                }
            }
        }

        info!(cycles = self.cycles, tracked = self.detector.len(), "Cluster status monitor stopped");
    }
}
