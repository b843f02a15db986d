//! Poll Loop Tests
//! Drives the poller through scripted source cycles with recording notifiers

mod common;

use clusterwatch_common::{ClusterId, ClusterStatus};
use clusterwatch_daemon::detector::{ChangeDetector, DetectorPolicy, InactivePolicy};
use clusterwatch_daemon::message::MessageStyle;
use clusterwatch_daemon::poller::{CycleReport, Poller, PollerSettings};
use common::{listed, Cycle, RecordingNotifier, ScriptedSource, StepClock};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

const A: &str = "arn:aws:ecs:us-east-2:123456789012:cluster/alpha";
const B: &str = "arn:aws:ecs:us-east-2:123456789012:cluster/beta";

struct Harness {
    poller: Poller,
    source: Arc<ScriptedSource>,
    notifier: Arc<RecordingNotifier>,
    shutdown: watch::Sender<bool>,
}

fn harness(script: Vec<Cycle>, notifier: RecordingNotifier, policy: DetectorPolicy) -> Harness {
    let source = Arc::new(ScriptedSource::new(script));
    let notifier = Arc::new(notifier);
    let (shutdown, rx) = watch::channel(false);

    let settings = PollerSettings {
        interval: Duration::from_secs(10),
        lookup_concurrency: 4,
        subject: "ECS Cluster Status Change Notification".to_string(),
        style: MessageStyle::KeyValue,
    };

    let poller = Poller::new(
        source.clone(),
        notifier.clone(),
        ChangeDetector::new(policy),
        settings,
        rx,
    );

    Harness {
        poller,
        source,
        notifier,
        shutdown,
    }
}

// ============== Single Cycle Tests ==============

#[tokio::test]
async fn test_created_then_unchanged() {
    let mut h = harness(
        vec![listed(&[(A, "ACTIVE")])],
        RecordingNotifier::default(),
        DetectorPolicy::default(),
    );

    let report = h.poller.run_cycle().await;
    assert_eq!(report.created, 1);
    assert_eq!(report.observed, 1);
    assert_eq!(
        h.notifier.messages(),
        vec![format!("event=created cluster={} to=ACTIVE", A)]
    );

    // Same listing again: nothing new to say
    let report = h.poller.run_cycle().await;
    assert_eq!(report.transitions(), 0);
    assert_eq!(h.notifier.messages().len(), 1);
    assert_eq!(h.poller.cycles(), 2);
}

#[tokio::test]
async fn test_change_and_delete_are_notified_once() {
    let mut h = harness(
        vec![
            listed(&[(A, "ACTIVE"), (B, "ACTIVE")]),
            listed(&[(A, "INACTIVE"), (B, "ACTIVE")]),
            listed(&[(B, "ACTIVE")]),
        ],
        RecordingNotifier::default(),
        DetectorPolicy::default(),
    );

    h.poller.run_cycle().await;
    let changed = h.poller.run_cycle().await;
    let deleted = h.poller.run_cycle().await;
    let quiet = h.poller.run_cycle().await;

    assert_eq!(changed.changed, 1);
    assert_eq!(deleted.deleted, 1);
    assert_eq!(quiet.transitions(), 0);

    let messages = h.notifier.messages();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[2], format!("event=changed cluster={} from=ACTIVE to=INACTIVE", A));
    assert_eq!(messages[3], format!("event=deleted cluster={} from=INACTIVE", A));
    assert!(h.poller.detector().status_of(&ClusterId::from(A)).is_none());
}

#[tokio::test]
async fn test_enumeration_failure_keeps_memory() {
    let mut h = harness(
        vec![listed(&[(A, "ACTIVE")]), Cycle::Unavailable, listed(&[(A, "ACTIVE")])],
        RecordingNotifier::default(),
        DetectorPolicy::default(),
    );

    h.poller.run_cycle().await;
    let report = h.poller.run_cycle().await;

    assert_eq!(
        report,
        CycleReport {
            enumeration_failed: true,
            ..Default::default()
        }
    );
    assert_eq!(
        h.poller.detector().status_of(&ClusterId::from(A)),
        Some(&ClusterStatus::Active)
    );

    // Recovery does not re-announce the cluster
    let report = h.poller.run_cycle().await;
    assert_eq!(report.transitions(), 0);
    assert_eq!(h.notifier.messages().len(), 1);
}

#[tokio::test]
async fn test_lookup_failure_skips_only_that_cluster() {
    let mut h = harness(
        vec![
            listed(&[(A, "ACTIVE"), (B, "ACTIVE")]),
            Cycle::Listed(vec![(A, None), (B, Some("INACTIVE"))]),
        ],
        RecordingNotifier::default(),
        DetectorPolicy::default(),
    );

    h.poller.run_cycle().await;
    let report = h.poller.run_cycle().await;

    assert_eq!(report.lookup_failures, 1);
    assert_eq!(report.changed, 1);
    assert_eq!(report.deleted, 0);
    assert_eq!(
        h.poller.detector().status_of(&ClusterId::from(A)),
        Some(&ClusterStatus::Active)
    );
}

#[tokio::test]
async fn test_delivery_failure_does_not_roll_back() {
    let mut h = harness(
        vec![listed(&[(A, "ACTIVE")])],
        RecordingNotifier::failing(),
        DetectorPolicy::default(),
    );

    let report = h.poller.run_cycle().await;
    assert_eq!(report.created, 1);
    assert_eq!(report.delivery_failures, 1);
    assert_eq!(
        h.poller.detector().status_of(&ClusterId::from(A)),
        Some(&ClusterStatus::Active)
    );

    // No re-notification storm on the next cycle
    let report = h.poller.run_cycle().await;
    assert_eq!(report.transitions(), 0);
    assert_eq!(h.notifier.sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_inactive_policy_deleted_end_to_end() {
    let mut h = harness(
        vec![listed(&[(A, "ACTIVE")]), listed(&[(A, "INACTIVE")])],
        RecordingNotifier::default(),
        DetectorPolicy {
            inactive: InactivePolicy::Deleted,
            ..Default::default()
        },
    );

    h.poller.run_cycle().await;
    let report = h.poller.run_cycle().await;
    let again = h.poller.run_cycle().await;

    assert_eq!(report.deleted, 1);
    assert_eq!(report.changed, 0);
    assert_eq!(again.transitions(), 0);
    assert!(h.poller.detector().is_empty());
}

#[tokio::test]
async fn test_notification_carries_subject_and_transition() {
    let mut h = harness(
        vec![listed(&[(A, "PROVISIONING")])],
        RecordingNotifier::default(),
        DetectorPolicy::default(),
    );

    h.poller.run_cycle().await;

    let sent = h.notifier.sent.lock().unwrap();
    assert_eq!(sent[0].subject, "ECS Cluster Status Change Notification");
    assert_eq!(sent[0].transition.kind(), "created");
    assert_eq!(sent[0].transition.cluster().name(), "alpha");
}

// ============== Loop Tests ==============

#[tokio::test]
async fn test_run_stops_on_shutdown() {
    let h = harness(
        vec![listed(&[(A, "ACTIVE")])],
        RecordingNotifier::default(),
        DetectorPolicy::default(),
    );
    let clock = Arc::new(StepClock::new(3, h.shutdown.clone()));

    tokio::time::timeout(
        Duration::from_secs(5),
        h.poller.with_clock(clock.clone()).run(),
    )
    .await
    .expect("poller did not stop");

    assert_eq!(h.source.enumerations.load(Ordering::SeqCst), 3);
    assert_eq!(
        *clock.sleeps.lock().unwrap(),
        vec![Duration::from_secs(10); 3]
    );
    assert_eq!(h.notifier.messages().len(), 1);
}

#[tokio::test]
async fn test_run_does_not_start_after_shutdown() {
    let h = harness(
        vec![listed(&[(A, "ACTIVE")])],
        RecordingNotifier::default(),
        DetectorPolicy::default(),
    );
    h.shutdown.send(true).unwrap();

    h.poller.run().await;

    assert_eq!(h.source.enumerations.load(Ordering::SeqCst), 0);
    assert!(h.notifier.messages().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_interrupts_sleep() {
    let h = harness(
        vec![listed(&[(A, "ACTIVE")])],
        RecordingNotifier::default(),
        DetectorPolicy::default(),
    );
    let shutdown = h.shutdown.clone();
    let source = h.source.clone();

    let handle = tokio::spawn(h.poller.run());

    tokio::time::sleep(Duration::from_secs(15)).await;
    shutdown.send(true).unwrap();
    handle.await.unwrap();

    // Cycles at t=0 and t=10, stopped during the second sleep
    assert_eq!(source.enumerations.load(Ordering::SeqCst), 2);
}
