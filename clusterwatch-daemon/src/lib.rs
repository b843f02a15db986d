//! Clusterwatch library
//!
//! Polls a container-orchestration service for cluster statuses and emits a
//! notification for every created, changed or deleted cluster.

// Core
pub mod detector;
pub mod message;

// Adapters
pub mod notifier;
pub mod source;

// Driver
pub mod poller;
pub mod runtime;

// Configuration, logging and lifecycle
pub mod config;
pub mod logging;
pub mod shutdown;

pub use config::ClusterwatchConfig;
pub use detector::{ChangeDetector, DetectorPolicy, InactivePolicy};
pub use poller::{CycleReport, Poller, PollerSettings};
