//! Notification channels for cluster transitions

#[cfg(feature = "aws")]
pub mod sns;
pub mod webhook;

use async_trait::async_trait;
use clusterwatch_common::{Result, Transition};
use serde::Serialize;

#[cfg(feature = "aws")]
pub use sns::SnsNotifier;
pub use webhook::{WebhookConfig, WebhookNotifier};

use crate::message::{format_transition, MessageStyle};

/// A formatted transition ready for delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub subject: String,
    pub message: String,
    pub transition: Transition,
}

impl Notification {
    pub fn new(transition: Transition, subject: impl Into<String>, style: MessageStyle) -> Self {
        Self {
            subject: subject.into(),
            message: format_transition(&transition, style),
            transition,
        }
    }
}

/// Best-effort delivery to an external channel
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Channel name used in logs and delivery errors
    fn channel(&self) -> &'static str;

    async fn notify(&self, notification: &Notification) -> Result<()>;
}

/// Channel that only writes notifications to the log
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn channel(&self) -> &'static str {
        "log"
    }

    async fn notify(&self, notification: &Notification) -> Result<()> {
        tracing::info!(
            subject = %notification.subject,
            cluster = %notification.transition.cluster(),
            event = notification.transition.kind(),
            "{}",
            notification.message
        );
        Ok(())
    }
}
