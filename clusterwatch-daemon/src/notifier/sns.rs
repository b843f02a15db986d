//! Amazon SNS notification channel

use async_trait::async_trait;
use aws_sdk_sns::error::DisplayErrorContext;
use aws_sdk_sns::Client;
use clusterwatch_common::{Error, Result};

use super::{Notification, Notifier};

/// SNS requires subjects shorter than 100 characters
const MAX_SUBJECT_CHARS: usize = 99;

/// Publishes notifications to an SNS topic
#[derive(Clone, Debug)]
pub struct SnsNotifier {
    client: Client,
    topic_arn: String,
}

impl SnsNotifier {
    pub fn new(client: Client, topic_arn: impl Into<String>) -> Self {
        Self {
            client,
            topic_arn: topic_arn.into(),
        }
    }

    pub fn from_sdk_config(config: &aws_config::SdkConfig, topic_arn: impl Into<String>) -> Self {
        Self::new(Client::new(config), topic_arn)
    }

    pub fn topic_arn(&self) -> &str {
        &self.topic_arn
    }
}

#[async_trait]
impl Notifier for SnsNotifier {
    fn channel(&self) -> &'static str {
        "sns"
    }

    async fn notify(&self, notification: &Notification) -> Result<()> {
        let output = self
            .client
            .publish()
            .topic_arn(&self.topic_arn)
            .message(&notification.message)
            .subject(sns_subject(&notification.subject))
            .send()
            .await
            .map_err(|e| Error::delivery(self.channel(), DisplayErrorContext(&e).to_string()))?;

        tracing::debug!(
            topic = %self.topic_arn,
            message_id = output.message_id().unwrap_or_default(),
            "Published SNS notification"
        );
        Ok(())
    }
}

/// Single-line subject within the SNS length limit
fn sns_subject(subject: &str) -> String {
    subject
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .take(MAX_SUBJECT_CHARS)
        .collect()
}
