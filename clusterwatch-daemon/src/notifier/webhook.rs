//! Webhook notification channel
//! Sends an HTTP POST with a JSON payload for every transition

use async_trait::async_trait;
use clusterwatch_common::{Error, Result, Transition};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

use super::{Notification, Notifier};

/// Webhook endpoint configuration
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub auth_token: Option<String>,
    pub timeout: Duration,
}

impl WebhookConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: BTreeMap::new(),
            auth_token: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Body posted to the endpoint
#[derive(Debug, Clone, Serialize)]
pub struct WebhookPayload<'a> {
    pub event: &'static str,
    pub source: &'static str,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub subject: &'a str,
    pub message: &'a str,
    pub transition: &'a Transition,
}

impl<'a> WebhookPayload<'a> {
    pub fn new(notification: &'a Notification) -> Self {
        Self {
            event: notification.transition.kind(),
            source: "clusterwatch",
            timestamp: chrono::Utc::now(),
            subject: &notification.subject,
            message: &notification.message,
            transition: &notification.transition,
        }
    }
}

/// Posts notifications to an HTTP endpoint
pub struct WebhookNotifier {
    config: WebhookConfig,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(config: WebhookConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::InvalidConfig(format!("webhook client: {}", e)))?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn channel(&self) -> &'static str {
        "webhook"
    }

    async fn notify(&self, notification: &Notification) -> Result<()> {
        let mut request = self
            .client
            .post(&self.config.url)
            .json(&WebhookPayload::new(notification));

        for (key, value) in &self.config.headers {
            request = request.header(key, value);
        }

        if let Some(token) = &self.config.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::delivery(self.channel(), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::delivery(
                self.channel(),
                format!("endpoint returned {}", status),
            ));
        }

        tracing::debug!(url = %self.config.url, status = status.as_u16(), "Webhook delivered");
        Ok(())
    }
}
