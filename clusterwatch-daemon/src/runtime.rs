//! Wiring of sources and notifiers from configuration

use clusterwatch_common::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::config::{ClusterwatchConfig, NotifierConfig, NotifierKind, SourceConfig, SourceKind};
use crate::detector::ChangeDetector;
use crate::notifier::{LogNotifier, Notifier, WebhookConfig, WebhookNotifier};
use crate::poller::{Poller, PollerSettings};
use crate::source::{FileSource, StatusSource};

impl PollerSettings {
    pub fn from_config(config: &ClusterwatchConfig) -> Self {
        Self {
            interval: config.poller.interval(),
            lookup_concurrency: config.source.lookup_concurrency,
            subject: config.notifier.subject.clone(),
            style: config.notifier.style,
        }
    }
}

/// Shared AWS SDK configuration for the configured region
#[cfg(feature = "aws")]
async fn aws_sdk_config(region: Option<&str>) -> aws_config::SdkConfig {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
    if let Some(region) = region {
        loader = loader.region(aws_config::Region::new(region.to_string()));
    }
    loader.load().await
}

pub async fn build_source(config: &SourceConfig) -> Result<Arc<dyn StatusSource>> {
    match config.kind {
        SourceKind::File => {
            let path = config
                .path
                .clone()
                .ok_or_else(|| Error::InvalidConfig("source.path is required".to_string()))?;
            Ok(Arc::new(FileSource::new(path)))
        }
        #[cfg(feature = "aws")]
        SourceKind::Ecs => {
            let sdk_config = aws_sdk_config(config.region.as_deref()).await;
            Ok(Arc::new(crate::source::EcsSource::from_sdk_config(&sdk_config)))
        }
        #[cfg(not(feature = "aws"))]
        SourceKind::Ecs => Err(Error::InvalidConfig(
            "ECS source requires the `aws` feature".to_string(),
        )),
    }
}

pub async fn build_notifier(
    config: &NotifierConfig,
    region: Option<&str>,
) -> Result<Arc<dyn Notifier>> {
    match config.kind {
        NotifierKind::Log => Ok(Arc::new(LogNotifier)),
        NotifierKind::Webhook => {
            let url = config
                .webhook_url
                .clone()
                .ok_or_else(|| Error::InvalidConfig("notifier.webhook_url is required".to_string()))?;

            let webhook = WebhookConfig {
                url,
                headers: config.webhook_headers.clone(),
                auth_token: config.webhook_token.clone(),
                timeout: Duration::from_secs(config.webhook_timeout_secs),
            };
            Ok(Arc::new(WebhookNotifier::new(webhook)?))
        }
        #[cfg(feature = "aws")]
        NotifierKind::Sns => {
            let topic_arn = config
                .topic_arn
                .clone()
                .ok_or_else(|| Error::InvalidConfig("notifier.topic_arn is required".to_string()))?;

            let sdk_config = aws_sdk_config(region).await;
            Ok(Arc::new(crate::notifier::SnsNotifier::from_sdk_config(
                &sdk_config,
                topic_arn,
            )))
        }
        #[cfg(not(feature = "aws"))]
        NotifierKind::Sns => {
            let _ = region;
            Err(Error::InvalidConfig(
                "SNS notifier requires the `aws` feature".to_string(),
            ))
        }
    }
}

/// Build a ready-to-run poller from configuration
pub async fn build_poller(
    config: &ClusterwatchConfig,
    shutdown: watch::Receiver<bool>,
) -> Result<Poller> {
    let source = build_source(&config.source).await?;
    let notifier = build_notifier(&config.notifier, config.source.region.as_deref()).await?;
    let detector = ChangeDetector::new(config.poller.detector_policy());

    Ok(Poller::new(
        source,
        notifier,
        detector,
        PollerSettings::from_config(config),
        shutdown,
    ))
}
