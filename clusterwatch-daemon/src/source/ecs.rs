//! Amazon ECS status source

use async_trait::async_trait;
use aws_sdk_ecs::error::DisplayErrorContext;
use aws_sdk_ecs::Client;
use clusterwatch_common::{ClusterId, ClusterStatus, Error, Result};

/// Reads cluster statuses through the ECS ListClusters/DescribeClusters APIs
#[derive(Clone, Debug)]
pub struct EcsSource {
    client: Client,
}

impl EcsSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the shared SDK config (credentials and region chain)
    pub fn from_sdk_config(config: &aws_config::SdkConfig) -> Self {
        Self::new(Client::new(config))
    }
}

#[async_trait]
impl super::StatusSource for EcsSource {
    fn name(&self) -> &'static str {
        "ecs"
    }

    async fn list_clusters(&self) -> Result<Vec<ClusterId>> {
        let mut clusters = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let response = self
                .client
                .list_clusters()
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| Error::Enumeration(DisplayErrorContext(&e).to_string()))?;

            clusters.extend(response.cluster_arns().iter().map(|arn| ClusterId::from(arn.as_str())));

            match response.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        Ok(clusters)
    }

    async fn get_status(&self, id: &ClusterId) -> Result<ClusterStatus> {
        let response = self
            .client
            .describe_clusters()
            .clusters(id.as_str())
            .send()
            .await
            .map_err(|e| Error::lookup(id, DisplayErrorContext(&e).to_string()))?;

        if let Some(failure) = response.failures().first() {
            return Err(Error::lookup(
                id,
                format!(
                    "{} {}",
                    failure.reason().unwrap_or("describe failed"),
                    failure.detail().unwrap_or_default()
                )
                .trim_end()
                .to_string(),
            ));
        }

        response
            .clusters()
            .iter()
            .find(|cluster| {
                cluster.cluster_arn() == Some(id.as_str())
                    || cluster.cluster_name() == Some(id.name())
            })
            .and_then(|cluster| cluster.status())
            .map(ClusterStatus::from)
            .ok_or_else(|| Error::lookup(id, "cluster missing from describe response"))
    }
}
