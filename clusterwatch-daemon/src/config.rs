//! Configuration management for the clusterwatch daemon
//!
//! Settings are resolved from, in order of priority:
//! 1. Environment variables (highest priority)
//! 2. Configuration file (TOML format)
//! 3. Default values (lowest priority)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::detector::{DetectorPolicy, InactivePolicy};
use crate::message::MessageStyle;

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterwatchConfig {
    /// Where cluster statuses come from
    pub source: SourceConfig,
    /// Where transition notifications go
    pub notifier: NotifierConfig,
    /// Poll loop settings
    pub poller: PollerConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Status source backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Ecs,
    File,
}

/// Status source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// Region to monitor; unset means the SDK default region chain
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// JSON status file for the file source
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Maximum number of status lookups in flight per cycle
    pub lookup_concurrency: usize,
}

/// Notification channel backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifierKind {
    Sns,
    Webhook,
    Log,
}

/// Notifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    pub kind: NotifierKind,
    /// SNS topic ARN
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic_arn: Option<String>,
    /// Subject line attached to each notification
    pub subject: String,
    /// Message text layout
    pub style: MessageStyle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_token: Option<String>,
    pub webhook_timeout_secs: u64,
    /// Extra HTTP headers sent with each webhook request
    pub webhook_headers: BTreeMap<String, String>,
}

/// Poll loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Seconds between the end of one cycle and the start of the next
    pub interval_secs: u64,
    /// How an enumerated cluster reporting INACTIVE is classified
    pub inactive_policy: InactivePolicy,
    /// Consecutive failed lookups after which a known cluster counts as deleted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lookup_failure_limit: Option<u32>,
}

/// Log file rotation policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Hourly,
    Daily,
    Never,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); RUST_LOG wins when set
    pub level: String,
    /// Emit JSON lines on the console
    pub json: bool,
    /// Directory for rolling log files; console only when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
    pub rotation: LogRotation,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Ecs,
            region: None,
            path: None,
            lookup_concurrency: 8,
        }
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            kind: NotifierKind::Sns,
            topic_arn: None,
            subject: "ECS Cluster Status Change Notification".to_string(),
            style: MessageStyle::default(),
            webhook_url: None,
            webhook_token: None,
            webhook_timeout_secs: 30,
            webhook_headers: BTreeMap::new(),
        }
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            inactive_policy: InactivePolicy::default(),
            lookup_failure_limit: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            log_dir: None,
            rotation: LogRotation::Daily,
        }
    }
}

impl ClusterwatchConfig {
    /// Load configuration from the first config file found plus environment overrides
    ///
    /// A discovered file that fails to load is skipped; its error is handed back
    /// so the caller can report it once logging is up.
    pub fn load() -> (Self, Option<ConfigError>) {
        Self::load_with_lookup(|key| std::env::var(key).ok())
    }

    /// Search-path load driven by a variable lookup (the process environment in production)
    pub fn load_with_lookup<F>(var: F) -> (Self, Option<ConfigError>)
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let mut ignored = None;

        if let Some(config_path) = Self::find_config_file(var("CLUSTERWATCH_CONFIG")) {
            match Self::load_from_file(&config_path) {
                Ok(file_config) => config = file_config,
                Err(e) => ignored = Some(e),
            }
        }

        config.apply_overrides(var);
        (config, ignored)
    }

    /// Load from an explicitly requested file; failure is an error
    pub fn load_with_file(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file path
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_path_buf(), e.to_string()))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Find configuration file in standard locations
    fn find_config_file(explicit: Option<String>) -> Option<PathBuf> {
        let paths = [
            explicit.map(PathBuf::from),
            Some(PathBuf::from("/etc/clusterwatch/config.toml")),
            Some(PathBuf::from("./clusterwatch.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        paths.into_iter().flatten().find(|p| p.exists())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from a variable lookup (the process environment in production)
    pub fn apply_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Source
        if let Some(kind) = var("CLUSTERWATCH_SOURCE").and_then(|v| parse_enum(&v)) {
            self.source.kind = kind;
        }
        if let Some(region) = var("CLUSTERWATCH_REGION").or_else(|| var("AWS_REGION")) {
            self.source.region = Some(region);
        }
        if let Some(path) = var("CLUSTERWATCH_SOURCE_PATH") {
            self.source.path = Some(PathBuf::from(path));
        }
        if let Some(n) = var("CLUSTERWATCH_LOOKUP_CONCURRENCY").and_then(|v| v.parse().ok()) {
            self.source.lookup_concurrency = n;
        }

        // Notifier
        if let Some(kind) = var("CLUSTERWATCH_NOTIFIER").and_then(|v| parse_enum(&v)) {
            self.notifier.kind = kind;
        }
        if let Some(arn) = var("CLUSTERWATCH_TOPIC_ARN") {
            self.notifier.topic_arn = Some(arn);
        }
        if let Some(subject) = var("CLUSTERWATCH_SUBJECT") {
            self.notifier.subject = subject;
        }
        if let Some(style) = var("CLUSTERWATCH_MESSAGE_STYLE").and_then(|v| parse_enum(&v)) {
            self.notifier.style = style;
        }
        if let Some(url) = var("CLUSTERWATCH_WEBHOOK_URL") {
            self.notifier.webhook_url = Some(url);
        }
        if let Some(token) = var("CLUSTERWATCH_WEBHOOK_TOKEN") {
            self.notifier.webhook_token = Some(token);
        }

        // Poller
        if let Some(secs) = var("CLUSTERWATCH_POLL_INTERVAL").and_then(|v| v.parse().ok()) {
            self.poller.interval_secs = secs;
        }
        if let Some(policy) = var("CLUSTERWATCH_INACTIVE_POLICY").and_then(|v| parse_enum(&v)) {
            self.poller.inactive_policy = policy;
        }
        if let Some(limit) = var("CLUSTERWATCH_LOOKUP_FAILURE_LIMIT").and_then(|v| v.parse().ok()) {
            self.poller.lookup_failure_limit = Some(limit);
        }

        // Logging
        if let Some(level) = var("CLUSTERWATCH_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = var("CLUSTERWATCH_LOG_JSON").and_then(|v| v.parse().ok()) {
            self.logging.json = json;
        }
        if let Some(dir) = var("CLUSTERWATCH_LOG_DIR") {
            self.logging.log_dir = Some(PathBuf::from(dir));
        }
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let mut config = Self::default();
        config.source.region = Some("us-east-2".to_string());
        config.notifier.topic_arn =
            Some("arn:aws:sns:us-east-2:123456789012:ecs-cluster-status".to_string());
        toml::to_string_pretty(&config).unwrap_or_default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poller.interval_secs == 0 {
            return Err(ConfigError::Validation(
                "poller.interval_secs must be greater than 0".to_string(),
            ));
        }

        if self.source.lookup_concurrency == 0 {
            return Err(ConfigError::Validation(
                "source.lookup_concurrency must be greater than 0".to_string(),
            ));
        }

        if self.poller.lookup_failure_limit == Some(0) {
            return Err(ConfigError::Validation(
                "poller.lookup_failure_limit must be greater than 0 when set".to_string(),
            ));
        }

        if self.source.kind == SourceKind::File && self.source.path.is_none() {
            return Err(ConfigError::Validation(
                "source.path is required for the file source".to_string(),
            ));
        }

        match self.notifier.kind {
            NotifierKind::Sns if is_blank(&self.notifier.topic_arn) => Err(
                ConfigError::Validation("notifier.topic_arn is required for SNS".to_string()),
            ),
            NotifierKind::Webhook if is_blank(&self.notifier.webhook_url) => Err(
                ConfigError::Validation("notifier.webhook_url is required for webhooks".to_string()),
            ),
            _ => Ok(()),
        }
    }
}

impl PollerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn detector_policy(&self) -> DetectorPolicy {
        DetectorPolicy {
            inactive: self.inactive_policy,
            lookup_failure_limit: self.lookup_failure_limit,
        }
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// Parse a lowercase enum name the same way the TOML file would
fn parse_enum<T: serde::de::DeserializeOwned>(value: &str) -> Option<T> {
    T::deserialize(serde::de::value::StrDeserializer::<serde::de::value::Error>::new(
        &value.trim().to_lowercase(),
    ))
    .ok()
}

/// Configuration errors
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0:?}: {1}")]
    FileRead(PathBuf, String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Config validation failed: {0}")]
    Validation(String),
}
