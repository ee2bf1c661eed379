//! Run configuration.
//!
//! [`PurgeSettings`] holds raw, unvalidated values as they arrive from flags
//! or the environment. [`PurgeSettings::validate`] turns them into an
//! immutable [`PurgeConfig`] that every component receives at construction.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PurgeError, Result};
use crate::filter::NameFilter;
use crate::manifest::ManifestListStrategy;

/// Default retention window in days.
pub const DEFAULT_RETENTION_DAYS: i64 = 30;

/// Default number of repositories processed concurrently.
pub const DEFAULT_BATCH_SIZE: i64 = 5;

/// Default per-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Raw settings, before validation.
#[derive(Clone)]
pub struct PurgeSettings {
    /// Registry base URL (e.g. `https://registry.example.com`)
    pub registry_url: String,

    pub username: String,

    pub password: String,

    /// Repository filter: empty, comma-separated prefixes, or a regex
    pub artifact_filter: String,

    /// Tag filter regex
    pub tag_filter: String,

    pub retention_days: i64,

    /// Simulate deletions without calling the registry
    pub dry_run: bool,

    /// Repositories processed concurrently
    pub batch_size: i64,

    pub log_level: String,

    /// `first`, `newest` or `platform:<os>/<arch>[/<variant>]`
    pub manifest_list_strategy: String,

    pub request_timeout_secs: u64,
}

impl Default for PurgeSettings {
    fn default() -> Self {
        Self {
            registry_url: String::new(),
            username: String::new(),
            password: String::new(),
            artifact_filter: String::new(),
            tag_filter: String::new(),
            retention_days: DEFAULT_RETENTION_DAYS,
            dry_run: false,
            batch_size: DEFAULT_BATCH_SIZE,
            log_level: "info".to_string(),
            manifest_list_strategy: "first".to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl fmt::Debug for PurgeSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PurgeSettings")
            .field("registry_url", &self.registry_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("artifact_filter", &self.artifact_filter)
            .field("tag_filter", &self.tag_filter)
            .field("retention_days", &self.retention_days)
            .field("dry_run", &self.dry_run)
            .field("batch_size", &self.batch_size)
            .field("log_level", &self.log_level)
            .field("manifest_list_strategy", &self.manifest_list_strategy)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl PurgeSettings {
    /// Validate every field and compile filters.
    ///
    /// Returns the first problem found as [`PurgeError::Config`].
    pub fn validate(&self) -> Result<PurgeConfig> {
        let registry_url = normalize_registry_url(&self.registry_url)?;

        if self.username.trim().is_empty() {
            return Err(PurgeError::Config("registry username is required".to_string()));
        }
        if self.password.is_empty() {
            return Err(PurgeError::Config("registry password is required".to_string()));
        }

        let retention_days = u32::try_from(self.retention_days).map_err(|_| {
            PurgeError::Config(format!(
                "retention days must be a non-negative integer, got {}",
                self.retention_days
            ))
        })?;

        if self.batch_size < 1 {
            return Err(PurgeError::Config(format!(
                "batch size must be at least 1, got {}",
                self.batch_size
            )));
        }
        let batch_size = usize::try_from(self.batch_size).map_err(|_| {
            PurgeError::Config(format!("batch size {} is too large", self.batch_size))
        })?;

        if self.request_timeout_secs == 0 {
            return Err(PurgeError::Config(
                "request timeout must be at least 1 second".to_string(),
            ));
        }

        let artifact_filter = NameFilter::for_repositories(&self.artifact_filter)
            .map_err(|e| PurgeError::Config(format!("artifact filter: {}", e)))?;
        let tag_filter = NameFilter::for_tags(&self.tag_filter)
            .map_err(|e| PurgeError::Config(format!("tag filter: {}", e)))?;

        Ok(PurgeConfig {
            registry_url,
            username: self.username.trim().to_string(),
            password: self.password.clone(),
            artifact_filter,
            tag_filter,
            retention_days,
            dry_run: self.dry_run,
            batch_size,
            log_level: self.log_level.parse()?,
            manifest_list_strategy: self.manifest_list_strategy.parse()?,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        })
    }
}

/// Validated, immutable run configuration.
#[derive(Clone)]
pub struct PurgeConfig {
    /// Registry base URL with scheme and no trailing slash
    pub registry_url: String,
    pub username: String,
    password: String,
    pub artifact_filter: NameFilter,
    pub tag_filter: NameFilter,
    pub retention_days: u32,
    pub dry_run: bool,
    pub batch_size: usize,
    pub log_level: LogLevel,
    pub manifest_list_strategy: ManifestListStrategy,
    pub request_timeout: Duration,
}

impl PurgeConfig {
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Registry host (and port) without scheme, for log lines.
    pub fn registry_host(&self) -> &str {
        self.registry_url
            .split_once("://")
            .map(|(_, host)| host)
            .unwrap_or(&self.registry_url)
    }
}

impl fmt::Debug for PurgeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PurgeConfig")
            .field("registry_url", &self.registry_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("artifact_filter", &self.artifact_filter.describe())
            .field("tag_filter", &self.tag_filter.describe())
            .field("retention_days", &self.retention_days)
            .field("dry_run", &self.dry_run)
            .field("batch_size", &self.batch_size)
            .field("log_level", &self.log_level)
            .field("manifest_list_strategy", &self.manifest_list_strategy)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Add a default `https://` scheme and strip trailing slashes.
fn normalize_registry_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PurgeError::Config("registry URL is required".to_string()));
    }

    let (scheme, host) = match trimmed.split_once("://") {
        Some((scheme, rest)) => (scheme, rest),
        None => ("https", trimmed),
    };
    if scheme != "http" && scheme != "https" {
        return Err(PurgeError::Config(format!(
            "registry URL '{}' must use http or https",
            raw
        )));
    }

    let host = host.trim_end_matches('/');
    if host.is_empty() {
        return Err(PurgeError::Config(format!(
            "registry URL '{}' has no host",
            raw
        )));
    }
    if host.chars().any(char::is_whitespace) {
        return Err(PurgeError::Config(format!(
            "registry URL '{}' contains whitespace",
            raw
        )));
    }

    Ok(format!("{}://{}", scheme, host))
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = PurgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(PurgeError::Config(format!(
                "invalid log level '{}': expected trace, debug, info, warn or error",
                other
            ))),
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}
