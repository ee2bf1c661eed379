//! `oci-purge` cleanup run.

use std::sync::Arc;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args, ValueEnum};
use oci_purge_core::config::{
    DEFAULT_BATCH_SIZE, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_RETENTION_DAYS,
};
use oci_purge_core::PurgeSettings;
use oci_purge_runtime::{Orchestrator, Registry, RegistryClient};

use crate::{logging, output};

/// Summary output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Args, Debug)]
pub struct PurgeArgs {
    /// Registry base URL (e.g. "https://registry.example.com")
    #[arg(long, env = "REGISTRY_URL")]
    pub registry_url: Option<String>,

    /// Registry username
    #[arg(short, long, env = "REGISTRY_USERNAME")]
    pub username: Option<String>,

    /// Registry password
    #[arg(short, long, env = "REGISTRY_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Repositories to process: comma-separated prefixes, or a regex
    #[arg(long, env = "ARTIFACT_FILTER", default_value = "")]
    pub artifact_filter: String,

    /// Tags to process (regex)
    #[arg(long, env = "TAG_FILTER", default_value = "")]
    pub tag_filter: String,

    /// Delete artifacts created more than this many days ago
    #[arg(long, env = "RETENTION_DAYS", default_value_t = DEFAULT_RETENTION_DAYS, allow_negative_numbers = true)]
    pub retention_days: i64,

    /// Log what would be deleted without deleting anything
    #[arg(long, env = "DRY_RUN", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    pub dry_run: bool,

    /// Number of repositories processed concurrently
    #[arg(long, env = "BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE, allow_negative_numbers = true)]
    pub batch_size: i64,

    /// Log level: trace, debug, info, warn or error (RUST_LOG takes precedence)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log line format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Sub-manifest used for multi-platform images: first, newest or platform:<os>/<arch>
    #[arg(long, env = "MANIFEST_LIST_STRATEGY", default_value = "first")]
    pub manifest_list_strategy: String,

    /// Per-request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    pub request_timeout_secs: u64,

    /// Summary output format
    #[arg(long, env = "OUTPUT_FORMAT", value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,

    /// Exit non-zero when any artifact failed to process
    #[arg(long, env = "STRICT", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    pub strict: bool,
}

impl PurgeArgs {
    /// Raw settings for validation by the core crate.
    pub fn to_settings(&self) -> PurgeSettings {
        PurgeSettings {
            registry_url: self.registry_url.clone().unwrap_or_default(),
            username: self.username.clone().unwrap_or_default(),
            password: self.password.clone().unwrap_or_default(),
            artifact_filter: self.artifact_filter.clone(),
            tag_filter: self.tag_filter.clone(),
            retention_days: self.retention_days,
            dry_run: self.dry_run,
            batch_size: self.batch_size,
            log_level: self.log_level.clone(),
            manifest_list_strategy: self.manifest_list_strategy.clone(),
            request_timeout_secs: self.request_timeout_secs,
        }
    }
}

pub async fn execute(args: PurgeArgs) -> Result<(), Box<dyn std::error::Error>> {
    // Validate everything before touching the network.
    let config = Arc::new(args.to_settings().validate()?);

    logging::init(config.log_level, args.log_format);
    tracing::debug!(config = ?config, "Configuration loaded");

    let registry: Arc<dyn Registry> = Arc::new(RegistryClient::new(&config)?);
    let orchestrator = Orchestrator::new(config, registry);
    let report = orchestrator.cleanup().await?;

    println!("{}", output::render_report(&report, args.output)?);

    if args.strict && report.summary.has_errors() {
        return Err(format!(
            "{} artifact(s) failed during cleanup",
            report.summary.errors
        )
        .into());
    }

    Ok(())
}
