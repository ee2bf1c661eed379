//! OCI Purge Core - configuration, filters, retention and run accounting.
//!
//! This crate holds the pieces of a registry cleanup run that do not touch
//! the network: validated configuration, name filters, the retention
//! cutoff, the manifest model and the run summary.

pub mod config;
pub mod error;
pub mod filter;
pub mod manifest;
pub mod retention;
pub mod summary;

// Re-export commonly used types
pub use config::{LogLevel, PurgeConfig, PurgeSettings};
pub use error::{PurgeError, Result};
pub use filter::{matches_repository, matches_tag, NameFilter};
pub use manifest::{Manifest, ManifestListStrategy, PlatformSpec};
pub use retention::{compute_cutoff, is_expired, RetentionPolicy};
pub use summary::{RunReport, RunSummary, SummaryAccumulator};

/// OCI Purge version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
