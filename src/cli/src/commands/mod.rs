//! CLI definition and dispatch.

mod purge;

use clap::Parser;

pub use purge::{LogFormat, OutputFormat, PurgeArgs};

/// OCI Purge — delete expired artifacts from an OCI registry.
///
/// Every flag can also be supplied through the environment variable shown
/// in its help text.
#[derive(Parser, Debug)]
#[command(name = "oci-purge", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub purge: PurgeArgs,
}

/// Dispatch a parsed CLI to the cleanup run.
pub async fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    purge::execute(cli.purge).await
}
