//! OCI Purge CLI entry point.

use clap::Parser;
use oci_purge_core::PurgeError;

use oci_purge_cli::commands::{dispatch, Cli};

/// Exit status when configuration validation fails.
const EXIT_CONFIG: i32 = 2;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = dispatch(cli).await {
        eprintln!("Error: {e}");
        let code = match e.downcast_ref::<PurgeError>() {
            Some(PurgeError::Config(_)) => EXIT_CONFIG,
            _ => 1,
        };
        std::process::exit(code);
    }
}
