//! OCI Purge CLI - registry cleanup entry point.

pub mod commands;
pub mod logging;
pub mod output;
