//! OCI Purge Runtime - registry access and cleanup orchestration.
//!
//! Components, leaves first:
//!
//! - [`RegistryClient`]: authenticated transport over the registry HTTP API
//! - [`DateResolver`]: creation-date fallback chain
//! - [`DeletionExecutor`]: dry-run aware deletion
//! - [`Orchestrator`]: catalog → filters → dates → cutoff → delete

pub mod deletion;
pub mod oci;
pub mod orchestrator;

#[cfg(test)]
pub(crate) mod testing;

pub use deletion::{DeletionExecutor, DeletionOutcome};
pub use oci::{DateResolver, DateSource, Registry, RegistryAuth, RegistryClient, ResolvedDate};
pub use orchestrator::{Orchestrator, TagOutcome};
