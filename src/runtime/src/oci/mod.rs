//! Registry access for cleanup runs.
//!
//! - [`registry`]: the [`Registry`] seam and its HTTP implementation
//! - [`resolver`]: creation-date resolution over a [`Registry`]

pub mod registry;
pub mod resolver;

pub use registry::{Registry, RegistryAuth, RegistryClient};
pub use resolver::{DateResolver, DateSource, ResolvedDate};
